// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversion between iTop's local datetime strings and UTC instants.
//!
//! iTop stores `date` fields as naive `YYYY-MM-DD HH:MM:SS` strings in the
//! server's configured timezone. Every comparison in this workspace happens
//! in epoch seconds, so strings are converted at the edges only.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Format used by iTop for datetime attributes and OQL literals.
pub const REMOTE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alternate layouts accepted by [`RemoteTimezone::parse_loose`].
const LOOSE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Timezone in which remote datetime strings are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTimezone {
    tz: Tz,
}

impl Default for RemoteTimezone {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl RemoteTimezone {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Parse an IANA name; `None` when the name is empty or unknown.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        name.parse::<Tz>().ok().map(Self::new)
    }

    /// Resolve a configured name, falling back to UTC.
    ///
    /// The second element is `false` when the fallback was used, so callers
    /// can log the misconfiguration.
    pub fn resolve(name: Option<&str>) -> (Self, bool) {
        match name.and_then(Self::parse) {
            Some(tz) => (tz, true),
            None => (Self::default(), name.map_or(true, |n| n.trim().is_empty())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Parse the canonical `YYYY-MM-DD HH:MM:SS` layout in this timezone.
    ///
    /// DST-ambiguous times resolve to the earlier instant; times inside a DST
    /// gap do not exist and return `None`.
    pub fn parse_strict(&self, raw: &str) -> Option<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(raw.trim(), REMOTE_FORMAT).ok()?;
        self.localize(naive)
    }

    /// Free-form parse: offset-carrying formats, alternate layouts, bare dates,
    /// and raw epoch seconds.
    pub fn parse_loose(&self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in LOOSE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.localize(naive);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return self.localize(date.and_hms_opt(0, 0, 0)?);
        }
        if let Ok(secs) = raw.parse::<i64>() {
            return Utc.timestamp_opt(secs, 0).single();
        }
        None
    }

    /// Strict parse, then loose parse, then `fallback`.
    pub fn normalize(&self, raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
        self.parse_strict(raw).or_else(|| self.parse_loose(raw)).unwrap_or(fallback)
    }

    /// Render epoch seconds as a remote-local datetime literal.
    pub fn format_epoch(&self, secs: i64) -> String {
        match Utc.timestamp_opt(secs, 0) {
            LocalResult::Single(dt) => dt.with_timezone(&self.tz).format(REMOTE_FORMAT).to_string(),
            _ => String::new(),
        }
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => None,
        }
    }
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
