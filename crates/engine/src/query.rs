// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! iTop `core/get` request building and response decoding.

use itn_adapters::RemoteError;
use serde_json::{json, Map, Value};

pub const SCALAR_CHANGE_CLASS: &str = "CMDBChangeOpSetAttributeScalar";
pub const CASELOG_CHANGE_CLASS: &str = "CMDBChangeOpSetAttributeCaseLog";

/// Attributes whose changes are recorded as case-log operations.
pub const CASE_LOG_ATTRIBUTES: &[&str] = &["public_log", "private_log"];

pub const CHANGE_FIELDS: &[&str] =
    &["objkey", "objclass", "attcode", "oldvalue", "newvalue", "date", "userinfo", "user_id"];
pub const CASELOG_FIELDS: &[&str] =
    &["objkey", "objclass", "attcode", "lastentry", "date", "userinfo", "user_id"];
pub const TICKET_FIELDS: &[&str] = &["ref", "title", "status", "agent_id", "team_id", "priority"];

/// Build a `core/get` operation.
pub fn core_get(class: &str, oql: String, output_fields: &[&str]) -> Value {
    json!({
        "operation": "core/get",
        "class": class,
        "key": oql,
        "output_fields": output_fields.join(","),
    })
}

/// Quote a string literal for OQL.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Plain identifier usable as an OQL class name.
pub fn is_class_name(class: &str) -> bool {
    !class.is_empty() && class.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Comma-joined numeric ids for an `IN (...)` clause.
///
/// Non-numeric ids are dropped; `None` when nothing usable remains.
pub fn id_list<'a>(ids: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let ids: Vec<&str> =
        ids.into_iter().filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids.join(","))
    }
}

/// Comma-joined quoted literals for an `IN (...)` clause.
pub fn literal_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values.into_iter().map(quote).collect::<Vec<_>>().join(",")
}

/// One object from a `core/get` response.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObject {
    pub class: String,
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RemoteObject {
    /// Field rendered as a string; numbers are stringified and null is empty.
    pub fn field(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(Value::Bool(b)) => (if *b { "1" } else { "0" }).to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn opt_field(&self, name: &str) -> Option<String> {
        Some(self.field(name)).filter(|v| !v.is_empty())
    }

    /// Numeric id, for ordering.
    pub fn numeric_id(&self) -> u64 {
        self.id.parse().unwrap_or_default()
    }
}

/// Decode the `objects` map of a successful response.
///
/// iTop returns `"objects": null` for an empty result set.
pub fn objects(body: &Value) -> Result<Vec<RemoteObject>, RemoteError> {
    let map = match body.get("objects") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(RemoteError::Malformed(format!("objects is not a map: {}", kind_of(other))))
        }
    };

    let mut out = Vec::with_capacity(map.len());
    for (composite, entry) in map {
        let (key_class, key_id) = composite.split_once("::").unwrap_or(("", composite.as_str()));
        let class = entry.get("class").and_then(Value::as_str).unwrap_or(key_class).to_string();
        let id = match entry.get("key") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => key_id.to_string(),
        };
        let fields = match entry.get("fields") {
            Some(Value::Object(fields)) => fields.clone(),
            _ => return Err(RemoteError::Malformed(format!("object {composite} has no fields"))),
        };
        out.push(RemoteObject { class, id, fields });
    }
    Ok(out)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
