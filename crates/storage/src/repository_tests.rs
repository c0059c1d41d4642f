// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use itn_adapters::MemoryConfigStore;

fn setup() -> (ConfigRepository, MemoryConfigStore) {
    let store = MemoryConfigStore::new();
    (ConfigRepository::new(Arc::new(store.clone())), store)
}

fn alice() -> UserId {
    UserId::new("alice")
}

#[yare::parameterized(
    unset  = { None,       false },
    zero   = { Some("0"),  false },
    one    = { Some("1"),  true },
    spaced = { Some(" 1"), true },
    junk   = { Some("on"), false },
)]
fn master_toggle(raw: Option<&str>, expected: bool) {
    let (repo, store) = setup();
    if let Some(raw) = raw {
        store.set_user_value(&alice(), "notifications_enabled", raw).unwrap();
    }
    assert_eq!(repo.notifications_enabled(&alice()), expected);
}

#[test]
fn identity_requires_person_id() {
    let (repo, store) = setup();
    assert_eq!(repo.identity(&alice()), None);

    store.set_user_value(&alice(), "person_id", "0").unwrap();
    assert_eq!(repo.identity(&alice()), None);

    store.set_user_value(&alice(), "person_id", "17").unwrap();
    store.set_user_value(&alice(), "remote_user_id", "5").unwrap();
    let identity = repo.identity(&alice()).unwrap();
    assert_eq!(identity.person_id, "17");
    assert_eq!(identity.user_id.as_deref(), Some("5"));
    assert_eq!(identity.display_name, None);
}

#[test]
fn set_identity_round_trips_and_clears_optional_fields() {
    let (repo, _) = setup();
    let mut identity = RemoteIdentity::new("17");
    identity.user_id = Some("5".into());
    identity.display_name = Some("Alice Agent".into());
    repo.set_identity(&alice(), &identity).unwrap();
    assert_eq!(repo.identity(&alice()), Some(identity));

    repo.set_identity(&alice(), &RemoteIdentity::new("17")).unwrap();
    assert_eq!(repo.identity(&alice()), Some(RemoteIdentity::new("17")));
}

#[test]
fn check_interval_is_stored_in_minutes() {
    let (repo, store) = setup();
    assert_eq!(repo.check_interval_override_secs(&alice()), None);
    repo.set_check_interval_minutes(&alice(), 10).unwrap();
    assert_eq!(repo.check_interval_override_secs(&alice()), Some(600));

    store.set_user_value(&alice(), "check_interval", "0").unwrap();
    assert_eq!(repo.check_interval_override_secs(&alice()), None);
}

#[test]
fn default_interval_falls_back_to_five_minutes() {
    let (repo, store) = setup();
    assert_eq!(repo.default_check_interval_secs(), 300);
    store.set_app_value("default_check_interval", "15").unwrap();
    assert_eq!(repo.default_check_interval_secs(), 900);
    store.set_app_value("default_check_interval", "soon").unwrap();
    assert_eq!(repo.default_check_interval_secs(), 300);
}

#[test]
fn opt_out_list_round_trip_ignores_unknown_names() {
    let (repo, store) = setup();
    let types: BTreeSet<_> =
        [NotificationType::TicketComment, NotificationType::TicketSlaBreach].into_iter().collect();
    repo.set_opted_out_types(&alice(), JobKind::Agent, &types).unwrap();
    assert_eq!(repo.opted_out_types(&alice(), JobKind::Agent), types);
    assert!(repo.opted_out_types(&alice(), JobKind::Portal).is_empty());

    store
        .set_user_value(&alice(), "disabled_portal_notifications", r#"["ticket_resolved","bogus"]"#)
        .unwrap();
    assert_eq!(
        repo.opted_out_types(&alice(), JobKind::Portal),
        [NotificationType::TicketResolved].into_iter().collect()
    );

    store.set_user_value(&alice(), "disabled_portal_notifications", "not json").unwrap();
    assert!(repo.opted_out_types(&alice(), JobKind::Portal).is_empty());
}

#[test]
fn enabled_types_merge_admin_and_user() {
    let (repo, _) = setup();
    repo.set_admin_policy(NotificationType::TicketComment, AdminPolicy::Forced).unwrap();
    repo.set_admin_policy(NotificationType::TicketSlaBreach, AdminPolicy::Disabled).unwrap();
    let opted_out: BTreeSet<_> =
        [NotificationType::TicketComment, NotificationType::TicketAssigned].into_iter().collect();
    repo.set_opted_out_types(&alice(), JobKind::Agent, &opted_out).unwrap();

    let enabled = repo.enabled_types(&alice(), JobKind::Agent);
    assert!(enabled.contains(&NotificationType::TicketComment));
    assert!(!enabled.contains(&NotificationType::TicketSlaBreach));
    assert!(!enabled.contains(&NotificationType::TicketAssigned));
    assert!(enabled.contains(&NotificationType::TicketTtoWarning));
}

#[test]
fn unknown_admin_policy_reads_as_user_choice() {
    let (repo, store) = setup();
    store.set_app_value("notification_policy_ticket_comment", "sometimes").unwrap();
    assert_eq!(repo.admin_policy(NotificationType::TicketComment), AdminPolicy::UserChoice);
}

#[test]
fn credential_prefers_user_token() {
    let (repo, store) = setup();
    assert!(repo.credential(&alice()).is_none());

    store.set_app_value("application_token", "app-secret").unwrap();
    let (credential, source) = repo.credential(&alice()).unwrap();
    assert_eq!(credential.token(), "app-secret");
    assert_eq!(source, CredentialSource::Application);

    repo.set_user_token(&alice(), "mine").unwrap();
    let (credential, source) = repo.credential(&alice()).unwrap();
    assert_eq!(credential.token(), "mine");
    assert_eq!(source, CredentialSource::User);

    repo.wipe_user_token(&alice()).unwrap();
    assert_eq!(repo.user_token(&alice()), None);
}

#[test]
fn watermark_reads_epoch_and_legacy_datetimes() {
    let (repo, store) = setup();
    let utc = RemoteTimezone::default();
    assert_eq!(repo.watermark(&alice(), JobKind::Agent, &utc), None);

    repo.set_watermark(&alice(), JobKind::Agent, 1_762_382_421).unwrap();
    assert_eq!(repo.watermark(&alice(), JobKind::Agent, &utc), Some(1_762_382_421));
    assert_eq!(repo.watermark(&alice(), JobKind::Portal, &utc), None);

    store.set_user_value(&alice(), "last_portal_check", "2025-11-05 22:40:21").unwrap();
    assert_eq!(repo.watermark(&alice(), JobKind::Portal, &utc), Some(1_762_382_421));

    let paris = RemoteTimezone::parse("Europe/Paris").unwrap();
    assert_eq!(repo.watermark(&alice(), JobKind::Portal, &paris), Some(1_762_382_421 - 3600));

    store.set_user_value(&alice(), "last_portal_check", "yesterday").unwrap();
    assert_eq!(repo.watermark(&alice(), JobKind::Portal, &utc), None);
}

#[test]
fn deadline_ledger_is_scoped_and_empty_maps_delete() {
    let (repo, store) = setup();
    let mut levels = BTreeMap::new();
    levels.insert("42".to_string(), EscalationLevel::Hours12);
    repo.set_signaled_levels(&alice(), DeadlineKind::Tto, DeadlineScope::Mine, &levels).unwrap();

    assert_eq!(repo.signaled_levels(&alice(), DeadlineKind::Tto, DeadlineScope::Mine), levels);
    assert!(repo
        .signaled_levels(&alice(), DeadlineKind::Tto, DeadlineScope::TeamUnassigned)
        .is_empty());
    assert!(repo.signaled_levels(&alice(), DeadlineKind::Ttr, DeadlineScope::Mine).is_empty());

    repo.set_signaled_levels(&alice(), DeadlineKind::Tto, DeadlineScope::Mine, &BTreeMap::new())
        .unwrap();
    assert_eq!(store.get_user_value(&alice(), "deadline_levels_tto_mine"), None);
}

#[test]
fn reset_user_forgets_progress_but_keeps_settings() {
    let (repo, _) = setup();
    let utc = RemoteTimezone::default();
    repo.set_notifications_enabled(&alice(), true).unwrap();
    repo.set_watermark(&alice(), JobKind::Agent, 100).unwrap();
    repo.set_watermark(&alice(), JobKind::Portal, 100).unwrap();
    let levels = [("7".to_string(), EscalationLevel::Hours1)].into_iter().collect();
    repo.set_signaled_levels(&alice(), DeadlineKind::Ttr, DeadlineScope::Mine, &levels).unwrap();

    repo.reset_user(&alice()).unwrap();

    assert_eq!(repo.watermark(&alice(), JobKind::Agent, &utc), None);
    assert_eq!(repo.watermark(&alice(), JobKind::Portal, &utc), None);
    assert!(repo.signaled_levels(&alice(), DeadlineKind::Ttr, DeadlineScope::Mine).is_empty());
    assert!(repo.notifications_enabled(&alice()));
}

#[test]
fn instance_settings_defaults() {
    let (repo, store) = setup();
    assert_eq!(repo.ticket_classes(), vec!["UserRequest", "Incident"]);
    assert_eq!(repo.person_name_ttl_secs(), 3600);
    assert_eq!(repo.profile_ttl_secs(), 1800);
    assert_eq!(repo.timezone(), RemoteTimezone::default());
    assert_eq!(repo.itop_url(), None);

    store.set_app_value("ticket_classes", "Incident, Problem,").unwrap();
    store.set_app_value("itop_url", "https://itop.example.com/").unwrap();
    store.set_app_value("timezone", "Not/AZone").unwrap();
    assert_eq!(repo.ticket_classes(), vec!["Incident", "Problem"]);
    assert_eq!(repo.itop_url().as_deref(), Some("https://itop.example.com"));
    assert_eq!(repo.timezone(), RemoteTimezone::default());
}
