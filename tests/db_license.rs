//! Store-layer tests for the license queries, including the conditional
//! consume that backs the quota ceiling.

mod common;
use common::*;

use keygate::db::queries;
use keygate::models::UpdateLicense;

#[test]
fn consume_stops_exactly_at_the_cutoff() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 4, future_timestamp(30), &[]);
    let conn = test.state.db.get().unwrap();

    // Limit 4: three grants, then refusals forever
    assert!(queries::consume_license_use(&conn, &license.id, "10.0.0.1").unwrap());
    assert!(queries::consume_license_use(&conn, &license.id, "10.0.0.1").unwrap());
    assert!(queries::consume_license_use(&conn, &license.id, "10.0.0.1").unwrap());
    for _ in 0..5 {
        assert!(!queries::consume_license_use(&conn, &license.id, "10.0.0.1").unwrap());
    }

    let stored = queries::get_license_by_id(&conn, &license.id).unwrap().unwrap();
    assert_eq!(stored.request_count, 3);
}

#[test]
fn consume_of_a_zero_limit_license_never_grants() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 0, future_timestamp(30), &[]);
    let conn = test.state.db.get().unwrap();

    assert!(!queries::consume_license_use(&conn, &license.id, "10.0.0.1").unwrap());
    let stored = queries::get_license_by_id(&conn, &license.id).unwrap().unwrap();
    assert_eq!(stored.request_count, 0);
}

#[test]
fn consume_records_the_caller_ip_only_on_grant() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 2, future_timestamp(30), &[]);
    let conn = test.state.db.get().unwrap();

    assert!(queries::consume_license_use(&conn, &license.id, "10.0.0.1").unwrap());
    assert!(!queries::consume_license_use(&conn, &license.id, "10.0.0.2").unwrap());

    let stored = queries::get_license_by_id(&conn, &license.id).unwrap().unwrap();
    assert_eq!(stored.last_used_ip.as_deref(), Some("10.0.0.1"));
}

#[test]
fn hwids_round_trip_through_storage() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 5, future_timestamp(30), &["DEV-A", "DEV-B"]);
    let conn = test.state.db.get().unwrap();

    let stored = queries::get_license_by_key(&conn, &license.key).unwrap().unwrap();
    assert_eq!(stored.hwids, vec!["DEV-A".to_string(), "DEV-B".to_string()]);
}

#[test]
fn update_with_no_fields_returns_the_current_record() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 5, future_timestamp(30), &[]);
    let conn = test.state.db.get().unwrap();

    let unchanged = queries::update_license(&conn, &license.id, &UpdateLicense::default())
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.request_limit, 5);
}

#[test]
fn update_of_a_missing_license_is_none() {
    let test = test_app();
    let conn = test.state.db.get().unwrap();

    let patch = UpdateLicense {
        request_limit: Some(10),
        ..Default::default()
    };
    assert!(queries::update_license(&conn, "no-such-id", &patch).unwrap().is_none());
}

#[test]
fn duplicate_keys_are_rejected_by_the_store() {
    let test = test_app();
    let license = create_test_license(&test, "admin", 5, future_timestamp(30), &[]);
    let conn = test.state.db.get().unwrap();

    let result = conn.execute(
        "INSERT INTO licenses (id, key, type, admin_id, hwids, request_limit, request_count, valid_until, created_at)
         VALUES ('other-id', ?1, 'standard', 'admin', '[]', 5, 0, 0, 0)",
        rusqlite::params![&license.key],
    );
    assert!(result.is_err());
}
