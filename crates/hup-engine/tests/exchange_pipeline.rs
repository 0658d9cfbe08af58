//! End-to-end exchange pipeline: initialization, snapshot requests,
//! update application, retry scheduling, and the chained exchange.

mod common;

use serde_json::json;

use common::{init_harness, update_table, write_table};
use hup_cache::PolicyCache;
use hup_core::AppId;
use std::time::Duration;

#[test]
fn test_init_pt_loads_preloaded_table() {
    let harness = init_harness("init-preloaded");
    assert!(harness.manager.get_policy_table_status() == "UP_TO_DATE");
    assert_eq!(
        harness.manager.retrieve_certificate().as_deref(),
        Some("cert-initial")
    );
    assert_eq!(
        harness.manager.get_service_urls("0x07"),
        vec!["http://policy.example/api/v1".to_string()]
    );

    // The table is still preloaded, so system info must be requested.
    harness.manager.on_system_ready();
    assert!(harness.listener.saw_system_info_request());
}

#[test]
fn test_force_pt_exchange_emits_snapshot() {
    let harness = init_harness("force-exchange");
    let status = harness.manager.force_pt_exchange();

    assert_eq!(harness.listener.snapshot_count(), 1);
    // The snapshot request covered everything outstanding.
    assert_eq!(status, "UP_TO_DATE");

    // The emitted snapshot parses back into the same groupings.
    let bytes = harness.listener.last_snapshot().unwrap();
    let snapshot: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(snapshot["policy_table"]["functional_groupings"]
        .get("Base-4")
        .is_some());
}

#[test]
fn test_exchange_skipped_when_listener_disallows() {
    let harness = init_harness("listener-disallows");
    harness.listener.set_can_update(false);
    let status = harness.manager.force_pt_exchange();
    assert_eq!(harness.listener.snapshot_count(), 0);
    assert_eq!(status, "UPDATE_NEEDED");
}

#[test]
fn test_exchange_skipped_during_apps_search() {
    let harness = init_harness("apps-search");
    harness.manager.on_apps_search_started();
    let status = harness.manager.force_pt_exchange();
    assert_eq!(harness.listener.snapshot_count(), 0);
    assert_eq!(status, "UPDATE_NEEDED");

    // Completion of the search starts the postponed exchange.
    harness.manager.on_apps_search_completed();
    assert_eq!(harness.listener.snapshot_count(), 1);
}

#[test]
fn test_load_pt_round_trip() {
    let harness = init_harness("load-round-trip");
    let file = write_table(&harness.dir, "pt_update.json", &update_table());
    let payload = serde_json::to_vec(&update_table()).unwrap();

    assert!(harness.manager.load_pt(&file, &payload));

    // The transport file was consumed.
    assert!(!file.exists());
    assert_eq!(harness.manager.get_policy_table_status(), "UP_TO_DATE");

    // Applying then snapshotting yields the update's groupings.
    let snapshot = harness.cache.generate_snapshot().unwrap();
    let applied = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(
        applied["policy_table"]["functional_groupings"],
        update_table()["policy_table"]["functional_groupings"]
    );

    // Certificate and HMI-type changes were propagated.
    assert_eq!(harness.listener.certificates(), vec!["cert-updated"]);
    let hmi_updates = harness.listener.hmi_app_type_updates();
    assert_eq!(hmi_updates.len(), 1);
    assert_eq!(hmi_updates[0][&AppId::new("1234")], vec!["MEDIA".to_string()]);
}

#[test]
fn test_server_wrapped_payload_parses_identically() {
    let bare = init_harness("envelope-bare");
    let wrapped = init_harness("envelope-wrapped");

    let bare_payload = serde_json::to_vec(&update_table()).unwrap();
    let wrapped_payload = serde_json::to_vec(&json!({"data": [update_table()]})).unwrap();

    let bare_file = write_table(&bare.dir, "pt_update.json", &update_table());
    let wrapped_file = write_table(&wrapped.dir, "pt_update.json", &update_table());

    assert!(bare.manager.load_pt(&bare_file, &bare_payload));
    assert!(wrapped.manager.load_pt(&wrapped_file, &wrapped_payload));

    let bare_snapshot = bare.cache.generate_snapshot().unwrap();
    let wrapped_snapshot = wrapped.cache.generate_snapshot().unwrap();
    assert_eq!(bare_snapshot.policy_table, wrapped_snapshot.policy_table);
}

#[test]
fn test_malformed_payload_is_wrong_update() {
    let harness = init_harness("malformed-payload");
    let file = harness.dir.join("pt_update.json");
    std::fs::write(&file, b"not json").unwrap();

    assert!(!harness.manager.load_pt(&file, b"not json"));
    assert_eq!(harness.manager.get_policy_table_status(), "UPDATE_NEEDED");
    // Parse failures do not consume the file; it never held a table.
    assert!(file.exists());
}

#[test]
fn test_invalid_table_is_wrong_update() {
    let harness = init_harness("invalid-table");
    let mut invalid = update_table();
    invalid["policy_table"]["app_policies"]["1234"]["groups"] = json!(["No-Such-Group"]);
    let file = write_table(&harness.dir, "pt_update.json", &invalid);
    let payload = serde_json::to_vec(&invalid).unwrap();

    assert!(!harness.manager.load_pt(&file, &payload));
    assert_eq!(harness.manager.get_policy_table_status(), "UPDATE_NEEDED");
    // Validation failures happen after the transport file is consumed.
    assert!(!file.exists());
}

#[test]
fn test_update_requested_in_flight_chains_next_exchange() {
    let harness = init_harness("chained-exchange");

    // First exchange goes out.
    harness.manager.force_pt_exchange();
    assert_eq!(harness.listener.snapshot_count(), 1);
    harness.manager.on_update_started();
    assert_eq!(harness.manager.get_policy_table_status(), "UPDATING");

    // A second request arrives while the first is in flight: postponed.
    harness.manager.force_pt_exchange();
    assert_eq!(harness.listener.snapshot_count(), 1);

    // The reply lands; the postponed request starts immediately.
    let file = write_table(&harness.dir, "pt_update.json", &update_table());
    let payload = serde_json::to_vec(&update_table()).unwrap();
    assert!(harness.manager.load_pt(&file, &payload));
    assert_eq!(harness.listener.snapshot_count(), 2);
}

#[test]
fn test_retry_timeouts_follow_cumulative_backoff() {
    let harness = init_harness("retry-backoff");

    // Table config: delays [10, 20], base timeout 5.
    assert_eq!(harness.manager.timeout_exchange(), 5);
    assert_eq!(harness.manager.retry_sequence_delays_seconds(), vec![10, 20]);

    assert_eq!(
        harness.manager.next_retry_timeout(),
        Some(Duration::from_millis(15_000))
    );
    assert_eq!(
        harness.manager.next_retry_timeout(),
        Some(Duration::from_millis(45_000))
    );
    assert_eq!(harness.manager.next_retry_timeout(), None);

    // Reset replays the sequence from the first value.
    harness.manager.reset_retry_sequence();
    assert_eq!(
        harness.manager.next_retry_timeout(),
        Some(Duration::from_millis(15_000))
    );
}

#[test]
fn test_exceeded_timeout_leaves_update_needed() {
    let harness = init_harness("exceeded-timeout");
    harness.manager.force_pt_exchange();
    harness.manager.on_update_started();
    harness.manager.on_exceeded_timeout();
    assert_eq!(harness.manager.get_policy_table_status(), "UPDATE_NEEDED");
}

#[test]
fn test_reset_pt_restores_preloaded_state() {
    let harness = init_harness("reset-pt");

    // Apply an update first.
    let file = write_table(&harness.dir, "pt_update.json", &update_table());
    let payload = serde_json::to_vec(&update_table()).unwrap();
    assert!(harness.manager.load_pt(&file, &payload));
    assert_eq!(
        harness.manager.retrieve_certificate().as_deref(),
        Some("cert-updated")
    );

    let preloaded = write_table(
        &harness.dir,
        "sdl_preloaded_pt.json",
        &common::preloaded_table(),
    );
    assert!(harness.manager.reset_pt(&preloaded));
    assert_eq!(
        harness.manager.retrieve_certificate().as_deref(),
        Some("cert-initial")
    );
    // The pending record from the update diff is gone.
    let record = harness.manager.get_app_permissions_changes(&AppId::new("1234"));
    assert!(!record.consent_needed);
}
