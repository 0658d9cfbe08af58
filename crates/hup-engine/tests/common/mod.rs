#![allow(dead_code)]

//! Shared test fixtures: a recording listener, table builders, and a
//! harness wiring the manager to an in-memory cache initialized from a
//! preloaded file on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use hup_cache::{InMemoryCache, PolicyCache};
use hup_core::{temporal, AppId, DeviceId, FunctionalGroupPermission, PolicySettings};
use hup_engine::{PolicyListener, PolicyManager};
use hup_table::HmiLevel;

// ─── Recording listener ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ListenerEvent {
    SnapshotCreated(Vec<u8>),
    PermissionsUpdated(AppId, Vec<FunctionalGroupPermission>, HmiLevel),
    CertificateUpdated(String),
    HmiAppTypes(BTreeMap<AppId, Vec<String>>),
    SystemInfoUpdateRequired,
}

pub struct RecordingListener {
    can_update: AtomicBool,
    device: Mutex<Option<DeviceId>>,
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self {
            can_update: AtomicBool::new(true),
            device: Mutex::new(Some(DeviceId::new("device-1"))),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn set_can_update(&self, can_update: bool) {
        self.can_update.store(can_update, Ordering::SeqCst);
    }

    pub fn set_device(&self, device: Option<DeviceId>) {
        *self.device.lock().unwrap() = device;
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn snapshot_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ListenerEvent::SnapshotCreated(_)))
            .count()
    }

    pub fn last_snapshot(&self) -> Option<Vec<u8>> {
        self.events()
            .iter()
            .rev()
            .find_map(|e| match e {
                ListenerEvent::SnapshotCreated(bytes) => Some(bytes.clone()),
                _ => None,
            })
    }

    pub fn certificates(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ListenerEvent::CertificateUpdated(cert) => Some(cert.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn permissions_updated_for(&self, app_id: &AppId) -> Vec<Vec<FunctionalGroupPermission>> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ListenerEvent::PermissionsUpdated(app, permissions, _) if app == app_id => {
                    Some(permissions.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn saw_system_info_request(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, ListenerEvent::SystemInfoUpdateRequired))
    }

    pub fn hmi_app_type_updates(&self) -> Vec<BTreeMap<AppId, Vec<String>>> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ListenerEvent::HmiAppTypes(map) => Some(map.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ListenerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PolicyListener for RecordingListener {
    fn can_update(&self) -> bool {
        self.can_update.load(Ordering::SeqCst)
    }

    fn on_snapshot_created(&self, snapshot: Vec<u8>) {
        self.record(ListenerEvent::SnapshotCreated(snapshot));
    }

    fn on_permissions_updated(
        &self,
        app_id: &AppId,
        permissions: &[FunctionalGroupPermission],
        default_hmi: HmiLevel,
    ) {
        self.record(ListenerEvent::PermissionsUpdated(
            app_id.clone(),
            permissions.to_vec(),
            default_hmi,
        ));
    }

    fn on_certificate_updated(&self, certificate: &str) {
        self.record(ListenerEvent::CertificateUpdated(certificate.to_string()));
    }

    fn on_update_hmi_app_type(&self, app_hmi_types: &BTreeMap<AppId, Vec<String>>) {
        self.record(ListenerEvent::HmiAppTypes(app_hmi_types.clone()));
    }

    fn on_current_device_id_update_required(&self, _app_id: &AppId) -> Option<DeviceId> {
        self.device.lock().unwrap().clone()
    }

    fn on_system_info_update_required(&self) {
        self.record(ListenerEvent::SystemInfoUpdateRequired);
    }
}

// ─── Table builders ─────────────────────────────────────────────────

/// Base table: three groupings (one auto-allowed), the predefined
/// sections, one specific app, one default-referenced app, and one
/// pre-consent app.
pub fn base_table() -> Value {
    json!({
        "policy_table": {
            "module_config": {
                "exchange_after_x_ignition_cycles": 3,
                "exchange_after_x_kilometers": 1800,
                "exchange_after_x_days": 30,
                "timeout_after_x_seconds": 5,
                "seconds_between_retries": [10, 20],
                "certificate": "cert-initial",
                "endpoints": {
                    "0x07": {"default": ["http://policy.example/api/v1"]}
                }
            },
            "functional_groupings": {
                "Base-4": {
                    "rpcs": {"ListFiles": {"hmi_levels": ["BACKGROUND"]}}
                },
                "Location-1": {
                    "user_consent_prompt": "Location",
                    "rpcs": {"GetVehicleData": {"hmi_levels": ["FULL"]}}
                },
                "Notifications": {
                    "user_consent_prompt": "Notifications",
                    "rpcs": {"Alert": {"hmi_levels": ["FULL", "LIMITED"]}}
                }
            },
            "app_policies": {
                "default": {"groups": ["Base-4"], "priority": "NONE"},
                "pre_DataConsent": {"groups": [], "priority": "NONE"},
                "1234": {
                    "groups": ["Base-4", "Location-1"],
                    "priority": "NORMAL",
                    "AppHMIType": ["MEDIA"],
                    "default_hmi": "NONE"
                },
                "5555": "default",
                "7777": "pre_DataConsent"
            }
        }
    })
}

/// Preloaded variant of the base table.
pub fn preloaded_table() -> Value {
    let mut table = base_table();
    table["policy_table"]["module_config"]["preloaded_pt"] = json!(true);
    table
}

/// Update variant: new certificate, app 1234 gains the Notifications
/// group.
pub fn update_table() -> Value {
    let mut table = base_table();
    table["policy_table"]["module_config"]["certificate"] = json!("cert-updated");
    table["policy_table"]["app_policies"]["1234"]["groups"] =
        json!(["Base-4", "Location-1", "Notifications"]);
    table
}

// ─── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub manager: PolicyManager,
    pub cache: Arc<InMemoryCache>,
    pub listener: Arc<RecordingListener>,
    pub dir: PathBuf,
}

pub fn temp_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hup-engine-{}-{}",
        std::process::id(),
        test_name
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn write_table(dir: &Path, file_name: &str, table: &Value) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, serde_json::to_vec(table).unwrap()).expect("write table file");
    path
}

/// Manager over an in-memory cache initialized from a preloaded file,
/// with exchange counters freshened so no trigger fires spuriously.
pub fn init_harness(test_name: &str) -> Harness {
    let dir = temp_dir(test_name);
    let preloaded = write_table(&dir, "sdl_preloaded_pt.json", &preloaded_table());

    let cache = Arc::new(InMemoryCache::new());
    let listener = Arc::new(RecordingListener::new());
    let manager = PolicyManager::new(
        Arc::clone(&cache) as Arc<dyn PolicyCache>,
        Arc::clone(&listener) as Arc<dyn PolicyListener>,
    );

    let settings = PolicySettings::new(&dir);
    assert!(manager.init_pt(&preloaded, &settings), "init_pt failed");

    // A freshly exchanged table: day and odometer counters start now.
    cache.set_counters_passed_for_successful_update(temporal::days_since_epoch(), 0);

    Harness {
        manager,
        cache,
        listener,
        dir,
    }
}
