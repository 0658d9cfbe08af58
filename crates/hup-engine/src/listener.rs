//! # Listener Boundary
//!
//! Callback surface the surrounding system implements: transporting
//! snapshots off-device, reacting to permission and certificate changes,
//! and answering device-identity queries. Calls arrive on whichever
//! thread triggered them, including the retry-timer thread; implementors
//! must not block for long.

use std::collections::BTreeMap;

use hup_core::{AppId, DeviceId, FunctionalGroupPermission};
use hup_table::HmiLevel;

/// Callbacks from the policy engine into the surrounding system.
pub trait PolicyListener: Send + Sync {
    /// Whether an exchange may be started right now (e.g. the HMI is up
    /// and a transport is available).
    fn can_update(&self) -> bool;

    /// A snapshot was serialized and should be delivered to the policy
    /// server.
    fn on_snapshot_created(&self, snapshot: Vec<u8>);

    /// An application's effective permissions changed.
    fn on_permissions_updated(
        &self,
        app_id: &AppId,
        permissions: &[FunctionalGroupPermission],
        default_hmi: HmiLevel,
    );

    /// The module certificate changed with an applied update.
    fn on_certificate_updated(&self, certificate: &str);

    /// Applications changed their declared HMI types with an applied
    /// update.
    fn on_update_hmi_app_type(&self, app_hmi_types: &BTreeMap<AppId, Vec<String>>);

    /// The engine needs to know which device an application is connected
    /// through. `None` when the application is not connected.
    fn on_current_device_id_update_required(&self, app_id: &AppId) -> Option<DeviceId>;

    /// The table is still preloaded; system information should be
    /// collected and an update produced.
    fn on_system_info_update_required(&self);
}
