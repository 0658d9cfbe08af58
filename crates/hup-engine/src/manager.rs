//! # Policy Orchestrator
//!
//! [`PolicyManager`] ties the engine components to the cache and listener
//! collaborators: it decides when an exchange starts, emits snapshot
//! requests, applies received updates, resolves permissions, and tracks
//! pending consent.
//!
//! ## Update pipeline
//!
//! `start_pt_exchange` refuses to start while an application search or
//! another exchange is in flight (it only re-schedules), evaluates the
//! ignition/day triggers once per process lifetime, and arms the retry
//! timer alongside the first snapshot request. A reply enters through
//! `load_pt`: parse → validate → signal the status tracker → stop the
//! retry timer → snapshot-diff-apply under the registration lock →
//! propagate certificate/HMI-type changes → chain into the next exchange
//! or reload the retry schedule.
//!
//! ## Locking
//!
//! Registration, pending-diff, and retry state are three independent
//! locks, never held together. The retry-timer callback touches only the
//! retry lock.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hup_cache::PolicyCache;
use hup_core::{
    AppId, AppPermissions, DeviceConsent, DeviceId, FunctionalGroupPermission, PermissionConsent,
    PolicySettings, Priority,
};
use hup_table::{parse_payload, HmiLevel, PayloadFormat};

use crate::error::UpdateError;
use crate::listener::PolicyListener;
use crate::pending::{self, PendingPermissions};
use crate::retry::RetrySequence;
use crate::status::UpdateStatusManager;
use crate::timer::PeriodicTimer;
use crate::{diff, lock, resolver, triggers};

struct ManagerInner {
    cache: Arc<dyn PolicyCache>,
    listener: Arc<dyn PolicyListener>,
    status: UpdateStatusManager,
    /// Retry-state lock domain.
    retry: Mutex<RetrySequence>,
    retry_timer: PeriodicTimer,
    /// Pending-diff lock domain.
    pending: PendingPermissions,
    /// Registration lock domain: application registration and the
    /// snapshot-diff-apply sequence of `load_pt`.
    registration: Mutex<()>,
    /// One-shot: the ignition/day triggers run once per process lifetime.
    ignition_check: AtomicBool,
    payload_format: PayloadFormat,
    settings: Mutex<Option<PolicySettings>>,
}

/// The policy engine orchestrator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PolicyManager {
    inner: Arc<ManagerInner>,
}

impl PolicyManager {
    /// Create a manager expecting server-unencrypted update payloads
    /// (the `data`-envelope transport).
    pub fn new(cache: Arc<dyn PolicyCache>, listener: Arc<dyn PolicyListener>) -> Self {
        Self::with_payload_format(cache, listener, PayloadFormat::ServerUnencrypted)
    }

    /// Create a manager with an explicit update-payload format.
    pub fn with_payload_format(
        cache: Arc<dyn PolicyCache>,
        listener: Arc<dyn PolicyListener>,
        payload_format: PayloadFormat,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                cache,
                listener,
                status: UpdateStatusManager::new(),
                retry: Mutex::new(RetrySequence::new()),
                retry_timer: PeriodicTimer::new("policy-retry-sequence"),
                pending: PendingPermissions::new(),
                registration: Mutex::new(()),
                ignition_check: AtomicBool::new(true),
                payload_format,
                settings: Mutex::new(None),
            }),
        }
    }

    // ─── Initialization ─────────────────────────────────────────────

    /// Initialize from a preloaded table file. Verifies the app storage
    /// folder, loads the table into the cache, reloads the retry
    /// schedule, and restores the persisted update-required status.
    pub fn init_pt(&self, preloaded_file: &Path, settings: &PolicySettings) -> bool {
        if !check_app_storage_folder(settings) {
            tracing::error!("cannot read/write into app storage folder");
            return false;
        }
        *lock(&self.inner.settings) = Some(settings.clone());

        match self.inner.cache.init(preloaded_file) {
            Ok(()) => {
                self.refresh_retry_sequence();
                self.inner
                    .status
                    .on_policy_init(self.inner.cache.update_required());
                true
            }
            Err(error) => {
                tracing::error!(%error, "failed to initialize policy table");
                false
            }
        }
    }

    /// The settings the engine was initialized with.
    pub fn get_settings(&self) -> Option<PolicySettings> {
        lock(&self.inner.settings).clone()
    }

    /// Discard all policy state and re-initialize from the preloaded file.
    pub fn reset_pt(&self, preloaded_file: &Path) -> bool {
        self.inner.pending.clear();
        let result = self.inner.cache.reset(preloaded_file);
        if result {
            self.refresh_retry_sequence();
        }
        result
    }

    /// With a still-preloaded table, ask the surrounding system for the
    /// system information an update request needs.
    pub fn on_system_ready(&self) {
        if self.inner.cache.is_preloaded() {
            self.inner.listener.on_system_info_update_required();
        }
    }

    // ─── Exchange pipeline ──────────────────────────────────────────

    /// Start a policy-table exchange if one is due and none is running.
    pub fn start_pt_exchange(&self) {
        let update_required = self.inner.status.is_update_required();

        if self.inner.status.is_apps_search_in_progress() && update_required {
            self.inner.status.schedule_update();
            tracing::info!("exchange skipped: application search in progress");
            return;
        }

        if self.inner.status.is_update_pending() && update_required {
            self.inner.status.schedule_update();
            tracing::info!("exchange skipped: another exchange in progress");
            return;
        }

        if !self.inner.listener.can_update() {
            tracing::debug!("exchange skipped: listener disallows updating");
            return;
        }

        if self.inner.ignition_check.swap(false, Ordering::AcqRel) {
            triggers::check_triggers(self.inner.cache.as_ref(), &self.inner.status);
        }

        if self.inner.status.is_update_required()
            && self.request_pt_update()
            && !self.inner.retry_timer.is_running()
        {
            if let Some(timeout) = self.next_retry_timeout() {
                self.arm_retry_timer(timeout);
            }
        }
    }

    /// Serialize a snapshot of the current table and hand it to the
    /// listener for transport. Snapshot validation failures are logged
    /// but do not block transmission.
    pub fn request_pt_update(&self) -> bool {
        let Some(snapshot) = self.inner.cache.generate_snapshot() else {
            tracing::error!("failed to create snapshot of policy table");
            return false;
        };

        if let Err(error) = snapshot.validate() {
            tracing::warn!(%error, "policy table snapshot failed validation");
        }

        let payload = match snapshot.to_json_bytes() {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, "failed to serialize policy table snapshot");
                return false;
            }
        };

        tracing::debug!(size = payload.len(), "policy table snapshot created");
        self.inner.listener.on_snapshot_created(payload);

        // Every currently registered application is covered by this
        // snapshot; nothing outstanding requires an update anymore.
        self.inner.status.reset_update_schedule();
        true
    }

    /// Apply a received policy-table update. The transport file is
    /// consumed. Returns whether the update was accepted and applied;
    /// never retries internally — the retry timer drives re-requests.
    pub fn load_pt(&self, file: &Path, payload: &[u8]) -> bool {
        tracing::info!(size = payload.len(), "loading policy table update");

        let update = match parse_payload(payload, self.inner.payload_format) {
            Ok(update) => update,
            Err(error) => {
                tracing::warn!(error = %UpdateError::from(error), "wrong policy table update");
                self.inner.status.on_wrong_update_received();
                return false;
            }
        };

        // The transport file is consumed once its content is parsed.
        if let Err(error) = std::fs::remove_file(file) {
            tracing::debug!(file = %file.display(), %error, "could not delete update file");
        }

        if let Err(error) = update.validate() {
            tracing::error!(error = %UpdateError::from(error), "wrong policy table update");
            self.inner.status.on_wrong_update_received();
            return false;
        }

        self.inner.status.on_valid_update_received();
        self.inner.cache.save_update_required(false);

        // Update finished; no retries needed for it anymore.
        if self.inner.retry_timer.is_running() {
            tracing::info!("stopping retry sequence");
            self.inner.retry_timer.stop();
        }

        let changes = match self.apply_accepted_update(&update) {
            Ok(changes) => changes,
            Err(error) => {
                tracing::error!(%error, "failed to apply policy table update");
                return false;
            }
        };

        for change in changes {
            let app_id = change.application_id.clone();
            self.inner.pending.upsert(change);
            self.send_notification_on_permissions_updated(&app_id);
        }

        // An update requested while this one was in flight starts right
        // after it.
        if self.inner.status.is_update_required() {
            self.start_pt_exchange();
            return true;
        }

        self.refresh_retry_sequence();
        true
    }

    /// Snapshot-diff-apply under the registration lock, plus certificate
    /// and HMI-type propagation from the freshly applied table.
    fn apply_accepted_update(
        &self,
        update: &hup_table::PolicyTable,
    ) -> Result<Vec<AppPermissions>, UpdateError> {
        let _registration = lock(&self.inner.registration);

        // Current table state — it may have gained applications while the
        // exchange was in flight.
        let snapshot = self
            .inner
            .cache
            .generate_snapshot()
            .ok_or(UpdateError::Snapshot)?;

        // Diff before applying: groups revoked by the update are only
        // resolvable while the previous table is still present.
        let changes = diff::check_permissions_changes(update, &snapshot);

        if !self.inner.cache.apply_update(update) {
            return Err(UpdateError::Apply);
        }

        if let Some(certificate) = &update.policy_table.module_config.certificate {
            self.inner.listener.on_certificate_updated(certificate);
        }

        let app_hmi_types = self.inner.cache.hmi_app_types();
        if !app_hmi_types.is_empty() {
            tracing::info!(apps = app_hmi_types.len(), "HMI app types updated");
            self.inner.listener.on_update_hmi_app_type(&app_hmi_types);
        }

        Ok(changes)
    }

    /// Schedule an update and start an exchange immediately, returning
    /// the resulting status string.
    pub fn force_pt_exchange(&self) -> String {
        self.inner.status.schedule_update();
        self.start_pt_exchange();
        self.inner.status.stringified_update_status()
    }

    /// Current update status for external reporting.
    pub fn get_policy_table_status(&self) -> String {
        self.inner.status.stringified_update_status()
    }

    /// The transport reported that the in-flight update request timed
    /// out. The armed retry timer is responsible for the next attempt.
    pub fn on_exceeded_timeout(&self) {
        self.inner.status.on_update_timeout_occurs();
    }

    /// An update request left the device.
    pub fn on_update_started(&self) {
        let update_timeout = self.timeout_exchange();
        tracing::debug!(timeout_seconds = update_timeout, "update sent out");
        self.inner.status.on_update_sent_out(update_timeout);
        self.inner.cache.save_update_required(true);
    }

    // ─── Triggers ───────────────────────────────────────────────────

    /// Evaluate the ignition and day triggers.
    pub fn check_triggers(&self) {
        triggers::check_triggers(self.inner.cache.as_ref(), &self.inner.status);
    }

    /// Odometer callback: when enough kilometers have been driven, an
    /// exchange is scheduled and attempted immediately.
    pub fn kms_changed(&self, kilometers: u32) {
        if self.inner.cache.kilometers_before_exchange(kilometers) == 0 {
            tracing::info!(kilometers, "enough kilometers passed for policy table update");
            self.inner.status.schedule_update();
            self.start_pt_exchange();
        }
    }

    /// Count one ignition cycle against the exchange limit.
    pub fn increment_ignition_cycles(&self) {
        self.inner.cache.increment_ignition_cycles();
    }

    // ─── Retry scheduling ───────────────────────────────────────────

    /// Consume the next retry attempt; `None` when the sequence is
    /// exhausted.
    pub fn next_retry_timeout(&self) -> Option<Duration> {
        let timeout = lock(&self.inner.retry).next_timeout();
        tracing::debug!(?timeout, "next retry timeout");
        timeout
    }

    /// Reload the retry schedule from the cache and restart from attempt
    /// zero. Done whenever a new table is accepted.
    pub fn refresh_retry_sequence(&self) {
        let timeout = self.inner.cache.timeout_response();
        let delays = self.inner.cache.seconds_between_retries();
        lock(&self.inner.retry).reload(timeout, delays);
    }

    /// Restart the retry sequence from attempt zero.
    pub fn reset_retry_sequence(&self) {
        lock(&self.inner.retry).reset();
        self.inner.status.on_reset_retry_sequence();
    }

    /// Seconds to wait for a response to one update request.
    pub fn timeout_exchange(&self) -> u32 {
        lock(&self.inner.retry).timeout_seconds()
    }

    /// The configured per-attempt retry delays, seconds.
    pub fn retry_sequence_delays_seconds(&self) -> Vec<u32> {
        lock(&self.inner.retry).delays_seconds()
    }

    /// Timer tick: re-request a snapshot and re-arm with the next,
    /// longer timeout — or stop when the sequence is exhausted.
    fn retry_sequence(&self) {
        tracing::info!("starting new retry sequence");
        self.request_pt_update();

        match self.next_retry_timeout() {
            Some(timeout) => self.arm_retry_timer(timeout),
            None => {
                if self.inner.retry_timer.is_running() {
                    tracing::info!("retry sequence exhausted");
                    self.inner.retry_timer.stop();
                }
            }
        }
    }

    fn arm_retry_timer(&self, timeout: Duration) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.retry_timer.start(timeout, move || {
            if let Some(inner) = weak.upgrade() {
                PolicyManager { inner }.retry_sequence();
            }
        });
    }

    // ─── Application registration ───────────────────────────────────

    /// Register an application: never-seen apps get the default policy
    /// and schedule an update; known pre-consent apps are promoted to
    /// the default policy once their device is allowed.
    pub fn add_application(&self, app_id: &AppId) {
        let device_consent = self
            .get_current_device_id(app_id)
            .map(|device_id| self.get_user_consent_for_device(&device_id))
            .unwrap_or(DeviceConsent::Allowed);

        let _registration = lock(&self.inner.registration);

        if !self.inner.cache.is_application_represented(app_id) {
            tracing::debug!(app = %app_id, "adding new application");
            self.inner.cache.set_default_policy(app_id);
            self.inner.status.on_new_application_added();
        } else if device_consent == DeviceConsent::Allowed
            && self.inner.cache.is_predata_policy(app_id)
        {
            // Device consent arrived while the application was offline;
            // promote it out of the pre-consent policy.
            self.inner.cache.set_default_policy(app_id);
        }
    }

    /// The application finished registering on the mobile side.
    pub fn on_app_registered_on_mobile(&self, app_id: &AppId) {
        self.start_pt_exchange();
        self.send_notification_on_permissions_updated(app_id);
    }

    pub fn on_apps_search_started(&self) {
        self.inner.status.on_apps_search_started();
    }

    pub fn on_apps_search_completed(&self) {
        self.inner.status.on_apps_search_completed();
        if self.inner.status.is_update_required() {
            self.start_pt_exchange();
        }
    }

    // ─── Permission resolution ──────────────────────────────────────

    /// Effective permissions of one application on one device.
    pub fn get_permissions_for_app(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
    ) -> Vec<FunctionalGroupPermission> {
        let device_consent = self.get_user_consent_for_device(device_id);
        resolver::permissions_for_app(
            self.inner.cache.as_ref(),
            device_consent,
            device_id,
            app_id,
        )
    }

    /// Groups of one application eligible for explicit user consent.
    pub fn get_user_consent_for_app(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
    ) -> Vec<FunctionalGroupPermission> {
        resolver::user_consent_for_app(self.inner.cache.as_ref(), device_id, app_id)
    }

    /// Device-level consent. This deployment treats every device as
    /// allowed; richer deployments answer from their consent store.
    pub fn get_user_consent_for_device(&self, _device_id: &DeviceId) -> DeviceConsent {
        DeviceConsent::Allowed
    }

    /// Default HMI level of an application, falling back to the
    /// pre-consent policy while its device lacks consent.
    pub fn get_default_hmi(&self, app_id: &AppId) -> Option<HmiLevel> {
        let device_consent = self
            .get_current_device_id(app_id)
            .map(|device_id| self.get_user_consent_for_device(&device_id))
            .unwrap_or(DeviceConsent::Allowed);
        let lookup_id = if device_consent == DeviceConsent::Allowed {
            app_id.clone()
        } else {
            AppId::pre_data_consent()
        };
        self.inner.cache.default_hmi(&lookup_id)
    }

    /// Resolve the current device of an application through the listener.
    pub fn get_current_device_id(&self, app_id: &AppId) -> Option<DeviceId> {
        self.inner
            .listener
            .on_current_device_id_update_required(app_id)
    }

    /// Resolve an application's permissions and push them to the
    /// listener with the default HMI level.
    pub fn send_notification_on_permissions_updated(&self, app_id: &AppId) {
        let Some(device_id) = self.get_current_device_id(app_id) else {
            tracing::warn!(app = %app_id, "couldn't find device info for application");
            return;
        };

        let permissions = self.get_permissions_for_app(&device_id, app_id);
        tracing::info!(app = %app_id, groups = permissions.len(),
            "sending permissions-updated notification");
        self.inner
            .listener
            .on_permissions_updated(app_id, &permissions, HmiLevel::None);
    }

    // ─── Pending consent ────────────────────────────────────────────

    /// Re-evaluate the consent-needed flag of a pending record from the
    /// application's current permissions.
    pub fn check_pending_permissions_changes(
        &self,
        app_id: &AppId,
        current_permissions: &[FunctionalGroupPermission],
    ) {
        self.inner
            .pending
            .check_pending_changes(app_id, current_permissions);
    }

    /// Drop stale groups from a proposed consent set by intersecting it
    /// with the application's currently valid consent candidates.
    pub fn ensure_correct_permission_consent(
        &self,
        proposed: &PermissionConsent,
    ) -> PermissionConsent {
        let currently_valid =
            self.get_user_consent_for_app(&proposed.device_id, &proposed.policy_app_id);
        pending::ensure_correct_permission_consent(proposed, &currently_valid)
    }

    /// The pending change record of an application, or a fresh record
    /// assembled from the current table when nothing is pending.
    pub fn get_app_permissions_changes(&self, app_id: &AppId) -> AppPermissions {
        self.inner.pending.get(app_id).unwrap_or_else(|| {
            let mut record = AppPermissions::new(app_id.clone());
            record.consent_needed = self.is_consent_needed(app_id);
            record.revoked = self.inner.cache.is_application_revoked(app_id);
            record.priority = self.inner.cache.priority(app_id);
            record
        })
    }

    /// Acknowledge and drop the pending record of an application.
    pub fn remove_pending_permission_changes(&self, app_id: &AppId) {
        self.inner.pending.remove(app_id);
    }

    /// Whether the application has consent decisions outstanding. Always
    /// false in this deployment; consent is granted by classification.
    pub fn is_consent_needed(&self, _app_id: &AppId) -> bool {
        false
    }

    // ─── Cache-backed queries ───────────────────────────────────────

    pub fn get_priority(&self, app_id: &AppId) -> Option<Priority> {
        self.inner.cache.priority(app_id)
    }

    pub fn is_application_revoked(&self, app_id: &AppId) -> bool {
        self.inner.cache.is_application_revoked(app_id)
    }

    pub fn is_predata_policy(&self, app_id: &AppId) -> bool {
        self.inner.cache.is_predata_policy(app_id)
    }

    pub fn can_app_keep_context(&self, app_id: &AppId) -> bool {
        self.inner.cache.can_app_keep_context(app_id)
    }

    pub fn can_app_steal_focus(&self, app_id: &AppId) -> bool {
        self.inner.cache.can_app_steal_focus(app_id)
    }

    /// Nicknames and HMI types of an application, for registration.
    pub fn get_initial_app_data(&self, app_id: &AppId) -> Option<(Vec<String>, Vec<String>)> {
        self.inner.cache.initial_app_data(app_id)
    }

    /// The module certificate from the current table.
    pub fn retrieve_certificate(&self) -> Option<String> {
        self.inner.cache.certificate()
    }

    /// Endpoint URLs configured for a service type.
    pub fn get_service_urls(&self, service_type: &str) -> Vec<String> {
        self.inner.cache.service_urls(service_type)
    }

    // ─── Deployment-specific extension hooks ────────────────────────
    //
    // Contract points without logic in this deployment. They exist so the
    // dispatch layer has a stable surface; richer deployments override
    // the behavior behind the cache/listener boundary.

    /// Wipe all user consent decisions. No consent store here: no-op.
    pub fn reset_user_consent(&self) -> bool {
        true
    }

    /// Record user consent decisions for an application. No-op.
    pub fn set_user_consent_for_app(&self, _permissions: &PermissionConsent) {}

    /// Record device-level consent. Logged, otherwise a no-op.
    pub fn set_user_consent_for_device(&self, device_id: &DeviceId, allowed: bool) {
        let current = self.get_user_consent_for_device(device_id);
        if current != DeviceConsent::NoConsent
            && (current == DeviceConsent::Allowed) == allowed
        {
            tracing::info!(device = %device_id, allowed, "device consent unchanged");
        }
    }

    /// React to a device-consent change for one application. No-op.
    pub fn react_on_user_dev_consent_for_app(
        &self,
        _app_id: &AppId,
        _device_allowed: bool,
    ) -> bool {
        true
    }

    /// Store the vehicle identification number. No-op.
    pub fn set_vin_value(&self, _value: &str) {}

    /// Forget devices that are no longer paired. No-op.
    pub fn cleanup_unpaired_devices(&self) -> bool {
        true
    }

    /// Mark a device unpaired. No-op.
    pub fn mark_unpaired_device(&self, _device_id: &DeviceId) {}

    /// Record a newly connected device. Logged, otherwise a no-op.
    pub fn add_device(&self, device_id: &DeviceId, connection_type: &str) {
        tracing::debug!(device = %device_id, connection_type, "device connected");
    }

    /// Record the system language. No-op.
    pub fn set_system_language(&self, _language: &str) {}

    /// Record system information. No-op.
    pub fn set_system_info(
        &self,
        _ccpu_version: &str,
        _wers_country_code: &str,
        _language: &str,
    ) {
    }
}

/// The app storage folder must exist and be writable before the engine
/// initializes.
fn check_app_storage_folder(settings: &PolicySettings) -> bool {
    let folder = settings.app_storage_folder();
    match std::fs::metadata(folder) {
        Ok(metadata) if metadata.is_dir() => {
            if metadata.permissions().readonly() {
                tracing::warn!(folder = %folder.display(),
                    "app storage folder is not writable");
                return false;
            }
            true
        }
        _ => {
            tracing::warn!(folder = %folder.display(), "app storage folder doesn't exist");
            false
        }
    }
}
