//! Lifecycle adapter binding the coordinator to host callbacks
//!
//! The host runtime forwards its lifecycle events here (`on_start`,
//! `on_resume`, the permission result and the return from settings). The
//! adapter feeds them to the [`Coordinator`], then performs whatever action
//! comes back against the [`PermissionHost`] and announces settled outcomes
//! on the [`ReadinessSink`].
//!
//! All calls are expected on the host's UI thread; the adapter takes
//! `&mut self` and needs no locking of its own.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use camgate::{
//!     MemoryPermissionOracle, PermissionConfig, PermissionLifecycleBuilder, RecordingHost,
//!     WatchReadinessSink,
//! };
//! use camgate_api::{Capability, GrantStatus};
//!
//! let oracle = Arc::new(MemoryPermissionOracle::new());
//! let host = Arc::new(RecordingHost::new());
//! let readiness = Arc::new(WatchReadinessSink::new());
//!
//! let mut lifecycle = PermissionLifecycleBuilder::new()
//!     .config(PermissionConfig::new("app.example.scanner"))
//!     .oracle_arc(oracle.clone())
//!     .host_arc(host.clone())
//!     .readiness_arc(readiness.clone())
//!     .build()
//!     .unwrap();
//!
//! lifecycle.on_start();
//! let token = host.requests()[0].token();
//!
//! oracle.grant(Capability::Camera);
//! lifecycle.on_permission_result(token, &[Capability::Camera], &[GrantStatus::Granted]);
//! assert!(readiness.latest().unwrap().is_ready());
//! ```

use camgate_api::{
    CameraCapabilityReady, Capability, GrantStatus, Outcome, RequestToken,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, PermissionConfig};
use crate::coordinator::{Action, Coordinator, CoordinatorState, Trigger};
use crate::host::{PermissionHost, SettingsTarget};
use crate::notice::Notice;
use crate::oracle::{PermissionOracle, KNOWN_CAPABILITIES};
use crate::readiness::{NullReadinessSink, ReadinessSink};

/// Binds a coordinator to host lifecycle events
pub struct PermissionLifecycle {
    coordinator: Coordinator,
    oracle: Arc<dyn PermissionOracle>,
    host: Arc<dyn PermissionHost>,
    readiness: Arc<dyn ReadinessSink>,
    settings_target: SettingsTarget,
    retry_after_rationale: bool,
}

impl std::fmt::Debug for PermissionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionLifecycle")
            .field("coordinator", &self.coordinator)
            .field("settings_target", &self.settings_target)
            .field("retry_after_rationale", &self.retry_after_rationale)
            .finish_non_exhaustive()
    }
}

impl PermissionLifecycle {
    /// Create an adapter from a validated configuration and collaborators
    pub fn new(
        config: &PermissionConfig,
        oracle: Arc<dyn PermissionOracle>,
        host: Arc<dyn PermissionHost>,
        readiness: Arc<dyn ReadinessSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let required = config.required_capabilities();
        info!(
            api_level = config.api_level,
            bucket = ?config.bucket(),
            required = ?required,
            "Permission lifecycle configured"
        );

        Ok(Self {
            coordinator: Coordinator::new(
                required,
                config.request_token(),
                config.settings_token(),
            ),
            oracle,
            host,
            readiness,
            settings_target: config.settings_target(),
            retry_after_rationale: config.retry_after_rationale,
        })
    }

    pub fn state(&self) -> &CoordinatorState {
        self.coordinator.state()
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Application start; fires once per process
    pub fn on_start(&mut self) -> Action {
        let action = self.dispatch(Trigger::Start);
        if action == Action::Proceed(Outcome::AllGranted) {
            debug!(
                status = %self.oracle.snapshot().summary(),
                "Camera permission already granted"
            );
        }
        action
    }

    /// The app regained the foreground
    pub fn on_resume(&mut self) -> Action {
        self.dispatch(Trigger::Resume)
    }

    /// OS permission result with capabilities already mapped
    pub fn on_permission_result(
        &mut self,
        token: RequestToken,
        capabilities: &[Capability],
        results: &[GrantStatus],
    ) -> Action {
        self.dispatch(Trigger::PermissionResult {
            token,
            capabilities: capabilities.to_vec(),
            results: results.to_vec(),
        })
    }

    /// OS permission result as raw Android parallel arrays
    ///
    /// `grant_results` holds `PackageManager` codes (`0` granted, `-1` denied).
    /// A capability backed by several permissions is granted only when all of
    /// them are; one whose permissions are not all present is left out and so
    /// counts as denied.
    pub fn on_os_permission_result(
        &mut self,
        token: RequestToken,
        permissions: &[&str],
        grant_results: &[i32],
    ) -> Action {
        if permissions.len() != grant_results.len() {
            warn!(
                permissions = permissions.len(),
                results = grant_results.len(),
                "Permission result arrays differ in length"
            );
            let capabilities: Vec<Capability> = permissions
                .iter()
                .filter_map(|name| Capability::from_os_permission(name))
                .collect();
            let mut results: Vec<GrantStatus> = grant_results
                .iter()
                .map(|code| GrantStatus::from_android(*code))
                .collect();
            // Dropping unrecognized names can even the counts; the pairing is lost either way.
            if capabilities.len() == results.len() {
                results.fill(GrantStatus::Denied);
            }
            return self.on_permission_result(token, &capabilities, &results);
        }

        for name in permissions {
            if Capability::from_os_permission(name).is_none() {
                warn!(permission = %name, "Unrecognized permission in result callback");
            }
        }

        let mut capabilities = Vec::new();
        let mut results = Vec::new();
        for cap in KNOWN_CAPABILITIES {
            let statuses: Vec<GrantStatus> = cap
                .os_permissions()
                .iter()
                .map(|needed| {
                    permissions
                        .iter()
                        .zip(grant_results)
                        .find(|(name, _)| *name == needed)
                        .map(|(_, code)| GrantStatus::from_android(*code))
                })
                .collect::<Option<Vec<_>>>()
                .unwrap_or_default();

            if statuses.is_empty() {
                continue;
            }
            capabilities.push(cap);
            results.push(if statuses.iter().all(GrantStatus::is_granted) {
                GrantStatus::Granted
            } else {
                GrantStatus::Denied
            });
        }

        self.on_permission_result(token, &capabilities, &results)
    }

    /// Control returned from the settings page
    pub fn on_settings_return(&mut self, token: RequestToken) -> Action {
        self.dispatch(Trigger::SettingsReturn { token })
    }

    /// The user dismissed the rationale
    ///
    /// Re-requests straight away when `retry_after_rationale` is set.
    pub fn on_rationale_acknowledged(&mut self) -> Action {
        let action = self.dispatch(Trigger::RationaleAcknowledged);
        if self.retry_after_rationale && *self.state() == CoordinatorState::Idle {
            return self.dispatch(Trigger::UserRetry);
        }
        action
    }

    /// The user asked for the scanner again
    pub fn on_user_retry(&mut self) -> Action {
        self.dispatch(Trigger::UserRetry)
    }

    fn dispatch(&mut self, trigger: Trigger) -> Action {
        let prompted = self.state().is_pending();
        let action = self.coordinator.handle(trigger, self.oracle.as_ref());
        self.perform(&action, prompted);
        action
    }

    fn perform(&self, action: &Action, prompted: bool) {
        match action {
            Action::Request(request) => {
                info!(
                    token = %request.token(),
                    permissions = ?request.os_permissions(),
                    "Requesting permissions"
                );
                self.host.show_notice(Notice::RequestingAccess);
                if let Err(e) = self.host.request_permissions(request) {
                    warn!(error = %e, "Permission request failed, waiting for next resume");
                }
            }
            Action::ExplainRationale { denied } => {
                info!(denied = ?denied, "Permission denied, showing rationale");
                self.host.show_notice(Notice::AccessDenied);
                self.host.show_rationale(denied);
            }
            Action::OpenSettings { token, missing } => {
                info!(%token, missing = ?missing, "Permission permanently denied, opening settings");
                self.host.show_notice(Notice::AccessDenied);
                self.host.show_notice(Notice::OpeningSettings);
                if let Err(e) = self
                    .host
                    .open_application_settings(&self.settings_target, *token)
                {
                    warn!(
                        error = %e,
                        uri = self.settings_target.uri(),
                        "Could not open settings page"
                    );
                    self.host.show_notice(Notice::SettingsUnavailable);
                }
            }
            Action::Proceed(outcome) => {
                match outcome {
                    Outcome::AllGranted if prompted => {
                        self.host.show_notice(Notice::AccessGranted)
                    }
                    Outcome::AllGranted => {}
                    Outcome::PartiallyDenied => self.host.show_notice(Notice::FeatureUnavailable),
                }
                self.announce(*outcome);
            }
            Action::NoOp => {}
        }
    }

    fn announce(&self, outcome: Outcome) {
        info!(outcome = ?outcome, "Announcing camera capability readiness");
        if let Err(e) = self.readiness.notify(CameraCapabilityReady::from(outcome)) {
            warn!(error = %e, "Readiness sink failed");
        }
    }
}

/// Builder for [`PermissionLifecycle`]
#[derive(Default)]
pub struct PermissionLifecycleBuilder {
    config: Option<PermissionConfig>,
    oracle: Option<Arc<dyn PermissionOracle>>,
    host: Option<Arc<dyn PermissionHost>>,
    readiness: Option<Arc<dyn ReadinessSink>>,
}

impl PermissionLifecycleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: PermissionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn oracle(mut self, oracle: impl PermissionOracle + 'static) -> Self {
        self.oracle = Some(Arc::new(oracle));
        self
    }

    /// Set a shared oracle the caller keeps a handle to
    pub fn oracle_arc(mut self, oracle: Arc<dyn PermissionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn host(mut self, host: impl PermissionHost + 'static) -> Self {
        self.host = Some(Arc::new(host));
        self
    }

    pub fn host_arc(mut self, host: Arc<dyn PermissionHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn readiness(mut self, readiness: impl ReadinessSink + 'static) -> Self {
        self.readiness = Some(Arc::new(readiness));
        self
    }

    pub fn readiness_arc(mut self, readiness: Arc<dyn ReadinessSink>) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Build the adapter
    ///
    /// Oracle, host and configuration are required; readiness defaults to a null sink.
    pub fn build(self) -> Result<PermissionLifecycle, ConfigError> {
        let config = self.config.ok_or(ConfigError::MissingComponent("config"))?;
        let oracle = self.oracle.ok_or(ConfigError::MissingComponent("oracle"))?;
        let host = self.host.ok_or(ConfigError::MissingComponent("host"))?;
        let readiness = self
            .readiness
            .unwrap_or_else(|| Arc::new(NullReadinessSink));

        PermissionLifecycle::new(&config, oracle, host, readiness)
    }
}
