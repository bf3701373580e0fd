//! Host OS side effects
//!
//! The coordinator only decides; the host performs. Framework users implement
//! [`PermissionHost`] over their platform bridge (JNI, Capacitor plugin, test
//! double). Requests and settings launches are asynchronous: the host returns
//! immediately and later feeds the result back through the lifecycle adapter.

use camgate_api::{Capability, CapabilityRequest, RequestToken};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::notice::Notice;

/// Android intent action for the application details page
pub const APPLICATION_DETAILS_SETTINGS: &str = "android.settings.APPLICATION_DETAILS_SETTINGS";

/// Error type for host operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Settings page unavailable: {0}")]
    SettingsUnavailable(String),

    #[error("Permission request rejected by host: {0}")]
    RequestRejected(String),

    #[error("Host error: {0}")]
    Other(String),
}

/// Settings page to open for this application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsTarget {
    action: &'static str,
    uri: String,
}

impl SettingsTarget {
    /// Application details page for the given package id
    pub fn for_application(application_id: &str) -> Self {
        Self {
            action: APPLICATION_DETAILS_SETTINGS,
            uri: format!("package:{}", application_id),
        }
    }

    /// Intent action
    pub fn action(&self) -> &str {
        self.action
    }

    /// Data URI, e.g. `package:com.example.app`
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Trait for performing permission side effects on the host
///
/// # Example
///
/// ```rust
/// use camgate::host::{HostError, PermissionHost, SettingsTarget};
/// use camgate::notice::Notice;
/// use camgate_api::{Capability, CapabilityRequest, RequestToken};
///
/// struct LogHost;
///
/// impl PermissionHost for LogHost {
///     fn request_permissions(&self, request: &CapabilityRequest) -> Result<(), HostError> {
///         println!("requesting {:?}", request.os_permissions());
///         Ok(())
///     }
///
///     fn open_application_settings(
///         &self,
///         target: &SettingsTarget,
///         _token: RequestToken,
///     ) -> Result<(), HostError> {
///         Err(HostError::SettingsUnavailable(target.uri().to_string()))
///     }
///
///     fn show_rationale(&self, capabilities: &[Capability]) {
///         println!("we need {:?}", capabilities);
///     }
///
///     fn show_notice(&self, notice: Notice) {
///         println!("{}", notice);
///     }
/// }
/// ```
pub trait PermissionHost: Send + Sync {
    /// Show the OS permission dialog; the result arrives later via callback
    fn request_permissions(&self, request: &CapabilityRequest) -> Result<(), HostError>;

    /// Launch the settings page; return arrives later via callback
    fn open_application_settings(
        &self,
        target: &SettingsTarget,
        token: RequestToken,
    ) -> Result<(), HostError>;

    /// Explain why the denied capabilities are needed
    fn show_rationale(&self, capabilities: &[Capability]);

    /// Display a short message
    fn show_notice(&self, notice: Notice);
}

// ============================================================================
// Recording Host (for testing)
// ============================================================================

/// A call made against [`RecordingHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Request(CapabilityRequest),
    OpenSettings { uri: String, token: RequestToken },
    Rationale(Vec<Capability>),
    Notice(Notice),
}

/// Host that records every call for testing
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    fail_settings: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent settings launches fail
    pub fn fail_settings_launches(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().clone()
    }

    pub fn requests(&self) -> Vec<CapabilityRequest> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                HostCall::Request(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                HostCall::Notice(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn settings_launches(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, HostCall::OpenSettings { .. }))
            .count()
    }

    pub fn rationales(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, HostCall::Rationale(_)))
            .count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HostCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PermissionHost for RecordingHost {
    fn request_permissions(&self, request: &CapabilityRequest) -> Result<(), HostError> {
        self.lock().push(HostCall::Request(request.clone()));
        Ok(())
    }

    fn open_application_settings(
        &self,
        target: &SettingsTarget,
        token: RequestToken,
    ) -> Result<(), HostError> {
        self.lock().push(HostCall::OpenSettings {
            uri: target.uri().to_string(),
            token,
        });
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(HostError::SettingsUnavailable(format!(
                "no activity handles {}",
                target.uri()
            )));
        }
        Ok(())
    }

    fn show_rationale(&self, capabilities: &[Capability]) {
        self.lock().push(HostCall::Rationale(capabilities.to_vec()));
    }

    fn show_notice(&self, notice: Notice) {
        self.lock().push(HostCall::Notice(notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_target() {
        let target = SettingsTarget::for_application("app.example.scanner");
        assert_eq!(target.uri(), "package:app.example.scanner");
        assert_eq!(target.action(), APPLICATION_DETAILS_SETTINGS);
    }

    #[test]
    fn test_recording_host() {
        let host = RecordingHost::new();
        let request = CapabilityRequest::new(RequestToken(100), [Capability::Camera]);

        host.request_permissions(&request).unwrap();
        host.show_notice(Notice::RequestingAccess);

        assert_eq!(host.requests(), vec![request]);
        assert_eq!(host.notices(), vec![Notice::RequestingAccess]);
        assert_eq!(host.calls().len(), 2);

        host.clear();
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_recording_host_settings_failure() {
        let host = RecordingHost::new();
        let target = SettingsTarget::for_application("app.example.scanner");

        assert!(host
            .open_application_settings(&target, RequestToken(101))
            .is_ok());

        host.fail_settings_launches(true);
        let err = host
            .open_application_settings(&target, RequestToken(101))
            .unwrap_err();
        assert!(matches!(err, HostError::SettingsUnavailable(_)));
        assert_eq!(host.settings_launches(), 2);
    }
}
