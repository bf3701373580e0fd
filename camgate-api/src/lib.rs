//! camgate-api: Shared permission vocabulary for camgate
//!
//! This crate defines the types exchanged between the permission core and
//! the features that depend on it (the barcode scanner). It carries no
//! behaviour beyond small conversions so both sides can depend on it cheaply.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// API version for compatibility checking
pub const API_VERSION: u32 = 1;

/// Android permission name for camera access
pub const ANDROID_CAMERA: &str = "android.permission.CAMERA";

/// Android permission name for reading shared storage
pub const ANDROID_READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";

/// Android permission name for writing shared storage
pub const ANDROID_WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";

/// Android `PackageManager.PERMISSION_GRANTED`
pub const ANDROID_PERMISSION_GRANTED: i32 = 0;

/// Storage access level needed by the scanning feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageAccess {
    /// Read shared storage only
    ReadOnly,
    /// Read and write shared storage
    ReadWrite,
}

/// A single OS-mediated access right
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Camera access (always required for scanning)
    Camera,
    /// Shared storage access
    Storage(StorageAccess),
}

impl Capability {
    /// Read-write storage
    pub const STORAGE: Capability = Capability::Storage(StorageAccess::ReadWrite);

    /// Read-only storage
    pub const STORAGE_READ: Capability = Capability::Storage(StorageAccess::ReadOnly);

    /// Android permission names backing this capability
    ///
    /// A capability is held only when every listed permission is granted.
    pub fn os_permissions(&self) -> &'static [&'static str] {
        match self {
            Self::Camera => &[ANDROID_CAMERA],
            Self::Storage(StorageAccess::ReadOnly) => &[ANDROID_READ_EXTERNAL_STORAGE],
            Self::Storage(StorageAccess::ReadWrite) => {
                &[ANDROID_WRITE_EXTERNAL_STORAGE, ANDROID_READ_EXTERNAL_STORAGE]
            }
        }
    }

    /// Map an Android permission name to the narrowest capability it belongs to
    pub fn from_os_permission(name: &str) -> Option<Self> {
        match name {
            ANDROID_CAMERA => Some(Self::Camera),
            ANDROID_READ_EXTERNAL_STORAGE => Some(Self::STORAGE_READ),
            ANDROID_WRITE_EXTERNAL_STORAGE => Some(Self::STORAGE),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Storage(StorageAccess::ReadOnly) => write!(f, "storage (read-only)"),
            Self::Storage(StorageAccess::ReadWrite) => write!(f, "storage"),
        }
    }
}

/// Whether a capability is currently permitted by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Granted,
    Denied,
    /// Not yet queried
    #[default]
    Unknown,
}

impl GrantStatus {
    /// Check if the capability is held
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Convert an Android grant result code
    ///
    /// Anything other than `PERMISSION_GRANTED` counts as denied.
    pub fn from_android(code: i32) -> Self {
        if code == ANDROID_PERMISSION_GRANTED {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Ordinal classification of the host OS release
///
/// Buckets are mutually exclusive and ordered by release: `Legacy < Mid < Current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsVersionBucket {
    Legacy,
    Mid,
    Current,
}

/// Correlation token pairing an asynchronous request with its callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(pub i32);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered set of capabilities bound to one OS permission request
///
/// Immutable once built; duplicates are dropped, first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRequest {
    token: RequestToken,
    capabilities: Vec<Capability>,
}

impl CapabilityRequest {
    /// Create a request for the given capabilities
    pub fn new(token: RequestToken, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        let mut ordered = Vec::new();
        for cap in capabilities {
            if !ordered.contains(&cap) {
                ordered.push(cap);
            }
        }
        Self {
            token,
            capabilities: ordered,
        }
    }

    /// Correlation token of this request
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Requested capabilities, in request order
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Flattened Android permission names, without duplicates
    pub fn os_permissions(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for cap in &self.capabilities {
            for name in cap.os_permissions() {
                if !names.contains(name) {
                    names.push(*name);
                }
            }
        }
        names
    }
}

/// Capabilities the OS no longer recommends explaining ("don't ask again")
///
/// Always read fresh from the OS; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenialHistory {
    suppressed: BTreeSet<Capability>,
}

impl DenialHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a capability as permanently denied
    pub fn suppress(&mut self, capability: Capability) {
        self.suppressed.insert(capability);
    }

    pub fn is_suppressed(&self, capability: Capability) -> bool {
        self.suppressed.contains(&capability)
    }

    /// Check if any of the given capabilities is permanently denied
    pub fn any_suppressed<'a>(&self, capabilities: impl IntoIterator<Item = &'a Capability>) -> bool {
        capabilities.into_iter().any(|c| self.is_suppressed(*c))
    }

    pub fn is_empty(&self) -> bool {
        self.suppressed.is_empty()
    }
}

impl FromIterator<Capability> for DenialHistory {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            suppressed: iter.into_iter().collect(),
        }
    }
}

/// Terminal outcome of a permission acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AllGranted,
    PartiallyDenied,
}

/// Announcement consumed by the scanning feature
///
/// Carries nothing beyond the success / partial-denial flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraCapabilityReady {
    pub outcome: Outcome,
}

impl CameraCapabilityReady {
    pub fn granted() -> Self {
        Self {
            outcome: Outcome::AllGranted,
        }
    }

    pub fn partially_denied() -> Self {
        Self {
            outcome: Outcome::PartiallyDenied,
        }
    }

    /// Whether the scanning feature may activate
    pub fn is_ready(&self) -> bool {
        self.outcome == Outcome::AllGranted
    }
}

impl From<Outcome> for CameraCapabilityReady {
    fn from(outcome: Outcome) -> Self {
        Self { outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_dedups_in_order() {
        let req = CapabilityRequest::new(
            RequestToken(100),
            [Capability::Camera, Capability::STORAGE, Capability::Camera],
        );
        assert_eq!(req.capabilities(), &[Capability::Camera, Capability::STORAGE]);
        assert_eq!(req.token(), RequestToken(100));
    }

    #[test]
    fn test_request_os_permissions() {
        let req = CapabilityRequest::new(
            RequestToken(100),
            [Capability::Camera, Capability::STORAGE, Capability::STORAGE_READ],
        );
        assert_eq!(
            req.os_permissions(),
            vec![
                ANDROID_CAMERA,
                ANDROID_WRITE_EXTERNAL_STORAGE,
                ANDROID_READ_EXTERNAL_STORAGE
            ]
        );
    }

    #[test]
    fn test_os_permission_mapping() {
        assert_eq!(
            Capability::from_os_permission(ANDROID_CAMERA),
            Some(Capability::Camera)
        );
        assert_eq!(
            Capability::from_os_permission(ANDROID_WRITE_EXTERNAL_STORAGE),
            Some(Capability::STORAGE)
        );
        assert_eq!(Capability::from_os_permission("android.permission.NFC"), None);
    }

    #[test]
    fn test_grant_status_from_android() {
        assert_eq!(GrantStatus::from_android(0), GrantStatus::Granted);
        assert_eq!(GrantStatus::from_android(-1), GrantStatus::Denied);
        assert_eq!(GrantStatus::default(), GrantStatus::Unknown);
    }

    #[test]
    fn test_bucket_ordering() {
        assert!(OsVersionBucket::Legacy < OsVersionBucket::Mid);
        assert!(OsVersionBucket::Mid < OsVersionBucket::Current);
    }

    #[test]
    fn test_denial_history() {
        let history: DenialHistory = [Capability::Camera].into_iter().collect();
        assert!(history.is_suppressed(Capability::Camera));
        assert!(!history.is_suppressed(Capability::STORAGE));
        assert!(history.any_suppressed(&[Capability::STORAGE, Capability::Camera]));
        assert!(!DenialHistory::new().any_suppressed(&[Capability::Camera]));
    }

    #[test]
    fn test_capability_serialization() {
        let json = serde_json::to_string(&Capability::STORAGE_READ).unwrap();
        assert_eq!(json, r#"{"storage":"read_only"}"#);
        let json = serde_json::to_string(&Capability::Camera).unwrap();
        assert_eq!(json, r#""camera""#);
    }
}
