//! Permission status queries against the host OS
//!
//! The oracle is the only trusted source of grant state. It is queried on
//! every lifecycle trigger and nothing it returns is cached beyond a single
//! decision, so edits the user makes in system settings are always seen.

use camgate_api::{Capability, DenialHistory, GrantStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Every capability the scanning feature may ever ask for
pub const KNOWN_CAPABILITIES: [Capability; 3] = [
    Capability::Camera,
    Capability::STORAGE,
    Capability::STORAGE_READ,
];

/// Read-only view of host OS permission state
///
/// Implementations must be side-effect free and cheap enough to call on
/// every resume.
pub trait PermissionOracle: Send + Sync {
    /// Current grant status of a capability
    fn status(&self, capability: Capability) -> GrantStatus;

    /// Whether the OS recommends explaining before asking again
    ///
    /// `false` after a denial means the user chose "don't ask again".
    fn should_show_rationale(&self, capability: Capability) -> bool;

    /// Capabilities among `capabilities` that the OS will no longer explain
    fn denial_history(&self, capabilities: &[Capability]) -> DenialHistory {
        capabilities
            .iter()
            .copied()
            .filter(|c| !self.should_show_rationale(*c))
            .collect()
    }

    /// Capabilities among `capabilities` that are not currently granted
    fn missing(&self, capabilities: &[Capability]) -> Vec<Capability> {
        capabilities
            .iter()
            .copied()
            .filter(|c| !self.status(*c).is_granted())
            .collect()
    }

    /// Status of every known capability, for diagnostics
    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            taken_at: Utc::now(),
            entries: KNOWN_CAPABILITIES
                .iter()
                .map(|c| (*c, self.status(*c)))
                .collect(),
        }
    }
}

/// Point-in-time grant status of all known capabilities
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<(Capability, GrantStatus)>,
}

impl StatusSnapshot {
    pub fn status_of(&self, capability: Capability) -> GrantStatus {
        self.entries
            .iter()
            .find(|(c, _)| *c == capability)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    /// One-line summary such as `camera=granted storage=denied`
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(cap, status)| {
                let name = match cap {
                    Capability::Camera => "camera",
                    Capability::Storage(camgate_api::StorageAccess::ReadWrite) => "storage_write",
                    Capability::Storage(camgate_api::StorageAccess::ReadOnly) => "storage_read",
                };
                let status = match status {
                    GrantStatus::Granted => "granted",
                    GrantStatus::Denied => "denied",
                    GrantStatus::Unknown => "unknown",
                };
                format!("{}={}", name, status)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// In-Memory Oracle
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct OracleEntry {
    status: GrantStatus,
    rationale: bool,
}

/// In-memory oracle for tests and simulations
///
/// Stands in for the OS permission table. Mutating it between triggers
/// models the user editing permissions outside the app.
#[derive(Debug, Default)]
pub struct MemoryPermissionOracle {
    entries: RwLock<HashMap<Capability, OracleEntry>>,
}

impl MemoryPermissionOracle {
    /// Create an oracle where everything is `Unknown`
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an oracle with the given capabilities already granted
    pub fn with_granted(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        let oracle = Self::new();
        for cap in capabilities {
            oracle.grant(cap);
        }
        oracle
    }

    pub fn grant(&self, capability: Capability) {
        self.set(capability, GrantStatus::Granted, false);
    }

    /// Deny, with the OS still willing to show a rationale
    pub fn deny(&self, capability: Capability) {
        self.set(capability, GrantStatus::Denied, true);
    }

    /// Deny with "don't ask again"
    pub fn deny_permanently(&self, capability: Capability) {
        self.set(capability, GrantStatus::Denied, false);
    }

    /// Revoke everything back to `Unknown`
    pub fn reset(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn set(&self, capability: Capability, status: GrantStatus, rationale: bool) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(capability, OracleEntry { status, rationale });
    }

    fn entry(&self, capability: Capability) -> OracleEntry {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&capability)
            .copied()
            .unwrap_or_default()
    }
}

impl PermissionOracle for MemoryPermissionOracle {
    fn status(&self, capability: Capability) -> GrantStatus {
        self.entry(capability).status
    }

    fn should_show_rationale(&self, capability: Capability) -> bool {
        self.entry(capability).rationale
    }
}
