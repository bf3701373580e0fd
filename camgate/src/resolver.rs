//! Capability set resolution by OS version
//!
//! Maps an OS version bucket to the minimal set of capabilities the
//! scanning feature needs. The bucket boundaries are platform-behaviour
//! contracts, so they live in [`CapabilityPolicy`] as overridable data
//! rather than as literals in the decision code.

use camgate_api::{Capability, OsVersionBucket};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Highest API level treated as legacy (Android 9, "P").
///
/// Up to here the scanner needs full shared-storage access.
pub const LEGACY_MAX_API_LEVEL: u32 = 28;

/// Highest API level treated as mid (Android 12L, "S_V2").
///
/// Scoped storage is in force but media reads still need a storage grant.
pub const MID_MAX_API_LEVEL: u32 = 32;

/// Capability sets per OS version bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityPolicy {
    /// Inclusive upper API level of the legacy bucket
    pub legacy_max_api_level: u32,
    /// Inclusive upper API level of the mid bucket
    pub mid_max_api_level: u32,
    pub legacy: Vec<Capability>,
    pub mid: Vec<Capability>,
    pub current: Vec<Capability>,
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self {
            legacy_max_api_level: LEGACY_MAX_API_LEVEL,
            mid_max_api_level: MID_MAX_API_LEVEL,
            legacy: vec![Capability::Camera, Capability::STORAGE],
            mid: vec![Capability::Camera, Capability::STORAGE_READ],
            current: vec![Capability::Camera],
        }
    }
}

impl CapabilityPolicy {
    /// Classify an API level into its bucket
    pub fn bucket_for(&self, api_level: u32) -> OsVersionBucket {
        if api_level <= self.legacy_max_api_level {
            OsVersionBucket::Legacy
        } else if api_level <= self.mid_max_api_level {
            OsVersionBucket::Mid
        } else {
            OsVersionBucket::Current
        }
    }

    /// Capabilities required in the given bucket
    ///
    /// Camera is always included and always first, whatever the configured sets say.
    pub fn resolve(&self, bucket: OsVersionBucket) -> Vec<Capability> {
        let configured = match bucket {
            OsVersionBucket::Legacy => &self.legacy,
            OsVersionBucket::Mid => &self.mid,
            OsVersionBucket::Current => &self.current,
        };

        let mut caps = vec![Capability::Camera];
        for cap in configured {
            if !caps.contains(cap) {
                caps.push(*cap);
            }
        }
        caps
    }

    /// Capabilities required at the given API level
    pub fn resolve_api_level(&self, api_level: u32) -> Vec<Capability> {
        self.resolve(self.bucket_for(api_level))
    }

    /// Check that the buckets do not overlap
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.legacy_max_api_level >= self.mid_max_api_level {
            return Err(ConfigError::Invalid(format!(
                "legacy_max_api_level ({}) must be below mid_max_api_level ({})",
                self.legacy_max_api_level, self.mid_max_api_level
            )));
        }
        Ok(())
    }
}

/// Resolve with the built-in policy
pub fn resolve(bucket: OsVersionBucket) -> Vec<Capability> {
    CapabilityPolicy::default().resolve(bucket)
}
