//! camgate: camera permission acquisition for barcode-scanning app shells
//!
//! This crate decides when to ask the host OS for camera (and, on older
//! releases, storage) permission, when to explain, when to send the user to
//! the settings page, and when to give up and let the app run without the
//! scanner. It is written against small traits so it runs the same on a
//! device bridge and in unit tests.
//!
//! # Architecture
//!
//! ```text
//!  host runtime ──trigger──► PermissionLifecycle ──► Coordinator ──► Action
//!       ▲                         │    ▲                  │
//!       │                         │    └── PermissionOracle (OS grant state)
//!       └──── PermissionHost ◄────┘
//!                                 └──► ReadinessSink ──► scanning feature
//! ```
//!
//! - [`resolver`]: capability set per OS version bucket
//! - [`oracle`]: read-only OS grant state, re-queried on every trigger
//! - [`coordinator`]: the state machine, pure and side-effect free
//! - [`lifecycle`]: binds host callbacks to the coordinator and performs actions
//! - [`readiness`]: one-way announcement to the scanning feature
//!
//! Grant state is never cached: every decision re-reads the oracle, so
//! permissions edited outside the app are always picked up on the next resume.

pub mod config;
pub mod coordinator;
pub mod host;
pub mod lifecycle;
pub mod notice;
pub mod oracle;
pub mod readiness;
pub mod resolver;
pub mod tracing_support;

pub use config::{ConfigError, PermissionConfig};
pub use coordinator::{
    evaluate_result, Action, Coordinator, CoordinatorState, ResultEvaluation, Trigger,
};
pub use host::{HostCall, HostError, PermissionHost, RecordingHost, SettingsTarget};
pub use lifecycle::{PermissionLifecycle, PermissionLifecycleBuilder};
pub use notice::Notice;
pub use oracle::{MemoryPermissionOracle, PermissionOracle, StatusSnapshot};
pub use readiness::{
    CompositeReadinessSink, MemoryReadinessSink, NullReadinessSink, ReadinessSink, SinkError,
    WatchReadinessSink,
};
pub use resolver::{resolve, CapabilityPolicy, LEGACY_MAX_API_LEVEL, MID_MAX_API_LEVEL};

pub use camgate_api::{
    CameraCapabilityReady, Capability, CapabilityRequest, DenialHistory, GrantStatus,
    OsVersionBucket, Outcome, RequestToken, StorageAccess,
};
