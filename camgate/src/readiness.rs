//! Readiness announcements for the scanning feature
//!
//! One-way, at-least-once notification that camera permission has settled.
//! Sinks must tolerate being called while nobody is listening; the watch
//! sink keeps the latest announcement so a late subscriber can read it at
//! its own initialization.

use camgate_api::{CameraCapabilityReady, Outcome};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;

/// Error type for readiness sinks
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Readiness channel closed")]
    Closed,

    #[error("Readiness sink not available: {0}")]
    Unavailable(String),
}

/// Trait for readiness announcement sinks
pub trait ReadinessSink: Send + Sync {
    /// Announce that permission has settled
    fn notify(&self, event: CameraCapabilityReady) -> Result<(), SinkError>;

    /// Check if the sink is healthy/available
    fn is_healthy(&self) -> bool {
        true
    }
}

impl<T: ReadinessSink + ?Sized> ReadinessSink for Arc<T> {
    fn notify(&self, event: CameraCapabilityReady) -> Result<(), SinkError> {
        (**self).notify(event)
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}

// ============================================================================
// Watch Channel Sink
// ============================================================================

/// Sink backed by a `tokio::sync::watch` channel
///
/// Holds the latest announcement; subscribers see it immediately.
pub struct WatchReadinessSink {
    tx: watch::Sender<Option<CameraCapabilityReady>>,
}

impl WatchReadinessSink {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Subscribe to announcements
    pub fn subscribe(&self) -> watch::Receiver<Option<CameraCapabilityReady>> {
        self.tx.subscribe()
    }

    /// Latest announcement, if any
    pub fn latest(&self) -> Option<CameraCapabilityReady> {
        *self.tx.borrow()
    }
}

impl Default for WatchReadinessSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSink for WatchReadinessSink {
    fn notify(&self, event: CameraCapabilityReady) -> Result<(), SinkError> {
        // send_replace succeeds with zero receivers
        self.tx.send_replace(Some(event));
        Ok(())
    }
}

impl fmt::Debug for WatchReadinessSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchReadinessSink")
            .field("latest", &self.latest())
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

// ============================================================================
// In-Memory Sink
// ============================================================================

/// In-memory sink for testing
#[derive(Debug, Default)]
pub struct MemoryReadinessSink {
    events: RwLock<Vec<CameraCapabilityReady>>,
}

impl MemoryReadinessSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events
    pub fn events(&self) -> Vec<CameraCapabilityReady> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Count events with the given outcome
    pub fn count_outcome(&self, outcome: Outcome) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.outcome == outcome)
            .count()
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ReadinessSink for MemoryReadinessSink {
    fn notify(&self, event: CameraCapabilityReady) -> Result<(), SinkError> {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

/// Null sink (discards all events)
#[derive(Debug, Default)]
pub struct NullReadinessSink;

impl ReadinessSink for NullReadinessSink {
    fn notify(&self, _event: CameraCapabilityReady) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Composite sink that announces to multiple sinks
///
/// Every sink is attempted; the first error is returned.
#[derive(Default)]
pub struct CompositeReadinessSink {
    sinks: Vec<Box<dyn ReadinessSink>>,
}

impl CompositeReadinessSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: impl ReadinessSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl ReadinessSink for CompositeReadinessSink {
    fn notify(&self, event: CameraCapabilityReady) -> Result<(), SinkError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(event) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.sinks.iter().all(|s| s.is_healthy())
    }
}

impl fmt::Debug for CompositeReadinessSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeReadinessSink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
