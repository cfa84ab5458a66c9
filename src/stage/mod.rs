//! This module defines the workers that make up a pipeline.
//!
//! A `Stage` owns one `Transform` and the two channel ends around it: it takes
//! an envelope, transforms the payload in place, and forwards the envelope. The
//! `TerminalStage` closes the chain by writing each payload into its completion
//! handle. Both run the same two-state machine and stop after exactly one
//! shutdown envelope.

use std::time::Duration;

//==================================================================================
// 1. Module Declarations
//==================================================================================

mod transform;
mod worker;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use self::transform::Transform;
pub use self::worker::{Stage, TerminalStage};

/// The lifecycle of a worker. `Draining` is terminal; there is no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Running,
    Draining,
}

/// What a worker reports when it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStats {
    pub name: String,
    /// Live items this worker handed on (or completed, for the terminal stage).
    pub processed: u64,
    /// Total time spent inside the transform.
    pub busy: Duration,
}

impl StageStats {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            processed: 0,
            busy: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, busy: Duration) {
        self.processed += 1;
        self.busy += busy;
    }
}
