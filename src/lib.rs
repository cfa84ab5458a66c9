//! This file is the root of the `stagepipe` Rust crate.
//!
//! `stagepipe` runs a fixed chain of transformation stages, one worker thread
//! per stage, joined by rendezvous channels that hand over exactly one item at
//! a time. Callers submit items continuously and get a completion handle back
//! for each; while stage *i* works on item *k*, stage *i+1* works on item *k-1*.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library so the Rust compiler
//!     knows they exist.
//! 2.  Re-exporting the public surface: `Pipeline`, its builder and config,
//!     the `Transform` capability, and the completion handle.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod channel;
pub mod completion;
pub mod config;
pub mod envelope;
pub mod pipeline;
pub mod stage;

mod error;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use channel::{ChannelClosed, Consumer, Producer, RendezvousChannel};
pub use completion::{completion_pair, Completer, CompletionHandle};
pub use config::{MonitoringConfig, PipelineConfig};
pub use envelope::Envelope;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineBuilder, TERMINAL_STAGE_NAME};
pub use stage::{Stage, StageState, StageStats, TerminalStage, Transform};

#[doc(hidden)]
pub use log as __log;
