// In: src/envelope.rs

//! The unit that travels through the rendezvous channels.

use crate::completion::Completer;

/// Either a live item on its way to the terminal stage, or the shutdown
/// marker. Ownership moves with the envelope at every hop.
#[derive(Debug)]
pub enum Envelope<T> {
    Live {
        /// Submission order, starting at 0. Used for tracing only.
        seq: u64,
        payload: T,
        /// Filled by the terminal stage; untouched by intermediate stages.
        completion: Completer<T>,
    },
    /// The poison envelope. Each stage that receives it sends a fresh one
    /// downstream and stops.
    Shutdown,
}

impl<T> Envelope<T> {
    pub fn live(seq: u64, payload: T, completion: Completer<T>) -> Self {
        Envelope::Live {
            seq,
            payload,
            completion,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, Envelope::Shutdown)
    }

    pub fn seq(&self) -> Option<u64> {
        match self {
            Envelope::Live { seq, .. } => Some(*seq),
            Envelope::Shutdown => None,
        }
    }
}
