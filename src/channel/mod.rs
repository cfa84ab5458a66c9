//! The hand-off primitive that connects adjacent pipeline stages.
//!
//! A rendezvous channel holds no buffer at all: a `put` only returns once the
//! consumer has taken that exact value. Chaining these channels is what gives
//! the pipeline its one-item-per-hop, end-to-end FIFO behaviour.

mod rendezvous;

pub use self::rendezvous::{ChannelClosed, Consumer, Producer, RendezvousChannel};
