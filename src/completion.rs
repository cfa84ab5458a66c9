// In: src/completion.rs

//! One-shot result containers handed back by `Pipeline::submit`.
//!
//! Every submitted item gets a pair: the caller keeps the [`CompletionHandle`]
//! and the [`Completer`] rides along inside the item's envelope until the
//! terminal stage fills it. `Completer::complete` consumes the completer, so
//! the value is set at most once by construction. A completer dropped without
//! completing (its stage failed) marks the handle abandoned instead of leaving
//! readers blocked forever.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::{PipelineError, Result};

enum Slot<T> {
    Pending,
    Ready(T),
    Abandoned,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn resolve(&self, next: Slot<T>) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Pending) {
            *slot = next;
            self.ready.notify_all();
        }
    }
}

/// Creates a linked completer/handle pair.
pub fn completion_pair<T>() -> (Completer<T>, CompletionHandle<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
    });
    (
        Completer {
            shared: Some(Arc::clone(&shared)),
        },
        CompletionHandle { shared },
    )
}

//==================================================================================
// 1. Write Half
//==================================================================================

/// The write half; owned by whichever stage currently holds the item.
pub struct Completer<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Completer<T> {
    /// Stores the final value and wakes every reader.
    pub fn complete(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(Slot::Ready(value));
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            log::warn!("completion dropped before a value was set; marking item abandoned");
            shared.resolve(Slot::Abandoned);
        }
    }
}

impl<T> std::fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer")
            .field("armed", &self.shared.is_some())
            .finish()
    }
}

//==================================================================================
// 2. Read Half
//==================================================================================

/// The caller's view of a submitted item's result.
///
/// Reads block until the terminal stage has set the value. Once set, the value
/// never changes.
pub struct CompletionHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> CompletionHandle<T> {
    /// True once the value is set or the item was abandoned.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.shared.slot.lock(), Slot::Pending)
    }

    /// Blocks until the value is set and moves it out.
    pub fn wait(self) -> Result<T> {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.ready.wait(&mut slot);
        }
        // The caller holds the only read half, so the value can be taken.
        match std::mem::replace(&mut *slot, Slot::Abandoned) {
            Slot::Ready(value) => Ok(value),
            _ => Err(PipelineError::Abandoned),
        }
    }
}

impl<T: Clone> CompletionHandle<T> {
    /// Blocks until the value is set. Repeated calls return the same value.
    pub fn get(&self) -> Result<T> {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.ready.wait(&mut slot);
        }
        read_settled(&slot)
    }

    /// Non-blocking read; `None` while the item is still in flight.
    pub fn try_get(&self) -> Option<Result<T>> {
        let slot = self.shared.slot.lock();
        match *slot {
            Slot::Pending => None,
            _ => Some(read_settled(&slot)),
        }
    }

    /// Like [`get`](Self::get) but gives up after `timeout`, returning `None`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        let mut slot = self.shared.slot.lock();
        if matches!(*slot, Slot::Pending) {
            // Spurious wakeups are fine: the slot is re-checked below.
            let _ = self.shared.ready.wait_for(&mut slot, timeout);
        }
        match *slot {
            Slot::Pending => None,
            _ => Some(read_settled(&slot)),
        }
    }
}

fn read_settled<T: Clone>(slot: &Slot<T>) -> Result<T> {
    match slot {
        Slot::Ready(value) => Ok(value.clone()),
        _ => Err(PipelineError::Abandoned),
    }
}

impl<T> std::fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_blocks_until_completed() {
        let (completer, handle) = completion_pair::<u64>();
        assert!(!handle.is_ready());

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            completer.complete(99);
        });

        assert_eq!(handle.get().unwrap(), 99);
        writer.join().unwrap();
    }

    #[test]
    fn test_repeated_reads_return_same_value() {
        let (completer, handle) = completion_pair::<String>();
        completer.complete("done".to_string());

        assert_eq!(handle.get().unwrap(), "done");
        assert_eq!(handle.get().unwrap(), "done");
        assert_eq!(handle.try_get().unwrap().unwrap(), "done");
        assert_eq!(handle.wait().unwrap(), "done");
    }

    #[test]
    fn test_try_get_is_none_while_pending() {
        let (_completer, handle) = completion_pair::<i32>();
        assert!(handle.try_get().is_none());
        assert!(handle.wait_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_dropped_completer_abandons_handle() {
        let (completer, handle) = completion_pair::<i32>();
        let dropper = thread::spawn(move || drop(completer));

        assert!(matches!(handle.get(), Err(PipelineError::Abandoned)));
        dropper.join().unwrap();
        assert!(handle.is_ready());
    }

    #[test]
    fn test_wait_moves_non_clone_value() {
        struct NotClone(u8);

        let (completer, handle) = completion_pair::<NotClone>();
        completer.complete(NotClone(3));
        assert_eq!(handle.wait().unwrap().0, 3);
    }
}
