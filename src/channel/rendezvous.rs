// In: src/channel/rendezvous.rs

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

/// Returned by a split end when its peer has been dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rendezvous peer has been dropped")]
pub struct ChannelClosed;

//==================================================================================
// 1. Split Ends
//==================================================================================

/// The writing end of a rendezvous channel. Exactly one exists per channel.
#[derive(Debug)]
pub struct Producer<T> {
    tx: Sender<T>,
}

impl<T> Producer<T> {
    /// Hands `item` to the consumer.
    ///
    /// Blocks until the consumer has taken this exact value. If the consumer
    /// is dropped first, the item is dropped and `ChannelClosed` is returned.
    pub fn put(&self, item: T) -> Result<(), ChannelClosed> {
        self.tx.send(item).map_err(|_| ChannelClosed)
    }
}

/// The reading end of a rendezvous channel. Exactly one exists per channel.
#[derive(Debug)]
pub struct Consumer<T> {
    rx: Receiver<T>,
}

impl<T> Consumer<T> {
    /// Blocks until the producer offers a value and collects it, releasing the
    /// producer's pending `put`.
    pub fn take(&self) -> Result<T, ChannelClosed> {
        self.rx.recv().map_err(|_| ChannelClosed)
    }
}

//==================================================================================
// 2. The Joined Channel
//==================================================================================

/// A capacity-less synchronous hand-off point between one producer and one
/// consumer.
///
/// While both ends live inside this value, `put` and `take` cannot fail. Share
/// it behind an `Arc` for standalone use, or [`split`](Self::split) it so that
/// each side owns exactly its end.
#[derive(Debug)]
pub struct RendezvousChannel<T> {
    producer: Producer<T>,
    consumer: Consumer<T>,
}

impl<T> RendezvousChannel<T> {
    pub fn new() -> Self {
        // A zero-capacity channel completes a send only when a receiver takes it.
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            producer: Producer { tx },
            consumer: Consumer { rx },
        }
    }

    /// Offers `item` and returns once the consumer has collected it.
    pub fn put(&self, item: T) {
        if self.producer.put(item).is_err() {
            unreachable!("rendezvous channel owns its consumer end");
        }
    }

    /// Waits for an item and collects it.
    pub fn take(&self) -> T {
        match self.consumer.take() {
            Ok(item) => item,
            Err(ChannelClosed) => unreachable!("rendezvous channel owns its producer end"),
        }
    }

    /// Separates the channel into its two owned ends.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        (self.producer, self.consumer)
    }
}

impl<T> Default for RendezvousChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// Spawns a producer that puts `make(0..count)` into the channel in order.
    fn spawn_putter<T, F>(
        channel: Arc<RendezvousChannel<T>>,
        count: usize,
        make: F,
    ) -> thread::JoinHandle<()>
    where
        T: Send + 'static,
        F: Fn(usize) -> T + Send + 'static,
    {
        thread::spawn(move || {
            for i in 0..count {
                channel.put(make(i));
            }
        })
    }

    #[test]
    fn test_ints_arrive_in_put_order() {
        let channel = Arc::new(RendezvousChannel::new());
        let putter = spawn_putter(Arc::clone(&channel), 10, |i| i as i32);

        for expected in 0..10 {
            assert_eq!(channel.take(), expected);
        }
        putter.join().unwrap();
    }

    #[test]
    fn test_strings_keep_their_contents() {
        let channel = Arc::new(RendezvousChannel::new());
        let putter = spawn_putter(Arc::clone(&channel), 10, |i| "a".repeat(i));

        for expected_len in 0..10 {
            let s = channel.take();
            assert_eq!(s.len(), expected_len);
            assert!(s.chars().all(|c| c == 'a'));
        }
        putter.join().unwrap();
    }

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_structs_are_moved_intact() {
        let channel = Arc::new(RendezvousChannel::new());
        let putter = spawn_putter(Arc::clone(&channel), 10, |i| Point {
            x: i as i32,
            y: i as i32 * 2,
        });

        for i in 0..10 {
            assert_eq!(channel.take(), Point { x: i, y: i * 2 });
        }
        putter.join().unwrap();
    }

    #[test]
    fn test_boxed_objects_are_moved_intact() {
        let channel = Arc::new(RendezvousChannel::new());
        let putter = spawn_putter(Arc::clone(&channel), 5, |_| Box::new("Full Name".to_string()));

        for _ in 0..5 {
            assert_eq!(channel.take().as_str(), "Full Name");
        }
        putter.join().unwrap();
    }

    #[test]
    fn test_put_does_not_return_before_take() {
        // 1. Arrange: a producer that records when its put has returned.
        let channel = Arc::new(RendezvousChannel::new());
        let returned = Arc::new(AtomicBool::new(false));
        let putter = {
            let channel = Arc::clone(&channel);
            let returned = Arc::clone(&returned);
            thread::spawn(move || {
                channel.put(7u8);
                returned.store(true, Ordering::SeqCst);
            })
        };

        // 2. Assert: with nobody taking, the put stays pending.
        thread::sleep(Duration::from_millis(50));
        assert!(!returned.load(Ordering::SeqCst));

        // 3. Act: collect the value and let the producer finish.
        assert_eq!(channel.take(), 7);
        putter.join().unwrap();
        assert!(returned.load(Ordering::SeqCst));
    }

    #[test]
    fn test_split_ends_report_dropped_peer() {
        let (producer, consumer) = RendezvousChannel::<u32>::new().split();
        drop(consumer);
        assert_eq!(producer.put(1), Err(ChannelClosed));

        let (producer, consumer) = RendezvousChannel::<u32>::new().split();
        drop(producer);
        assert_eq!(consumer.take(), Err(ChannelClosed));
    }

    #[test]
    fn test_blocked_put_wakes_when_consumer_drops() {
        let (producer, consumer) = RendezvousChannel::<u32>::new().split();
        let putter = thread::spawn(move || producer.put(42));

        thread::sleep(Duration::from_millis(20));
        drop(consumer);

        assert_eq!(putter.join().unwrap(), Err(ChannelClosed));
    }
}
