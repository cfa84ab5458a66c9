// In: src/stage/worker.rs

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use super::{StageState, StageStats, Transform};
use crate::channel::{Consumer, Producer};
use crate::envelope::Envelope;

//==================================================================================
// 1. Intermediate Stage
//==================================================================================

/// A worker bound to one transform: take, transform, forward.
pub struct Stage<T> {
    name: String,
    transform: Box<dyn Transform<T>>,
    input: Consumer<Envelope<T>>,
    output: Producer<Envelope<T>>,
}

impl<T: Send + 'static> Stage<T> {
    pub fn new(
        name: impl Into<String>,
        transform: Box<dyn Transform<T>>,
        input: Consumer<Envelope<T>>,
        output: Producer<Envelope<T>>,
    ) -> Self {
        Self {
            name: name.into(),
            transform,
            input,
            output,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the worker loop on the calling thread until the stage drains.
    pub fn run(mut self) -> StageStats {
        let mut stats = StageStats::new(&self.name);
        log::debug!("stage '{}' running", self.name);

        let mut state = StageState::Running;
        while state == StageState::Running {
            state = self.step(&mut stats);
        }

        log::debug!(
            "stage '{}' draining after {} items",
            self.name,
            stats.processed
        );
        stage_metric!(
            "event" = "stage_drained",
            "stage" = &self.name,
            "processed" = stats.processed,
            "busy_us" = stats.busy.as_micros()
        );
        stats
    }

    fn step(&mut self, stats: &mut StageStats) -> StageState {
        let envelope = match self.input.take() {
            Ok(envelope) => envelope,
            Err(_) => {
                log::warn!("stage '{}': upstream worker is gone", self.name);
                return StageState::Draining;
            }
        };

        match envelope {
            Envelope::Shutdown => {
                // The received marker is consumed here; downstream gets a fresh one.
                if self.output.put(Envelope::Shutdown).is_err() {
                    log::warn!(
                        "stage '{}': downstream worker is gone, shutdown not forwarded",
                        self.name
                    );
                }
                StageState::Draining
            }
            Envelope::Live {
                seq,
                mut payload,
                completion,
            } => {
                let started = Instant::now();
                self.apply(seq, &mut payload);
                stats.record(started.elapsed());

                log::trace!("stage '{}' forwarding item #{}", self.name, seq);
                if self
                    .output
                    .put(Envelope::live(seq, payload, completion))
                    .is_err()
                {
                    log::warn!(
                        "stage '{}': downstream worker is gone, item #{} abandoned",
                        self.name,
                        seq
                    );
                    return StageState::Draining;
                }
                StageState::Running
            }
        }
    }

    /// Invokes the transform, logging and re-raising any panic so the worker's
    /// join handle reports the failure.
    fn apply(&mut self, seq: u64, payload: &mut T) {
        let transform = &mut self.transform;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| transform.process(payload)));
        if let Err(cause) = outcome {
            log::error!(
                "stage '{}': transform panicked on item #{}; stopping stage",
                self.name,
                seq
            );
            panic::resume_unwind(cause);
        }
    }
}

//==================================================================================
// 2. Terminal Stage
//==================================================================================

/// The last worker in the chain. Delivers payloads to their completion handles.
pub struct TerminalStage<T> {
    name: String,
    input: Consumer<Envelope<T>>,
}

impl<T: Send + 'static> TerminalStage<T> {
    pub fn new(name: impl Into<String>, input: Consumer<Envelope<T>>) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(self) -> StageStats {
        let mut stats = StageStats::new(&self.name);
        log::debug!("terminal stage '{}' running", self.name);

        let mut state = StageState::Running;
        while state == StageState::Running {
            state = match self.input.take() {
                Ok(Envelope::Live {
                    seq,
                    payload,
                    completion,
                }) => {
                    log::trace!("terminal stage '{}' completing item #{}", self.name, seq);
                    completion.complete(payload);
                    stats.record(std::time::Duration::ZERO);
                    StageState::Running
                }
                // End of the chain: nothing to forward.
                Ok(Envelope::Shutdown) => StageState::Draining,
                Err(_) => {
                    log::warn!("terminal stage '{}': upstream worker is gone", self.name);
                    StageState::Draining
                }
            };
        }

        log::debug!(
            "terminal stage '{}' draining after {} items",
            self.name,
            stats.processed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RendezvousChannel;
    use crate::completion::completion_pair;
    use std::thread;

    #[test]
    fn test_stage_transforms_and_forwards_shutdown() {
        // 1. Arrange: feed -> stage -> sink, with the stage on its own thread.
        let (feed, stage_in) = RendezvousChannel::<Envelope<i32>>::new().split();
        let (stage_out, sink) = RendezvousChannel::new().split();
        let stage = Stage::new("double", Box::new(|v: &mut i32| *v *= 2), stage_in, stage_out);
        let worker = thread::spawn(move || stage.run());

        // 2. Act: one live item, then the poison envelope.
        let (completer, _handle) = completion_pair();
        feed.put(Envelope::live(0, 21, completer)).unwrap();
        let forwarded = sink.take().unwrap();
        feed.put(Envelope::Shutdown).unwrap();
        let poison = sink.take().unwrap();

        // 3. Assert
        match forwarded {
            Envelope::Live { seq, payload, .. } => {
                assert_eq!(seq, 0);
                assert_eq!(payload, 42);
            }
            Envelope::Shutdown => panic!("expected a live envelope"),
        }
        assert!(poison.is_shutdown());

        let stats = worker.join().unwrap();
        assert_eq!(stats.name, "double");
        assert_eq!(stats.processed, 1);
    }

    #[test]
    fn test_terminal_stage_completes_handles() {
        let (feed, terminal_in) = RendezvousChannel::new().split();
        let terminal = TerminalStage::new("terminal", terminal_in);
        let worker = thread::spawn(move || terminal.run());

        let (completer, handle) = completion_pair();
        feed.put(Envelope::live(0, "payload".to_string(), completer))
            .unwrap();
        feed.put(Envelope::Shutdown).unwrap();

        assert_eq!(handle.get().unwrap(), "payload");
        assert_eq!(worker.join().unwrap().processed, 1);
    }

    #[test]
    fn test_stage_drains_when_upstream_drops() {
        let (feed, stage_in) = RendezvousChannel::<Envelope<u8>>::new().split();
        let (stage_out, _sink) = RendezvousChannel::new().split();
        let stage = Stage::new("orphan", Box::new(|_: &mut u8| {}), stage_in, stage_out);
        let worker = thread::spawn(move || stage.run());

        drop(feed);
        assert_eq!(worker.join().unwrap().processed, 0);
    }
}
