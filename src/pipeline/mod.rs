// In: src/pipeline/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Pipeline Orchestrator
// ====================================================================================
//
// A pipeline of N transforms owns N+1 rendezvous channels and N+1 workers:
//
//   submit -> [c0] -> Stage 0 -> [c1] -> Stage 1 -> ... -> [cN] -> TerminalStage
//                                                                      |
//                                                    CompletionHandle <-'
//
// Each channel is split at construction: the orchestrator keeps the producer of
// c0, stage i owns the consumer of c(i) and the producer of c(i+1), and the
// terminal stage owns the consumer of cN. Every channel therefore has exactly one
// writer and one reader for its whole life, which is what makes the pipeline
// end-to-end FIFO.
//
// Shutdown is a message, not a cancellation: `close` sends one poison envelope
// down c0, and each stage forwards a fresh one before stopping. If a worker dies
// instead, its channel ends drop and both neighbours stop on disconnection.
//
// ====================================================================================

use std::thread::{self, JoinHandle};

use crate::channel::{Producer, RendezvousChannel};
use crate::completion::{completion_pair, CompletionHandle};
use crate::config::PipelineConfig;
use crate::envelope::Envelope;
use crate::error::{PipelineError, Result};
use crate::stage::{Stage, StageStats, TerminalStage, Transform};

mod builder;

pub use self::builder::PipelineBuilder;

/// Name of the worker that delivers results.
pub const TERMINAL_STAGE_NAME: &str = "terminal";

struct Worker {
    stage: String,
    join: JoinHandle<StageStats>,
}

/// A running chain of stages, one thread per stage.
pub struct Pipeline<T: Send + 'static> {
    name: String,
    stage_names: Vec<String>,
    entry: Producer<Envelope<T>>,
    /// In chain order; the terminal worker is last. Empty once joined.
    workers: Vec<Worker>,
    submitted: u64,
    closed: bool,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Builds and starts a pipeline from transforms in chain order.
    pub fn create(transforms: Vec<Box<dyn Transform<T>>>) -> Result<Self> {
        transforms
            .into_iter()
            .fold(PipelineBuilder::new(), |builder, transform| {
                builder.boxed(transform)
            })
            .build()
    }

    pub fn builder() -> PipelineBuilder<T> {
        PipelineBuilder::new()
    }

    /// Wires `names.len()` stages plus the terminal stage and starts them.
    pub(crate) fn launch(
        config: PipelineConfig,
        names: Vec<String>,
        transforms: Vec<Box<dyn Transform<T>>>,
    ) -> Result<Self> {
        let size = transforms.len();
        if size == 0 {
            return Err(PipelineError::EmptyPipeline);
        }

        // 1. Allocate size + 1 channels and hand out their ends.
        let (producers, mut consumers): (Vec<_>, Vec<_>) = (0..=size)
            .map(|_| RendezvousChannel::<Envelope<T>>::new().split())
            .unzip();
        let mut producers = producers.into_iter();
        let entry = match producers.next() {
            Some(entry) => entry,
            None => unreachable!("at least two channels were allocated"),
        };
        let terminal_input = match consumers.pop() {
            Some(input) => input,
            None => unreachable!("at least two channels were allocated"),
        };

        // 2. Bind stage i between c(i) and c(i+1).
        let stages: Vec<Stage<T>> = names
            .iter()
            .zip(transforms)
            .zip(consumers.into_iter().zip(producers))
            .map(|((name, transform), (input, output))| {
                Stage::new(name.clone(), transform, input, output)
            })
            .collect();
        let terminal = TerminalStage::new(TERMINAL_STAGE_NAME, terminal_input);

        // 3. Start workers from the terminal backwards. If a spawn fails, the
        //    rejected stage is dropped with its channel ends, so every worker
        //    already running downstream sees a disconnect and drains.
        let mut started = Vec::with_capacity(size + 1);
        started.push(spawn_worker(&config, TERMINAL_STAGE_NAME, move || {
            terminal.run()
        })?);
        for stage in stages.into_iter().rev() {
            let stage_name = stage.name().to_string();
            match spawn_worker(&config, &stage_name, move || stage.run()) {
                Ok(worker) => started.push(worker),
                Err(err) => {
                    log::error!("pipeline '{}': {}", config.name, err);
                    drop(entry);
                    for worker in started {
                        let _ = worker.join.join();
                    }
                    return Err(err);
                }
            }
        }
        started.reverse();

        log::debug!(
            "pipeline '{}' started with {} stages: {:?}",
            config.name,
            size,
            names
        );

        Ok(Self {
            name: config.name,
            stage_names: names,
            entry,
            workers: started,
            submitted: 0,
            closed: false,
        })
    }

    //==================================================================================
    // Public API
    //==================================================================================

    /// Sends `item` into the first stage and returns its completion handle.
    ///
    /// Blocks only until the first stage accepts the item, which happens once
    /// it has forwarded the previous one.
    pub fn submit(&mut self, item: T) -> Result<CompletionHandle<T>> {
        if self.closed {
            return Err(PipelineError::Closed);
        }

        let (completer, handle) = completion_pair();
        let seq = self.submitted;
        self.entry
            .put(Envelope::live(seq, item, completer))
            .map_err(|_| self.first_stage_gone())?;

        log::trace!("pipeline '{}' accepted item #{}", self.name, seq);
        self.submitted += 1;
        Ok(handle)
    }

    /// Sends the shutdown envelope. Items submitted earlier still complete.
    /// Calling it again has no effect.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        log::debug!(
            "pipeline '{}' closing after {} items",
            self.name,
            self.submitted
        );
        self.entry
            .put(Envelope::Shutdown)
            .map_err(|_| self.first_stage_gone())
    }

    /// Closes the pipeline, waits for every worker to drain, and returns their
    /// statistics in chain order (terminal stage last).
    pub fn shutdown(mut self) -> Result<Vec<StageStats>> {
        let closed = self.close();
        let stats = self.join_workers()?;
        closed?;
        Ok(stats)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of transform stages, excluding the terminal stage.
    pub fn len(&self) -> usize {
        self.stage_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stage_names.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stage_names.iter().map(String::as_str).collect()
    }

    /// Number of items accepted so far.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    //==================================================================================
    // Internals
    //==================================================================================

    fn first_stage_gone(&self) -> PipelineError {
        PipelineError::Disconnected {
            stage: self.stage_names.first().cloned().unwrap_or_default(),
        }
    }

    /// Joins every worker, even after a failure, and reports the first one that
    /// panicked.
    fn join_workers(&mut self) -> Result<Vec<StageStats>> {
        let mut stats = Vec::with_capacity(self.workers.len());
        let mut failed = None;

        for worker in self.workers.drain(..) {
            match worker.join.join() {
                Ok(stage_stats) => stats.push(stage_stats),
                Err(_) => {
                    log::error!(
                        "pipeline '{}': stage '{}' terminated abnormally",
                        self.name,
                        worker.stage
                    );
                    failed.get_or_insert(worker.stage);
                }
            }
        }

        match failed {
            Some(stage) => Err(PipelineError::StageFailed { stage }),
            None => Ok(stats),
        }
    }
}

impl<T: Send + 'static> Drop for Pipeline<T> {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        if !self.closed {
            log::warn!(
                "pipeline '{}' dropped while running; closing it",
                self.name
            );
            let _ = self.close();
        }
        if let Err(err) = self.join_workers() {
            log::error!("pipeline '{}' teardown: {}", self.name, err);
        }
    }
}

fn spawn_worker<F>(config: &PipelineConfig, stage: &str, body: F) -> Result<Worker>
where
    F: FnOnce() -> StageStats + Send + 'static,
{
    let mut builder = thread::Builder::new().name(format!("{}-{}", config.name, stage));
    if let Some(size) = config.worker_stack_size {
        builder = builder.stack_size(size);
    }

    let join = builder
        .spawn(body)
        .map_err(|source| PipelineError::WorkerSpawn {
            stage: stage.to_string(),
            source,
        })?;
    Ok(Worker {
        stage: stage.to_string(),
        join,
    })
}
