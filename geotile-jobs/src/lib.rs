#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::indexing_slicing,
    clippy::expect_used
)]
//! Background jobs on the bevy async compute pool.
//!
//! A [`JobRunner`] spawns [`Job`]s, tracks their progress and hands back
//! typed outcomes once they finish.
use std::{any, future, pin};

use bevy::tasks::{AsyncComputeTaskPool, TaskPool};

#[cfg(not(target_arch = "wasm32"))]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + Send + 'static>>;
#[cfg(target_arch = "wasm32")]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + 'static>>;

pub trait Job: any::Any + Sized + Send + Sync + 'static {
    type Outcome: any::Any + Send + Sync;

    fn name(&self) -> String;

    fn perform(self, context: Context) -> AsyncReturn<Self::Outcome>;
}

pub type Progress = u8;
pub type ProgressSender = async_channel::Sender<Progress>;

pub struct Context {
    pub progress_tx: ProgressSender,
}

impl Context {
    pub fn send_progress(&self, progress: Progress) -> async_channel::Send<'_, Progress> {
        self.progress_tx.send(progress)
    }
}

pub struct JobOutcomePayload {
    pub job_id: u64,
    pub job_outcome_type_id: any::TypeId,
    pub job_outcome: Box<dyn any::Any + Send + Sync>,
}

pub struct InProgressJob {
    pub id: u64,
    pub name: String,
    pub progress: Progress,
    pub progress_recv: async_channel::Receiver<Progress>,
}

pub struct JobRunner {
    next_id: u64,
    in_progress: Vec<InProgressJob>,
    finished: Vec<JobOutcomePayload>,
    outcome_tx: async_channel::Sender<JobOutcomePayload>,
    outcome_recv: async_channel::Receiver<JobOutcomePayload>,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner {
    /// Creates a runner, initializing the async compute pool if nobody has.
    pub fn new() -> Self {
        AsyncComputeTaskPool::init(TaskPool::default);
        let (outcome_tx, outcome_recv) = async_channel::unbounded::<JobOutcomePayload>();
        JobRunner {
            next_id: 0,
            in_progress: Vec::new(),
            finished: Vec::new(),
            outcome_tx,
            outcome_recv,
        }
    }

    pub fn spawn<J: Job>(&mut self, job: J) -> u64 {
        let (progress_tx, progress_recv) = async_channel::unbounded::<Progress>();
        let outcome_tx = self.outcome_tx.clone();

        let job_id = self.next_id;
        self.next_id += 1;
        let job_name = job.name();
        self.in_progress.push(InProgressJob {
            id: job_id,
            name: job_name.clone(),
            progress: 0,
            progress_recv,
        });

        AsyncComputeTaskPool::get()
            .spawn(async move {
                let instant = instant::Instant::now();
                bevy::log::debug!("Starting job '{}'", job_name);
                let outcome = job.perform(Context { progress_tx }).await;
                bevy::log::debug!("Completed job '{}' in {:?}", job_name, instant.elapsed());
                if let Err(e) = outcome_tx
                    .send(JobOutcomePayload {
                        job_id,
                        job_outcome_type_id: any::TypeId::of::<J>(),
                        job_outcome: Box::new(outcome),
                    })
                    .await
                {
                    bevy::log::error!(
                        "Failed to send result from job {} back to the runner: {:?}",
                        job_name,
                        e
                    );
                }
            })
            .detach();

        job_id
    }

    /// Collects progress updates and finished outcomes without blocking.
    /// Returns the number of jobs that finished since the last call.
    pub fn poll(&mut self) -> usize {
        for job in self.in_progress.iter_mut() {
            while let Ok(progress) = job.progress_recv.try_recv() {
                job.progress = progress;
            }
        }
        let mut finished = 0;
        while let Ok(outcome) = self.outcome_recv.try_recv() {
            self.finish(outcome);
            finished += 1;
        }
        finished
    }

    /// Blocks until one in-progress job finishes. Returns false right away
    /// when nothing is running.
    pub fn wait_for_next(&mut self) -> bool {
        if self.in_progress.is_empty() {
            return false;
        }
        match self.outcome_recv.recv_blocking() {
            Ok(outcome) => {
                self.finish(outcome);
                true
            }
            Err(e) => {
                bevy::log::error!("job outcome channel closed: {:?}", e);
                false
            }
        }
    }

    fn finish(&mut self, outcome: JobOutcomePayload) {
        self.in_progress.retain(|job| job.id != outcome.job_id);
        self.finished.push(outcome);
    }

    pub fn in_progress(&self) -> &[InProgressJob] {
        &self.in_progress
    }

    pub fn is_idle(&self) -> bool {
        self.in_progress.is_empty() && self.finished.is_empty()
    }

    #[inline]
    pub fn take_next<J: Job>(&mut self) -> Option<J::Outcome> {
        let index = self
            .finished
            .iter()
            .position(|outcome_payload| {
                any::TypeId::of::<J>() == outcome_payload.job_outcome_type_id
                    && outcome_payload.job_outcome.is::<J::Outcome>()
            })?;
        let outcome_payload = self.finished.remove(index);
        let outcome = outcome_payload.job_outcome.downcast::<J::Outcome>();
        if outcome.is_err() {
            bevy::log::error!("encountered unexpected job result type");
        }
        outcome.map(|n| *n).ok()
    }
}
