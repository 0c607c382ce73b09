//! Background reads for the children a LOD traversal asked for.

use geotile_jobs::{AsyncReturn, Context, Job, JobRunner};
use geotile_scene::visitors::TileRequest;
use geotile_scene::ChildSlot;

use crate::reader_writer::{Options, ReadObject};
use crate::TileError;

struct ReadTileJob {
    filename: String,
    slot: ChildSlot,
    options: Options,
}

struct ReadTileOutcome {
    filename: String,
    slot: ChildSlot,
    result: Result<Option<ReadObject>, TileError>,
}

impl Job for ReadTileJob {
    type Outcome = ReadTileOutcome;

    fn name(&self) -> String {
        format!("read {}", self.filename)
    }

    fn perform(self, _: Context) -> AsyncReturn<Self::Outcome> {
        Box::pin(async move {
            let result = self.options.read(&self.filename);
            ReadTileOutcome {
                filename: self.filename,
                slot: self.slot,
                result,
            }
        })
    }
}

/// Runs tile requests as jobs and installs what they read into the
/// requesting placeholders. Requests for a slot that is settled or
/// already being read are dropped, and so are results for a slot that was
/// filled in the meantime. Reads that yield no children, or fail, mark the
/// slot absent so the placeholder keeps its coarse tile without being
/// requested again.
pub struct DatabasePager {
    runner: JobRunner,
    options: Options,
    in_flight: Vec<ChildSlot>,
}

impl DatabasePager {
    pub fn new(options: Options) -> Self {
        DatabasePager {
            runner: JobRunner::new(),
            options,
            in_flight: Vec::new(),
        }
    }

    /// Starts a read for each new request. Returns how many were started.
    pub fn request(&mut self, requests: Vec<TileRequest>) -> usize {
        let mut started = 0;
        for request in requests {
            if request.slot.is_settled()
                || self.in_flight.iter().any(|s| s.same_slot(&request.slot))
            {
                continue;
            }
            self.in_flight.push(request.slot.clone());
            self.runner.spawn(ReadTileJob {
                filename: request.filename,
                slot: request.slot,
                options: self.options.clone(),
            });
            started += 1;
        }
        started
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Installs whatever finished since the last call without blocking.
    /// Returns the number of slots filled.
    pub fn update(&mut self) -> usize {
        self.runner.poll();
        self.install_finished()
    }

    /// Blocks until every started read has finished and installs the
    /// results. Returns the number of slots filled.
    pub fn wait(&mut self) -> usize {
        let mut installed = 0;
        while self.runner.wait_for_next() {
            installed += self.install_finished();
        }
        installed + self.update()
    }

    fn install_finished(&mut self) -> usize {
        let mut installed = 0;
        while let Some(outcome) = self.runner.take_next::<ReadTileJob>() {
            self.in_flight.retain(|s| !s.same_slot(&outcome.slot));
            match outcome.result {
                Ok(Some(ReadObject::Node(node))) => {
                    if outcome.slot.install(node) {
                        installed += 1;
                    } else {
                        bevy::log::debug!("dropping stale read of {}", outcome.filename);
                    }
                }
                Ok(Some(ReadObject::Image(_))) => {
                    bevy::log::warn!("{} read as an image, expected tiles", outcome.filename);
                    outcome.slot.mark_absent();
                }
                Ok(None) => {
                    bevy::log::debug!("{} has no children", outcome.filename);
                    outcome.slot.mark_absent();
                }
                Err(e) => {
                    bevy::log::warn!("reading {} failed: {}", outcome.filename, e);
                    outcome.slot.mark_absent();
                }
            }
        }
        installed
    }
}
