use tagscan_hashdb::versions::sort_tags_desc;
use tagscan_hashdb::FingerprintDb;
use tokio_util::sync::CancellationToken;

use crate::outcome::{NarrowReason, Outcome};
use crate::probe::{Probe, ProbeError};
use crate::tagset::intersect;

/// Probes answering without a usable body end the run once this many
/// have accumulated; past that point there is little left to learn.
pub const NON200_LIMIT: usize = 20;

/// Mutable state of one deduction run. Created per `analyze` call and
/// never shared; everything long-lived lives in the database indices.
pub(crate) struct Deduction<'db> {
    db: &'db FingerprintDb,
    max_depth: usize,

    candidates: Vec<String>,
    requested: Vec<String>,
    non200: usize,
    iterations: usize,
}

pub(crate) enum StepVerdict {
    /// Probe this file next.
    Next(String),
    /// The run is over.
    Done(Outcome),
}

impl<'db> Deduction<'db> {
    pub(crate) fn new(db: &'db FingerprintDb, max_depth: usize) -> Self {
        Self {
            db,
            max_depth,
            candidates: Vec::new(),
            requested: Vec::new(),
            non200: 0,
            iterations: 0,
        }
    }

    pub(crate) fn iterations(&self) -> usize {
        self.iterations
    }

    pub(crate) fn requested(&self) -> &[String] {
        &self.requested
    }

    /// One full deduction step: admission gate, the probe itself (raced
    /// against cancellation), then folding the answer into the
    /// candidate set and choosing the next file.
    pub(crate) async fn step(
        &mut self,
        cancel: &CancellationToken,
        probe: &dyn Probe,
        target: &str,
        file: String,
    ) -> StepVerdict {
        if cancel.is_cancelled() {
            return self.done_cancelled();
        }

        if self.non200 > NON200_LIMIT {
            return StepVerdict::Done(Outcome::TooManyNon200 {
                candidates: self.sorted_candidates(),
            });
        }

        if self.max_depth > 0 && self.iterations + 1 > self.max_depth {
            return StepVerdict::Done(Outcome::Narrowed {
                candidates: self.sorted_candidates(),
                reason: NarrowReason::DepthReached,
            });
        }

        // the file is charged before the fetch runs; even a network
        // error consumes it, so a flapping target is never re-asked
        self.iterations += 1;
        self.requested.push(file.clone());

        let result = tokio::select! {
            _ = cancel.cancelled() => return self.done_cancelled(),
            result = probe.probe(target, &file) => result,
        };

        match result {
            Ok(reply) if reply.status == 200 && !reply.tags.is_empty() => {
                self.absorb_tags(cancel, reply.tags)
            }
            Ok(reply) if reply.status == 200 => {
                // served, but the body digest is not in the database:
                // no narrowing, yet not a miss either
                log::debug!("{file}: digest unknown to the database");
                self.select_next(cancel)
            }
            Ok(reply) => {
                log::debug!("({}) {file}", reply.status);
                self.non200 += 1;
                self.select_next(cancel)
            }
            Err(ProbeError::Unreachable(detail)) => {
                StepVerdict::Done(Outcome::TargetUnreachable(detail))
            }
            Err(err) => {
                log::warn!("probe {file}: {err}");
                self.select_next(cancel)
            }
        }
    }

    fn absorb_tags(&mut self, cancel: &CancellationToken, tags: Vec<String>) -> StepVerdict {
        if self.candidates.is_empty() {
            self.candidates = tags;
        } else {
            let previous = std::mem::take(&mut self.candidates);
            self.candidates = intersect(&previous, &tags);

            if self.candidates.is_empty() {
                return StepVerdict::Done(Outcome::Contradiction {
                    previous: sort_tags_desc(previous),
                    incoming: sort_tags_desc(tags),
                });
            }
        }

        log::info!(
            "currently ({}) possible versions: {:?}",
            self.candidates.len(),
            self.candidates
        );

        if self.candidates.len() == 1 {
            return StepVerdict::Done(Outcome::Resolved(self.candidates[0].clone()));
        }

        self.select_next(cancel)
    }

    fn select_next(&mut self, cancel: &CancellationToken) -> StepVerdict {
        if self.candidates.is_empty() {
            // still blind: continue down the precomputed cold-start order
            return match self.db.file_at(self.iterations) {
                Some(file) => StepVerdict::Next(file.to_string()),
                None => StepVerdict::Done(Outcome::Narrowed {
                    candidates: Vec::new(),
                    reason: NarrowReason::NoMoreFiles,
                }),
            };
        }

        match self
            .db
            .next_narrowing_file(cancel, &self.candidates, &mut self.requested)
        {
            Some(file) => StepVerdict::Next(file),
            None if cancel.is_cancelled() => self.done_cancelled(),
            None => StepVerdict::Done(Outcome::Narrowed {
                candidates: self.sorted_candidates(),
                reason: NarrowReason::NoMoreFiles,
            }),
        }
    }

    fn done_cancelled(&self) -> StepVerdict {
        StepVerdict::Done(Outcome::Cancelled {
            candidates: self.sorted_candidates(),
        })
    }

    fn sorted_candidates(&self) -> Vec<String> {
        sort_tags_desc(self.candidates.clone())
    }
}
