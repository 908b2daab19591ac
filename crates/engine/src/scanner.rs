use std::sync::Arc;
use std::time::Duration;

use tagscan_hashdb::{FingerprintDb, HashDbError};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::deduction::{Deduction, StepVerdict};
use crate::outcome::{Outcome, RunReport};
use crate::probe::Probe;

/// Pause between two probes against one target.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Runtime-tunable knobs, snapshotted once per run.
struct Knobs {
    request_delay: Duration,
    max_depth: usize,
    probe: Arc<dyn Probe>,
}

/// Version scanner: immutable fingerprint indices plus tunable knobs.
///
/// The indices are shared freely across concurrent runs. The knobs sit
/// behind one `RwLock`; a run holds the read guard from first to last
/// probe, so setters wait for in-flight scans instead of changing them
/// midway.
pub struct VersionScanner {
    db: Arc<FingerprintDb>,
    knobs: RwLock<Knobs>,
}

impl VersionScanner {
    /// Build a scanner over a prepared database.
    ///
    /// Empty databases are rejected here, not mid-run, so every run is
    /// guaranteed a bootstrap file. `max_depth` starts unlimited.
    pub fn new(db: Arc<FingerprintDb>, probe: Arc<dyn Probe>) -> Result<Self, HashDbError> {
        if db.is_empty() {
            return Err(HashDbError::EmptyDatabase);
        }

        Ok(Self {
            db,
            knobs: RwLock::new(Knobs {
                request_delay: DEFAULT_REQUEST_DELAY,
                max_depth: 0,
                probe,
            }),
        })
    }

    pub async fn set_request_delay(&self, delay: Duration) {
        self.knobs.write().await.request_delay = delay;
    }

    /// Step budget per run; 0 means unlimited.
    pub async fn set_max_depth(&self, depth: usize) {
        self.knobs.write().await.max_depth = depth;
    }

    pub async fn set_probe(&self, probe: Arc<dyn Probe>) {
        self.knobs.write().await.probe = probe;
    }

    /// Run one deduction against `target` until a single version
    /// remains, an abort condition triggers, or `cancel` fires.
    pub async fn analyze(&self, cancel: &CancellationToken, target: &str) -> RunReport {
        let knobs = self.knobs.read().await;
        let target = target.trim_end_matches('/');

        log::info!("analyzing {target}");

        let mut run = Deduction::new(&self.db, knobs.max_depth);
        let mut file = self
            .db
            .file_at(0)
            .expect("constructor rejects empty databases")
            .to_string();

        loop {
            match run
                .step(cancel, knobs.probe.as_ref(), target, file)
                .await
            {
                StepVerdict::Done(outcome) => {
                    log_outcome(target, &outcome);
                    return RunReport {
                        outcome,
                        iterations: run.iterations(),
                        requested: run.requested().to_vec(),
                    };
                }
                StepVerdict::Next(next) => file = next,
            }

            if !knobs.request_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(knobs.request_delay) => {}
                }
            }
        }
    }
}

fn log_outcome(target: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Resolved(tag) => log::info!("{target}: resolved version {tag}"),
        Outcome::Narrowed { candidates, reason } => log::info!(
            "{target}: narrowed to {} candidates ({reason:?}): {candidates:?}",
            candidates.len()
        ),
        Outcome::Contradiction { previous, incoming } => log::error!(
            "{target}: no intersection between tags {incoming:?} and previous possible versions {previous:?}"
        ),
        Outcome::TargetUnreachable(detail) => log::error!("{target}: unreachable: {detail}"),
        Outcome::TooManyNon200 { candidates } => log::warn!(
            "{target}: too many non-200 responses, stopping at {candidates:?}"
        ),
        Outcome::Cancelled { candidates } => {
            log::warn!("{target}: cancelled at {candidates:?}")
        }
    }
}
