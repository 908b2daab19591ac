//! # tagscan engine
//!
//! The deduction engine: given a fingerprint database and a probe, it
//! requests the most disambiguating files one at a time and intersects
//! the answers until a single version tag remains.
//!
//! ## Run lifecycle
//!
//! ```text
//! blind ──200──> narrowing ──┬──> resolved       (one candidate left)
//!   │                        ├──> narrowed       (budget / files out)
//!   │                        └──> contradiction  (disjoint answer)
//!   └──> too-many-non-200 / unreachable / cancelled
//! ```
//!
//! While blind, files come from the database's cold-start order; once a
//! digest has matched, every next file is the one expected to eliminate
//! the most candidates, and files that cannot eliminate any are skipped
//! without a network round trip.
//!
//! One run owns all of its mutable state, so a single scanner can drive
//! any number of targets concurrently.

mod deduction;
mod outcome;
mod probe;
mod scanner;
mod tagset;

pub use deduction::NON200_LIMIT;
pub use outcome::{NarrowReason, Outcome, RunReport};
pub use probe::{Probe, ProbeError, ProbeReply};
pub use scanner::{VersionScanner, DEFAULT_REQUEST_DELAY};
