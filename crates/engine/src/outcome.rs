/// Why a run ended with more than one candidate left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrowReason {
    /// The configured step budget ran out.
    DepthReached,
    /// No remaining file can eliminate a candidate.
    NoMoreFiles,
}

/// Terminal result of one deduction run.
///
/// Candidate lists are sorted newest-first; partial sets are part of
/// the contract, downstream consumers match vulnerabilities against
/// "one of these three versions" just fine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exactly one tag explains every observed digest.
    Resolved(String),

    /// More than one candidate (or none at all) remains.
    Narrowed {
        candidates: Vec<String>,
        reason: NarrowReason,
    },

    /// A 200 answered with tags disjoint from the candidate set. The
    /// database and the target disagree; no further probe can recover.
    Contradiction {
        previous: Vec<String>,
        incoming: Vec<String>,
    },

    /// Host-level network failure.
    TargetUnreachable(String),

    /// Too many probes came back without a usable body.
    TooManyNon200 { candidates: Vec<String> },

    /// The caller's cancellation fired mid-run.
    Cancelled { candidates: Vec<String> },
}

impl Outcome {
    /// The single resolved tag, when there is one.
    pub fn resolved_tag(&self) -> Option<&str> {
        match self {
            Outcome::Resolved(tag) => Some(tag),
            _ => None,
        }
    }

    /// Whatever candidate set the run ended with.
    pub fn candidates(&self) -> &[String] {
        match self {
            Outcome::Resolved(tag) => std::slice::from_ref(tag),
            Outcome::Narrowed { candidates, .. }
            | Outcome::TooManyNon200 { candidates }
            | Outcome::Cancelled { candidates } => candidates,
            Outcome::Contradiction { .. } | Outcome::TargetUnreachable(_) => &[],
        }
    }
}

/// What one `analyze` call hands back: the outcome plus the request
/// trail.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Deduction steps taken, including probes that failed.
    pub iterations: usize,
    /// Every file charged to the run, in request order. Includes files
    /// the skip-loop consumed without a network round trip.
    pub requested: Vec<String>,
}
