use async_trait::async_trait;
use thiserror::Error;

/// Answer to one probe: the tags matching the fetched body's digest,
/// and the HTTP status. A 200 whose digest is unknown to the database
/// comes back with an empty tag list.
#[derive(Debug, Clone, Default)]
pub struct ProbeReply {
    pub tags: Vec<String>,
    pub status: u16,
}

impl ProbeReply {
    /// A response without a usable body.
    pub fn miss(status: u16) -> Self {
        Self {
            tags: Vec::new(),
            status,
        }
    }

    /// A 200 whose digest matched the given tags.
    pub fn hit(tags: Vec<String>) -> Self {
        Self { tags, status: 200 }
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    /// Host-level failure. Nothing further can be learned from this
    /// target; the run aborts.
    #[error("target unreachable: {0}")]
    Unreachable(String),

    /// Anything else. Costs the probe, not the run.
    #[error("{0}")]
    Other(String),
}

/// One external fetch: request `file` below `target` and translate the
/// body into database tags. Implementations own all network resources;
/// the engine never opens a socket itself.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &str, file: &str) -> Result<ProbeReply, ProbeError>;
}
