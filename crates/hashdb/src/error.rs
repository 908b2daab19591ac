use thiserror::Error;

pub type Result<T> = std::result::Result<T, HashDbError>;

#[derive(Error, Debug)]
pub enum HashDbError {
    #[error("invalid fingerprint database: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("zero fingerprints available after filtering")]
    EmptyDatabase,

    #[error("fingerprint database corrupt: {0}")]
    Corrupt(String),

    #[error("no fingerprints for file: {0}")]
    UnknownFile(String),

    #[error("no digest {digest} recorded for file {file}")]
    UnknownDigest { file: String, digest: String },

    #[error("zero tags recorded for digest {digest} of file {file}")]
    EmptyTagList { file: String, digest: String },

    #[error("none of the candidate tags carry file {0}")]
    NoCoverage(String),
}
