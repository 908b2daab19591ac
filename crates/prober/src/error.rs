use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProberError>;

#[derive(Error, Debug)]
pub enum ProberError {
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}
