//! # tagscan prober
//!
//! The default HTTP probe: fetches one public asset per call, digests
//! the normalized body and answers with the releases that ship exactly
//! that body. Owns every network resource; the deduction engine only
//! ever sees tags and status codes.

mod error;
mod http;

pub use error::{ProberError, Result};
pub use http::{body_digest, HttpFingerprintProbe};
