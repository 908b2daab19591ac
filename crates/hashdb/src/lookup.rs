use std::collections::BTreeMap;

use crate::database::RawDb;
use crate::error::{HashDbError, Result};

/// Inverse view of the raw database: `file → tag → digest`.
///
/// Answers "what would this file hash to in release X" without walking
/// digest lists, which the narrowing loop does on every skip decision.
#[derive(Debug, Default)]
pub struct DigestLookup {
    by_file: BTreeMap<String, BTreeMap<String, String>>,
}

impl DigestLookup {
    /// Build the inverse view. Fails if any `(file, tag)` pair maps to
    /// two digests: a release cannot ship two bodies for one path.
    pub fn build(db: &RawDb) -> Result<Self> {
        let mut by_file = BTreeMap::new();

        for (file, digests) in db {
            let mut per_tag: BTreeMap<String, String> = BTreeMap::new();

            for (digest, tags) in digests {
                for tag in tags {
                    if let Some(prior) = per_tag.insert(tag.clone(), digest.clone()) {
                        return Err(HashDbError::Corrupt(format!(
                            "file {file}: tag {tag} bound to digests {prior} and {digest}"
                        )));
                    }
                }
            }

            by_file.insert(file.clone(), per_tag);
        }

        Ok(Self { by_file })
    }

    /// Digest of `file` as shipped in release `tag`, absent when the
    /// release does not carry the file.
    pub fn digest_for(&self, file: &str, tag: &str) -> Option<&str> {
        self.by_file.get(file)?.get(tag).map(String::as_str)
    }

    /// Whether all of `candidates` would answer with one digest for
    /// `file`, i.e. fetching it cannot eliminate anything.
    ///
    /// A single candidate is already terminal, so the answer there is
    /// always false. Candidates that do not ship the file are ignored;
    /// if none of them ships it the result is `NoCoverage` and the
    /// caller decides whether the fetch is still worth it.
    pub fn tags_share_digest(&self, file: &str, candidates: &[String]) -> Result<bool> {
        if candidates.len() == 1 {
            return Ok(false);
        }

        let per_tag = self
            .by_file
            .get(file)
            .ok_or_else(|| HashDbError::UnknownFile(file.to_string()))?;

        let mut seen: Option<&str> = None;
        let mut covered = 0usize;

        for tag in candidates {
            let Some(digest) = per_tag.get(tag) else {
                // file does not exist in this release
                continue;
            };

            covered += 1;
            match seen {
                None => seen = Some(digest),
                Some(prior) if prior != digest => return Ok(false),
                Some(_) => {}
            }
        }

        if covered == 0 {
            return Err(HashDbError::NoCoverage(file.to_string()));
        }

        Ok(true)
    }
}
