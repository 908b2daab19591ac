use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;

use crate::error::{HashDbError, Result};
use crate::filter::FilterOptions;
use crate::lookup::DigestLookup;
use crate::order::InitialOrder;
use crate::uniqueness::UniquenessIndex;

/// Raw database shape: `file path → digest → tags`. `BTreeMap` so every
/// iteration that can decide the next request is key-ordered.
pub(crate) type RawDb = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Parsed fingerprint database plus every derived index.
///
/// Immutable once constructed; one instance can serve any number of
/// concurrent deduction runs without synchronisation.
pub struct FingerprintDb {
    files: RawDb,
    lookup: DigestLookup,
    uniqueness: UniquenessIndex,
    order: InitialOrder,
}

impl FingerprintDb {
    /// Parse a `file → digest → [tag]` JSON document and build all
    /// indices.
    ///
    /// Fails on malformed JSON, on an empty database after filtering,
    /// and on corruption: a tag bound to two digests for one file, a
    /// file with no digests, or a digest with no tags. No partial state
    /// survives a failure.
    pub fn from_json(raw: &[u8], filters: &FilterOptions) -> Result<Self> {
        let mut files: RawDb = serde_json::from_slice(raw)?;

        files.retain(|path, _| filters.keeps(path));

        if files.is_empty() {
            return Err(HashDbError::EmptyDatabase);
        }

        for (file, digests) in &files {
            if digests.is_empty() {
                return Err(HashDbError::Corrupt(format!("file {file}: no digests")));
            }
            for (digest, tags) in digests {
                if tags.is_empty() {
                    return Err(HashDbError::Corrupt(format!(
                        "file {file}: digest {digest} has no tags"
                    )));
                }
            }
        }

        let lookup = DigestLookup::build(&files)?;
        let uniqueness = UniquenessIndex::build(&files)?;
        let order = InitialOrder::build(&files, filters.prefer_files_in_root);

        log::info!("loaded fingerprints for {} files", files.len());

        Ok(Self {
            files,
            lookup,
            uniqueness,
            order,
        })
    }

    /// Number of fingerprinted files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Tags whose release ships `file` with exactly this `digest`.
    pub fn tags_for(&self, file: &str, digest: &str) -> Result<&[String]> {
        let digests = self
            .files
            .get(file)
            .ok_or_else(|| HashDbError::UnknownFile(file.to_string()))?;

        let tags = digests
            .get(digest)
            .ok_or_else(|| HashDbError::UnknownDigest {
                file: file.to_string(),
                digest: digest.to_string(),
            })?;

        if tags.is_empty() {
            return Err(HashDbError::EmptyTagList {
                file: file.to_string(),
                digest: digest.to_string(),
            });
        }

        Ok(tags)
    }

    /// Digest of `file` in release `tag`, absent when the release does
    /// not carry the file.
    pub fn digest_for(&self, file: &str, tag: &str) -> Option<&str> {
        self.lookup.digest_for(file, tag)
    }

    /// See [`DigestLookup::tags_share_digest`].
    pub fn tags_share_digest(&self, file: &str, candidates: &[String]) -> Result<bool> {
        self.lookup.tags_share_digest(file, candidates)
    }

    /// See [`UniquenessIndex::most_unique_file`].
    pub fn most_unique_file(&self, candidates: &[String], requested: &[String]) -> Option<&str> {
        self.uniqueness.most_unique_file(candidates, requested)
    }

    /// `index`-th entry of the cold-start request order.
    pub fn file_at(&self, index: usize) -> Option<&str> {
        self.order.file_at(index)
    }

    /// Next file worth an actual request while narrowing `candidates`.
    ///
    /// Files whose fetch cannot eliminate a candidate are marked as
    /// requested and skipped without spending a round trip. Returns
    /// `None` when cancelled or when no useful file remains. A failed
    /// share check is logged and the file probed anyway.
    pub fn next_narrowing_file(
        &self,
        cancel: &CancellationToken,
        candidates: &[String],
        requested: &mut Vec<String>,
    ) -> Option<String> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            let file = self.most_unique_file(candidates, requested)?.to_string();

            match self.tags_share_digest(&file, candidates) {
                Ok(false) => return Some(file),
                Ok(true) => {
                    // zero information in this fetch; consider it spent
                    if !requested.contains(&file) {
                        requested.push(file);
                    }
                }
                Err(err) => {
                    log::warn!("share check for {file}: {err}");
                    return Some(file);
                }
            }
        }
    }
}
