use std::collections::BTreeMap;

use crate::database::RawDb;
use crate::error::{HashDbError, Result};

/// One probe-worthy file for a tag, ranked by how many tags share the
/// file's body in that release. A share of 1 pins the release exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub share: usize,
    pub file: String,
}

/// `tag → files ordered most-disambiguating-first`.
///
/// Built once per database; the deduction loop consults it on every
/// step to decide which file is worth the next round trip.
#[derive(Debug, Default)]
pub struct UniquenessIndex {
    per_tag: BTreeMap<String, Vec<Witness>>,
}

impl UniquenessIndex {
    pub fn build(db: &RawDb) -> Result<Self> {
        let mut per_tag: BTreeMap<String, Vec<Witness>> = BTreeMap::new();

        for (file, digests) in db {
            // share per tag for this one file
            let mut shares: BTreeMap<&str, usize> = BTreeMap::new();

            for tags in digests.values() {
                for tag in tags {
                    if shares.insert(tag.as_str(), tags.len()).is_some() {
                        return Err(HashDbError::Corrupt(format!(
                            "file {file}: tag {tag} appears under two digests"
                        )));
                    }
                }
            }

            for (tag, share) in shares {
                per_tag.entry(tag.to_string()).or_default().push(Witness {
                    share,
                    file: file.clone(),
                });
            }
        }

        for witnesses in per_tag.values_mut() {
            witnesses.sort_by(|a, b| a.share.cmp(&b.share).then_with(|| a.file.cmp(&b.file)));
        }

        Ok(Self { per_tag })
    }

    /// File expected to eliminate the most candidates: each candidate
    /// nominates its best not-yet-requested witness, the globally
    /// lowest share wins, filename breaks ties.
    ///
    /// With no candidates yet any unseen file will do; tags are walked
    /// in key order so the pick is stable across runs. Returns `None`
    /// once every witness has been spent.
    pub fn most_unique_file(&self, candidates: &[String], requested: &[String]) -> Option<&str> {
        if candidates.is_empty() {
            return self
                .per_tag
                .values()
                .flatten()
                .find(|w| !requested.contains(&w.file))
                .map(|w| w.file.as_str());
        }

        let mut best: Option<&Witness> = None;

        for tag in candidates {
            let Some(witnesses) = self.per_tag.get(tag) else {
                log::warn!("no uniqueness entry for tag {tag}");
                continue;
            };

            // witness lists are pre-sorted, first unseen entry is the
            // tag's best remaining option
            let Some(w) = witnesses.iter().find(|w| !requested.contains(&w.file)) else {
                continue;
            };

            best = match best {
                Some(b) if (b.share, b.file.as_str()) <= (w.share, w.file.as_str()) => Some(b),
                _ => Some(w),
            };
        }

        best.map(|w| w.file.as_str())
    }

    #[cfg(test)]
    pub(crate) fn witnesses(&self, tag: &str) -> Option<&[Witness]> {
        self.per_tag.get(tag).map(Vec::as_slice)
    }
}
