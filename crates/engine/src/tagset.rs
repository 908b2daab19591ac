//! Candidate-set algebra. Lists stay small (tens of tags), linear scans
//! beat hashing here and keep ordering intact.

/// Intersection preserving the order of `current`, duplicates dropped.
/// The candidate list only ever shrinks through this.
pub(crate) fn intersect(current: &[String], incoming: &[String]) -> Vec<String> {
    let mut out = Vec::new();

    for tag in current {
        if incoming.contains(tag) && !out.contains(tag) {
            out.push(tag.clone());
        }
    }

    out
}
