//! Ordering over version tags.
//!
//! Tags are opaque dotted strings. Comparing digit-count before content
//! makes `1.7.24` rank above `1.7.9` without parsing components as
//! numbers, which keeps tags like `2.0.3-rc1` comparable.

use std::cmp::Ordering;

/// Compare two tags, `Greater` meaning newer.
///
/// Components are split on `.`. Tags with a different component count
/// fall back to a raw lexicographic compare; this is how `5.7.1` vs
/// `5.7` is resolved and is intentional. With equal counts, the first
/// differing component decides: the longer one wins, then lexicographic.
pub fn compare_tags(a: &str, b: &str) -> Ordering {
    let xs: Vec<&str> = a.split('.').collect();
    let ys: Vec<&str> = b.split('.').collect();

    if xs.len() != ys.len() {
        return a.cmp(b);
    }

    for (x, y) in xs.iter().zip(ys.iter()) {
        if x == y {
            continue;
        }
        if x.len() != y.len() {
            return x.len().cmp(&y.len());
        }
        return x.cmp(y);
    }

    a.cmp(b)
}

/// Sort tags newest-first.
///
/// Every user-visible candidate list goes through this, so reported
/// sets read the same across runs.
pub fn sort_tags_desc(mut tags: Vec<String>) -> Vec<String> {
    tags.sort_by(|a, b| compare_tags(b, a));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(tags: &[&str]) -> Vec<String> {
        sort_tags_desc(tags.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_longer_component_wins() {
        assert_eq!(compare_tags("1.7.24", "1.7.9"), Ordering::Greater);
        assert_eq!(compare_tags("1.7.9", "1.7.24"), Ordering::Less);
        assert_eq!(compare_tags("1.7.9", "1.7.9"), Ordering::Equal);
    }

    #[test]
    fn test_component_count_falls_back_to_lexicographic() {
        assert_eq!(compare_tags("5.7.1", "5.7"), Ordering::Greater);
        assert_eq!(compare_tags("5.7", "5.6.0"), Ordering::Greater);
    }

    #[test]
    fn test_sort_desc_patch_series() {
        let got = desc(&[
            "1.7.9", "1.7.8", "1.7.7", "1.7.6", "1.7.5", "1.7.4", "1.7.3", "1.7.24", "1.7.2",
            "1.7.12", "1.7.10", "1.7.1", "1.7.0",
        ]);
        let want = [
            "1.7.24", "1.7.12", "1.7.10", "1.7.9", "1.7.8", "1.7.7", "1.7.6", "1.7.5", "1.7.4",
            "1.7.3", "1.7.2", "1.7.1", "1.7.0",
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_sort_desc_mixed_component_counts() {
        assert_eq!(desc(&["5.6.0", "5.7.1", "5.7"]), ["5.7.1", "5.7", "5.6.0"]);
    }
}
