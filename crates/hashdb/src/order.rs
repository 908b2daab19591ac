use std::cmp::Ordering;

use crate::database::RawDb;

/// Substrings marking paths that deployments rarely gate behind auth.
/// Only a tiebreak while nothing is known about the target yet.
const LIKELY_ACCESSIBLE: &[&str] = &["wp-includes", "wp-content", "assets/contao", "language/"];

fn is_likely_accessible(file: &str) -> bool {
    LIKELY_ACCESSIBLE.iter().any(|m| file.contains(m))
}

/// Cold-start request order over all files, used until the first digest
/// match seeds the candidate set.
///
/// Files with many known digests come first: one request covers the
/// most releases. With `prefer_files_in_root`, bare filenames such as
/// `robots.txt` outrank nested paths entirely, as they are the least
/// likely to be blocked or relocated by the deployment.
#[derive(Debug, Default)]
pub struct InitialOrder {
    files: Vec<String>,
}

impl InitialOrder {
    pub fn build(db: &RawDb, prefer_root: bool) -> Self {
        let mut files: Vec<String> = db.keys().cloned().collect();

        files.sort_by(|a, b| {
            if prefer_root {
                let a_root = !a.contains('/');
                let b_root = !b.contains('/');
                if a_root != b_root {
                    return if a_root { Ordering::Less } else { Ordering::Greater };
                }
            }

            db[b].len()
                .cmp(&db[a].len())
                .then_with(|| is_likely_accessible(b).cmp(&is_likely_accessible(a)))
                .then_with(|| b.cmp(a))
        });

        Self { files }
    }

    pub fn file_at(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
