/// Pre-index filtering applied while loading a fingerprint database.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Drop any file path containing one of these substrings.
    pub excluded_substrings: Vec<String>,

    /// If non-empty, keep only paths containing at least one of these.
    pub include_only_substrings: Vec<String>,

    /// Sort files served from the web root ahead of everything else.
    pub prefer_files_in_root: bool,
}

impl FilterOptions {
    /// Baseline for databases without a dedicated preset: skip paths
    /// that deployments typically gate behind auth.
    pub fn baseline() -> Self {
        Self {
            excluded_substrings: vec!["wp-admin".into(), "/config/".into()],
            include_only_substrings: Vec::new(),
            prefer_files_in_root: true,
        }
    }

    /// Preset for a CMS family name as used by the bundled databases.
    pub fn for_cms(cms: &str) -> Self {
        match cms {
            "wordpress" => Self {
                excluded_substrings: vec![
                    "wp-admin".into(),
                    "/config/".into(),
                    "wp-content/themes".into(),
                ],
                ..Self::baseline()
            },
            // tinymce4 is frequently stripped from deployments, keep to
            // the asset tree that survives
            "contao" => Self {
                include_only_substrings: vec!["assets/contao".into()],
                ..Self::baseline()
            },
            "umbraco" => Self {
                include_only_substrings: vec!["/assets/".into(), "/lib/".into()],
                ..Self::baseline()
            },
            _ => Self::baseline(),
        }
    }

    pub(crate) fn keeps(&self, path: &str) -> bool {
        if self
            .excluded_substrings
            .iter()
            .any(|m| path.contains(m.as_str()))
        {
            return false;
        }

        if self.include_only_substrings.is_empty() {
            return true;
        }

        self.include_only_substrings
            .iter()
            .any(|m| path.contains(m.as_str()))
    }
}
