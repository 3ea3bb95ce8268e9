use std::collections::HashSet;

use crate::config::StatsOptions;

/// Decides which paths are never measured (the dashboard itself, favicons,
/// scrape endpoints). Matching is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    paths: HashSet<String>,
    prefixes: Vec<String>,
}

impl PathFilter {
    pub fn new<P, X>(paths: P, prefixes: X) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        X: IntoIterator,
        X::Item: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_options(options: &StatsOptions) -> Self {
        Self::new(&options.excluded_paths, &options.excluded_path_prefixes)
    }

    pub fn should_exclude(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let path = path.to_lowercase();
        self.paths.contains(&path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}
