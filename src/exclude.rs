//! Substring-based directory exclusion for the source walk
//!
//! A directory is excluded when any configured substring occurs anywhere in
//! its path. The match is case-sensitive and deliberately raw: it is not
//! anchored to path segments, so `"sub"` also matches `resubmitted/`. This
//! mirrors the exclusion semantics the configuration format has always had.

use std::path::Path;

/// An ordered set of exclusion substrings
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<String>,
}

impl ExclusionSet {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Check whether a path is excluded (any pattern occurs within it).
    ///
    /// Because containment is inherited by descendant paths, matching a
    /// directory implies matching everything beneath it, so the walk can
    /// prune whole subtrees at the first matching directory.
    pub fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy();
        self.patterns.iter().any(|p| path_str.contains(p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
