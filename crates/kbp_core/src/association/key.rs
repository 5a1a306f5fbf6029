//! Normalized filename keys and the per-category file index.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use similar::TextDiff;

use crate::models::FileCategory;

/// Catalog and disc-number noise: `ABC-123` prefixes or suffixes,
/// `(Filtered...)` tails, leading digit/underscore runs.
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+-\d+|\w+-\d+$|\(Filtered.*|^[\d_]+").expect("noise pattern is valid")
});

/// Minimum similarity for two keys to be considered the same track.
pub const MATCH_CUTOFF: f64 = 0.6;

/// Maximum number of keys returned by a fuzzy lookup.
pub const MAX_MATCHES: usize = 3;

/// Canonical track name used for fuzzy identity matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn clean_once(name: &str) -> String {
    NOISE
        .replace_all(name, "")
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && !c.is_whitespace())
        .collect()
}

/// Normalize a bare name (no directory, no extension).
///
/// Cleaning repeats until the name stops changing, so a key normalizes
/// to itself.
pub fn normalize_name(name: &str) -> NormalizedKey {
    let mut current = clean_once(name);
    loop {
        let next = clean_once(&current);
        if next == current {
            return NormalizedKey(current);
        }
        current = next;
    }
}

/// Key of a file path: base name without extension, normalized.
pub fn normalize(path: &Path) -> NormalizedKey {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize_name(&stem)
}

/// Similarity of two keys: `2 * matched / total` characters, the same
/// ratio `difflib.SequenceMatcher` reports.
pub fn similarity(a: &NormalizedKey, b: &NormalizedKey) -> f64 {
    f64::from(TextDiff::from_chars(a.as_str(), b.as_str()).ratio())
}

/// Keys most similar to `query`, best first, at most [`MAX_MATCHES`].
///
/// Keys scoring below [`MATCH_CUTOFF`] are dropped. Equal scores order
/// the greater key first.
pub fn closest_keys<'a, I>(query: &NormalizedKey, keys: I) -> Vec<&'a NormalizedKey>
where
    I: IntoIterator<Item = &'a NormalizedKey>,
{
    let mut scored: Vec<(f64, &NormalizedKey)> = keys
        .into_iter()
        .map(|k| (similarity(query, k), k))
        .filter(|(score, _)| *score >= MATCH_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(a.1)));
    scored.into_iter().take(MAX_MATCHES).map(|(_, k)| k).collect()
}

/// Primary files (projects and subtitles) sharing one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryEntry {
    pub category: FileCategory,
    pub paths: Vec<PathBuf>,
}

/// Classified files indexed by category and key.
///
/// A path lives under exactly one category; within a key, paths keep
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct FileResultSet {
    by_category: HashMap<FileCategory, BTreeMap<NormalizedKey, Vec<PathBuf>>>,
    categories: HashMap<PathBuf, FileCategory>,
}

impl FileResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file. Returns false when the path was already indexed.
    pub fn add(&mut self, category: FileCategory, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if let Some(existing) = self.categories.get(&path) {
            if *existing != category {
                tracing::debug!(
                    "Ignoring {} as {}: already indexed as {}",
                    path.display(),
                    category,
                    existing
                );
            }
            return false;
        }
        let key = normalize(&path);
        self.categories.insert(path.clone(), category);
        self.by_category
            .entry(category)
            .or_default()
            .entry(key)
            .or_default()
            .push(path);
        true
    }

    /// Category a path was indexed under.
    pub fn category_of(&self, path: &Path) -> Option<FileCategory> {
        self.categories.get(path).copied()
    }

    /// Key-to-paths map of one category.
    pub fn entries(&self, category: FileCategory) -> impl Iterator<Item = (&NormalizedKey, &[PathBuf])> {
        self.by_category
            .get(&category)
            .into_iter()
            .flatten()
            .map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self, category: FileCategory) -> impl Iterator<Item = &NormalizedKey> {
        self.entries(category).map(|(k, _)| k)
    }

    /// Paths under the keys closest to `key`, best match first.
    pub fn search(&self, category: FileCategory, key: &NormalizedKey) -> Vec<PathBuf> {
        let Some(data) = self.by_category.get(&category) else {
            return Vec::new();
        };
        closest_keys(key, data.keys())
            .into_iter()
            .filter_map(|k| data.get(k))
            .flatten()
            .cloned()
            .collect()
    }

    /// Every file of a category, in key order.
    pub fn all_files(&self, category: FileCategory) -> Vec<PathBuf> {
        self.entries(category)
            .flat_map(|(_, paths)| paths.iter().cloned())
            .collect()
    }

    pub fn file_count(&self, category: FileCategory) -> usize {
        self.entries(category).map(|(_, paths)| paths.len()).sum()
    }

    /// Projects and subtitles merged by key. A key present in both keeps
    /// only the project paths.
    pub fn merged_primary(&self) -> BTreeMap<NormalizedKey, PrimaryEntry> {
        let mut merged = BTreeMap::new();
        for category in [FileCategory::Subtitle, FileCategory::Project] {
            for (key, paths) in self.entries(category) {
                merged.insert(
                    key.clone(),
                    PrimaryEntry {
                        category,
                        paths: paths.to_vec(),
                    },
                );
            }
        }
        merged
    }

    pub fn has_primaries(&self) -> bool {
        self.file_count(FileCategory::Project) + self.file_count(FileCategory::Subtitle) > 0
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
