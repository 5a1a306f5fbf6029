//! Decisions the pipeline needs from a human.
//!
//! The core never prompts by itself; callers provide a [`DecisionProvider`].

use std::path::{Path, PathBuf};

use crate::models::BundleSlot;

/// Answer to "import this whole folder?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryDecision {
    /// Expand this directory, ask again for the next one.
    Once,
    /// Expand this and every later directory of the same import.
    Always,
    /// Skip this and every later directory of the same import.
    Never,
    /// Skip this directory, ask again for the next one.
    Skip,
}

/// Source of answers for ambiguous situations.
pub trait DecisionProvider {
    fn confirm_expand_directory(&self, path: &Path) -> DirectoryDecision;

    /// Pick one of several candidates, or `None` to leave the slot empty.
    fn choose_one(&self, candidates: &[PathBuf], prompt: &str) -> Option<PathBuf>;

    /// Whether an existing output file may be replaced.
    fn confirm_overwrite(&self, path: &Path) -> bool;

    /// Whether a filled bundle slot may be replaced during backfill.
    fn confirm_replace(
        &self,
        primary: &Path,
        slot: BundleSlot,
        current: &str,
        replacement: &Path,
    ) -> bool;
}

/// Non-interactive answers: expand every folder, take the first candidate,
/// never replace filled slots. Overwrites follow `overwrite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDecisions {
    pub overwrite: bool,
}

impl AutoDecisions {
    pub fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }
}

impl DecisionProvider for AutoDecisions {
    fn confirm_expand_directory(&self, path: &Path) -> DirectoryDecision {
        tracing::debug!("Expanding folder {}", path.display());
        DirectoryDecision::Always
    }

    fn choose_one(&self, candidates: &[PathBuf], prompt: &str) -> Option<PathBuf> {
        let choice = candidates.first().cloned();
        if let Some(choice) = &choice {
            tracing::info!("{} Using {}", prompt, choice.display());
        }
        choice
    }

    fn confirm_overwrite(&self, path: &Path) -> bool {
        if !self.overwrite {
            tracing::info!("Keeping existing {}", path.display());
        }
        self.overwrite
    }

    fn confirm_replace(
        &self,
        _primary: &Path,
        _slot: BundleSlot,
        _current: &str,
        _replacement: &Path,
    ) -> bool {
        false
    }
}
