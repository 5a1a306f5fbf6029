//! Association error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::external::ParseError;

/// A file or folder that could not be taken into the batch.
///
/// These skip one item; the rest of the import continues.
#[derive(Error, Debug)]
pub enum AssociationError {
    #[error("Cannot read folder '{path}': {message}")]
    UnreadableDirectory { path: PathBuf, message: String },

    #[error("Lyric import failed for '{path}': {source}")]
    LyricImport {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Unable to process project '{path}': {source}")]
    ProjectParse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl AssociationError {
    pub fn unreadable_directory(path: &Path, message: impl Into<String>) -> Self {
        Self::UnreadableDirectory {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn lyric_import(path: &Path, source: ParseError) -> Self {
        Self::LyricImport {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn project_parse(path: &Path, source: ParseError) -> Self {
        Self::ProjectParse {
            path: path.to_path_buf(),
            source,
        }
    }

    /// File or folder the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::UnreadableDirectory { path, .. }
            | Self::LyricImport { path, .. }
            | Self::ProjectParse { path, .. } => path,
        }
    }
}

pub type AssociationResult<T> = Result<T, AssociationError>;
