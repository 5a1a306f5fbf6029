//! File classification by extension.

use std::path::Path;

use crate::models::{
    extension_of, FileCategory, LyricFormat, AUDIO_EXTENSIONS, DOBLON_EXTENSIONS,
    IMAGE_EXTENSIONS, LRC_EXTENSIONS, PROJECT_EXTENSIONS, SUBTITLE_EXTENSIONS, VIDEO_EXTENSIONS,
};

/// What a dropped file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    File(FileCategory),
    /// Lyric file that must be converted to a project first.
    Lyrics(LyricFormat),
}

/// Classify a path, `None` for irrelevant files.
pub fn classify(path: &Path) -> Option<Classification> {
    let ext = extension_of(path);
    let ext = ext.as_str();
    let found = if PROJECT_EXTENSIONS.contains(&ext) {
        Classification::File(FileCategory::Project)
    } else if SUBTITLE_EXTENSIONS.contains(&ext) {
        Classification::File(FileCategory::Subtitle)
    } else if LRC_EXTENSIONS.contains(&ext) {
        Classification::Lyrics(LyricFormat::Lrc)
    } else if DOBLON_EXTENSIONS.contains(&ext) {
        Classification::Lyrics(LyricFormat::DoblonTxt)
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        Classification::File(FileCategory::Audio)
    } else if IMAGE_EXTENSIONS.contains(&ext) || VIDEO_EXTENSIONS.contains(&ext) {
        Classification::File(FileCategory::Background)
    } else {
        return None;
    };
    Some(found)
}
