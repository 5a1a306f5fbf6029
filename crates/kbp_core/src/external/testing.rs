//! Scripted collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::{Color, LyricFormat};

use super::{
    AudioInfo, LyricOptions, MediaInfo, MediaProber, ParseError, ParseResult, ProbeError,
    ProbeResult, ProjectDocument, ProjectParser, SubtitleCompileError, SubtitleCompileResult,
    SubtitleCompiler, SubtitleDocument, SubtitleOptions,
};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parser keyed by file name.
#[derive(Default)]
pub struct FakeParser {
    failing: HashSet<String>,
    audio: HashMap<String, String>,
    palette: HashMap<String, Color>,
}

impl FakeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn with_audio(mut self, name: &str, audio: &str) -> Self {
        self.audio.insert(name.to_string(), audio.to_string());
        self
    }

    pub fn with_palette(mut self, name: &str, color: Color) -> Self {
        self.palette.insert(name.to_string(), color);
        self
    }
}

impl ProjectParser for FakeParser {
    fn parse(&self, path: &Path) -> ParseResult<ProjectDocument> {
        let name = file_name(path);
        if self.failing.contains(&name) {
            return Err(ParseError::malformed(path, "scripted failure"));
        }
        Ok(ProjectDocument {
            path: path.to_path_buf(),
            audio_reference: self.audio.get(&name).cloned(),
            palette_background: self.palette.get(&name).copied(),
        })
    }

    fn import_lyrics(
        &self,
        source: &Path,
        _format: LyricFormat,
        target: &Path,
        _options: &LyricOptions,
    ) -> ParseResult<()> {
        if self.failing.contains(&file_name(source)) {
            return Err(ParseError::import_failed(source, "scripted failure"));
        }
        std::fs::write(target, "PAGEV2\n").map_err(|e| ParseError::io(target, e))
    }
}

/// Subtitle compiler that records the options it was called with.
#[derive(Default)]
pub struct FakeSubtitles {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub last_width: AtomicUsize,
}

impl FakeSubtitles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SubtitleCompiler for FakeSubtitles {
    fn compile(
        &self,
        project: &ProjectDocument,
        options: &SubtitleOptions,
    ) -> SubtitleCompileResult<SubtitleDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_width
            .store(options.target_width as usize, Ordering::SeqCst);
        if self.fail {
            return Err(SubtitleCompileError::command_failed("kbputils", 1, "scripted failure"));
        }
        Ok(SubtitleDocument {
            contents: format!("[Script Info]\n; from {}\n", file_name(&project.path)),
        })
    }
}

/// Prober keyed by file name. Unknown names fail as unreadable.
#[derive(Default)]
pub struct FakeProber {
    media: HashMap<String, MediaInfo>,
    audio: HashMap<String, AudioInfo>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media(mut self, name: &str, width: u32, height: u32) -> Self {
        self.media.insert(
            name.to_string(),
            MediaInfo {
                width,
                height,
                duration: None,
                has_audio: false,
            },
        );
        self
    }

    pub fn with_clip(mut self, name: &str, width: u32, height: u32, has_audio: bool) -> Self {
        self.media.insert(
            name.to_string(),
            MediaInfo {
                width,
                height,
                duration: Some(10.0),
                has_audio,
            },
        );
        self
    }

    pub fn with_audio(mut self, name: &str, duration: Option<f64>) -> Self {
        self.audio.insert(name.to_string(), AudioInfo { duration });
        self
    }
}

impl MediaProber for FakeProber {
    fn probe(&self, path: &Path) -> ProbeResult<MediaInfo> {
        self.media
            .get(&file_name(path))
            .copied()
            .ok_or_else(|| ProbeError::unreadable("ffprobe", path, "scripted failure"))
    }

    fn probe_audio(&self, path: &Path) -> ProbeResult<AudioInfo> {
        self.audio
            .get(&file_name(path))
            .copied()
            .ok_or_else(|| ProbeError::unreadable("ffprobe", path, "scripted failure"))
    }
}
