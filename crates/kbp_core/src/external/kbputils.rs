//! Project parsing and subtitle compilation backed by the `kbputils` tool.
//!
//! Project hints (referenced audio, palette color 0) are read directly from
//! the project text. Conversions shell out to `kbputils`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::models::{Color, LyricFormat};

use super::{
    LyricOptions, ParseError, ParseResult, ProjectDocument, ProjectParser, SubtitleCompileError,
    SubtitleCompileResult, SubtitleCompiler, SubtitleDocument, SubtitleOptions,
};

/// Collaborator implementation that runs `kbputils`.
#[derive(Debug, Clone)]
pub struct KbputilsTool {
    program: PathBuf,
}

impl Default for KbputilsTool {
    fn default() -> Self {
        Self::new("kbputils")
    }
}

impl KbputilsTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn tool_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Arguments for `kbputils kbp2ass`, excluding the input path.
pub fn kbp2ass_args(options: &SubtitleOptions) -> Vec<String> {
    let mut args = vec!["kbp2ass".to_string(), "-f".to_string()];
    if options.target_width != crate::models::AspectPreset::NATIVE_WIDTH {
        args.push("-W".to_string());
        args.push(options.target_width.to_string());
    }
    if !options.border {
        args.push("--no-b".to_string());
    }
    args.push("-F".to_string());
    args.push(format!("{},{}", options.fade_in_ms, options.fade_out_ms));
    if let Some(offset) = options.offset_ms {
        args.push("-o".to_string());
        args.push(offset.to_string());
    }
    if !options.transparency {
        args.push("--no-t".to_string());
    }
    if !options.overlap_wipe {
        args.push("--no-overlap".to_string());
    }
    if options.experimental_spacing {
        args.push("--experimental-spacing".to_string());
    }
    args.push("--wrap".to_string());
    args.push(options.wrap.as_arg().to_string());
    args
}

/// Arguments for a lyric conversion, excluding input and output paths.
pub fn lyric_import_args(format: LyricFormat, options: &LyricOptions) -> Vec<String> {
    let command = match format {
        LyricFormat::Lrc => "lrc2kbp",
        LyricFormat::DoblonTxt => "doblontxt2kbp",
    };
    let mut args = vec![command.to_string()];
    for (flag, value) in [
        ("--title", &options.title),
        ("--artist", &options.artist),
        ("--audio-file", &options.audio_file),
        ("--comments", &options.comments),
    ] {
        if !value.is_empty() {
            args.push(flag.to_string());
            args.push(value.clone());
        }
    }
    args.push("--max-lines-per-page".to_string());
    args.push(options.max_lines_per_page.to_string());
    args
}

impl ProjectParser for KbputilsTool {
    fn parse(&self, path: &Path) -> ParseResult<ProjectDocument> {
        let raw = std::fs::read(path).map_err(|e| ParseError::io(path, e))?;
        let text = String::from_utf8_lossy(&raw);
        parse_project_text(path, &text)
    }

    fn import_lyrics(
        &self,
        source: &Path,
        format: LyricFormat,
        target: &Path,
        options: &LyricOptions,
    ) -> ParseResult<()> {
        let args = lyric_import_args(format, options);
        tracing::debug!(
            "$ {} {} {} {}",
            self.tool_name(),
            args.join(" "),
            source.display(),
            target.display()
        );

        let output = Command::new(&self.program)
            .args(&args)
            .arg(source)
            .arg(target)
            .output()
            .map_err(|e| ParseError::import_failed(source, format!("failed to run: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ParseError::import_failed(source, stderr.trim()));
        }
        if !target.exists() {
            return Err(ParseError::import_failed(source, "no project written"));
        }
        Ok(())
    }
}

impl SubtitleCompiler for KbputilsTool {
    fn compile(
        &self,
        project: &ProjectDocument,
        options: &SubtitleOptions,
    ) -> SubtitleCompileResult<SubtitleDocument> {
        let args = kbp2ass_args(options);
        tracing::debug!(
            "$ {} {} {}",
            self.tool_name(),
            args.join(" "),
            project.path.display()
        );

        let output = Command::new(&self.program)
            .args(&args)
            .arg(&project.path)
            .output()
            .map_err(|e| SubtitleCompileError::launch(self.tool_name(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubtitleCompileError::command_failed(
                self.tool_name(),
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            ));
        }

        let contents = String::from_utf8_lossy(&output.stdout).into_owned();
        if contents.trim().is_empty() {
            return Err(SubtitleCompileError::EmptyOutput {
                path: project.path.clone(),
            });
        }
        Ok(SubtitleDocument { contents })
    }
}

/// Read project hints from project text.
///
/// The palette is the first data line after the `Palette Colours` header:
/// sixteen comma-separated 12-bit `RGB` hex values. Track info lines look
/// like `'Audio  path`.
pub fn parse_project_text(path: &Path, text: &str) -> ParseResult<ProjectDocument> {
    if !text.lines().any(|l| l.trim_start().starts_with("PAGEV2")) && !text.contains("Palette") {
        return Err(ParseError::malformed(path, "not a karaoke project"));
    }

    let mut doc = ProjectDocument::new(path);
    let mut in_palette = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if in_palette && !trimmed.is_empty() && !trimmed.starts_with('\'') {
            doc.palette_background = trimmed.split(',').next().and_then(parse_palette_entry);
            in_palette = false;
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('\'') {
            if rest.starts_with("Palette Colours") {
                in_palette = true;
            } else if let Some(audio) = rest.strip_prefix("Audio") {
                if audio.starts_with(char::is_whitespace) && !audio.trim().is_empty() {
                    doc.audio_reference = Some(audio.trim().to_string());
                }
            }
        }
    }
    Ok(doc)
}

/// Expand a 12-bit `RGB` palette entry to a 24-bit color.
fn parse_palette_entry(entry: &str) -> Option<Color> {
    let entry = entry.trim();
    if entry.len() != 3 {
        return None;
    }
    let mut channels = entry
        .chars()
        .map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
    Some(Color::rgb(
        channels.next()??,
        channels.next()??,
        channels.next()??,
    ))
}
