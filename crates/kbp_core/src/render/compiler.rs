//! Compiles a track bundle into a render plan.
//!
//! Per bundle the compiler:
//! 1. Writes (or reuses) the subtitle document in the output folder
//! 2. Probes the background and resolves the subtitle canvas geometry
//! 3. Builds the composition graph, including intro/outro overlays
//! 4. Picks output options and the expected duration

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::association::DecisionProvider;
use crate::external::{MediaProber, ProjectParser, SubtitleCompiler};
use crate::geometry::{self, Size};
use crate::models::{Background, ClipOverlay, FileCategory, MediaKind, TrackBundle};

use super::errors::{CompileError, CompileResult};
use super::graph::{CompositionGraph, EofAction, Filter, Node, StreamKind};
use super::plan::{AudioOutput, EncodePlan, InputDescriptor, InputRole, OutputOptions, RenderPlan};
use super::settings::RenderSettings;

/// Folder created next to the primary file when no output folder is set.
pub const DEFAULT_OUTPUT_FOLDER: &str = "kbp2video";

/// Characters that break ffmpeg filter arguments.
const UNSAFE_PATH_CHARS: &[char] = &['\'', '"', ':', '\\', '[', ']', ',', ';', '='];

/// Builds [`RenderPlan`]s from bundles.
pub struct RenderPlanCompiler<'a> {
    parser: &'a dyn ProjectParser,
    subtitles: &'a dyn SubtitleCompiler,
    prober: &'a dyn MediaProber,
    decisions: &'a dyn DecisionProvider,
}

impl<'a> RenderPlanCompiler<'a> {
    pub fn new(
        parser: &'a dyn ProjectParser,
        subtitles: &'a dyn SubtitleCompiler,
        prober: &'a dyn MediaProber,
        decisions: &'a dyn DecisionProvider,
    ) -> Self {
        Self {
            parser,
            subtitles,
            prober,
            decisions,
        }
    }

    /// Compile one bundle.
    pub fn compile(
        &self,
        bundle: &TrackBundle,
        settings: &RenderSettings,
    ) -> CompileResult<RenderPlan> {
        let label = bundle.label();
        let out_dir = output_dir_for(&bundle.primary, settings);
        fs::create_dir_all(&out_dir)
            .map_err(|e| CompileError::io("creating folder", &out_dir, e))?;

        let subtitle_path = self.resolve_subtitle(bundle, settings, &out_dir)?;
        let mut warnings = Vec::new();

        let encode = if settings.subtitle_only {
            None
        } else {
            Some(self.build_encode(bundle, settings, &out_dir, &subtitle_path, &mut warnings)?)
        };

        for warning in &warnings {
            tracing::warn!("{}: {}", label, warning);
        }
        tracing::info!(
            "Compiled {} -> {}",
            label,
            encode
                .as_ref()
                .map(|e| e.output_path.display().to_string())
                .unwrap_or_else(|| subtitle_path.display().to_string())
        );

        Ok(RenderPlan {
            label,
            primary: bundle.primary.clone(),
            subtitle_path,
            encode,
            warnings,
        })
    }

    /// Produce the subtitle file the encode will burn in.
    fn resolve_subtitle(
        &self,
        bundle: &TrackBundle,
        settings: &RenderSettings,
        out_dir: &Path,
    ) -> CompileResult<PathBuf> {
        let primary = &bundle.primary;

        if bundle.primary_kind == FileCategory::Project {
            let target = out_dir.join(format!("{}.ass", safe_stem(primary)));
            if target.exists() && !self.decisions.confirm_overwrite(&target) {
                tracing::info!("Reusing existing subtitles {}", target.display());
                return Ok(target);
            }
            let project = self
                .parser
                .parse(primary)
                .map_err(|e| CompileError::project(primary, e))?;
            let document = self
                .subtitles
                .compile(&project, &settings.subtitle_options())
                .map_err(|e| CompileError::subtitle(primary, e))?;
            fs::write(&target, document.contents)
                .map_err(|e| CompileError::io("writing", &target, e))?;
            tracing::debug!("Wrote {}", target.display());
            return Ok(target);
        }

        if !primary.is_file() {
            return Err(CompileError::SubtitleNotFound {
                path: primary.clone(),
            });
        }
        if !has_unsafe_chars(primary) {
            return Ok(primary.clone());
        }

        let target = out_dir.join(format!("{}.ass", safe_stem(primary)));
        if target.exists() && !self.decisions.confirm_overwrite(&target) {
            tracing::info!("Reusing existing subtitles {}", target.display());
            return Ok(target);
        }
        fs::copy(primary, &target).map_err(|e| CompileError::io("copying to", &target, e))?;
        tracing::debug!("Copied {} to {}", primary.display(), target.display());
        Ok(target)
    }

    fn build_encode(
        &self,
        bundle: &TrackBundle,
        settings: &RenderSettings,
        out_dir: &Path,
        subtitle_path: &Path,
        warnings: &mut Vec<String>,
    ) -> CompileResult<EncodePlan> {
        let audio_path = bundle
            .audio
            .as_deref()
            .ok_or_else(|| CompileError::missing_audio(&bundle.primary))?;
        if !audio_path.exists() {
            return Err(CompileError::audio_not_found(audio_path));
        }
        let song = self
            .prober
            .probe_audio(audio_path)
            .map_err(|e| CompileError::unreadable_audio(audio_path, e))?
            .duration;

        let intro = &bundle.advanced.intro;
        let outro = &bundle.advanced.outro;
        let intro_pad = if intro.is_active() { intro.padding() } else { 0.0 };
        let outro_pad = if outro.is_active() { outro.padding() } else { 0.0 };

        if song.is_none() {
            if outro.is_active() {
                return Err(CompileError::unknown_duration(
                    audio_path,
                    "an outro needs the song length",
                ));
            }
            if settings.no_audio {
                return Err(CompileError::unknown_duration(
                    audio_path,
                    "a render without audio needs the song length",
                ));
            }
            warnings.push(format!(
                "Length of {} is unknown; progress will be indeterminate",
                audio_path.display()
            ));
        }
        let total = song.map(|d| intro_pad + d + outro_pad);

        let mut inputs = Vec::new();
        let background = bundle
            .background
            .clone()
            .unwrap_or(Background::Color(settings.background_color));
        let (base, size) = self.background_node(&background, settings, song, &mut inputs)?;

        let audio_index = inputs.len();
        if !settings.no_audio {
            inputs.push(InputDescriptor::new(InputRole::Audio, audio_path));
        }

        let mut video = burn_subtitles(base, size, subtitle_path, settings, song);

        if intro_pad > 0.0 || outro_pad > 0.0 {
            let mut segments = Vec::new();
            if intro_pad > 0.0 {
                segments.push(hold_clip(size, settings.frame_rate, intro_pad));
            }
            segments.push(video);
            if outro_pad > 0.0 {
                segments.push(hold_clip(size, settings.frame_rate, outro_pad));
            }
            video = Node::Concat {
                segments,
                kind: StreamKind::Video,
            };
        }

        let mut clip_audio = Vec::new();
        let mut clips = ClipContext {
            size,
            settings,
            inputs: &mut inputs,
            clip_audio: &mut clip_audio,
            warnings,
        };
        if intro.is_active() {
            video = self.add_clip(&mut clips, "intro", intro, 0.0, video)?;
        }
        if let (true, Some(total)) = (outro.is_active(), total) {
            let start = (total - outro.length).max(0.0);
            video = self.add_clip(&mut clips, "outro", outro, start, video)?;
        }

        let audio = if settings.no_audio {
            None
        } else {
            let mut main = Node::input(audio_index, StreamKind::Audio);
            if intro_pad > 0.0 {
                main = main.then(adelay(intro_pad));
            }
            if !clip_audio.is_empty() {
                let mut mixed = vec![main];
                mixed.append(&mut clip_audio);
                main = Node::Mix { inputs: mixed };
            }
            Some(main)
        };

        let output = output_options(&background, settings, audio.as_ref(), warnings);
        let output_path = out_dir.join(format!(
            "{}.{}",
            safe_stem(&bundle.primary),
            settings.container.extension()
        ));

        Ok(EncodePlan {
            inputs,
            graph: CompositionGraph { video, audio },
            output_path,
            output,
            expected_duration: total,
        })
    }

    /// Source the background and return it with its frame size.
    fn background_node(
        &self,
        background: &Background,
        settings: &RenderSettings,
        song: Option<f64>,
        inputs: &mut Vec<InputDescriptor>,
    ) -> CompileResult<(Node, Size)> {
        let fps = settings.frame_rate;
        let target = Size::new(settings.resolution.width, settings.resolution.height);

        let (mut node, mut size) = match background {
            Background::Color(color) => {
                let mut source = Filter::new("color")
                    .opt("c", color.to_ffmpeg())
                    .opt("s", format_size(target))
                    .opt("r", fps);
                if let Some(d) = song {
                    source = source.opt("d", seconds(d));
                }
                let mut node = Node::source(source);
                if color.is_translucent() {
                    node = node.then(Filter::new("format").arg("rgba"));
                }
                (node, target)
            }
            Background::Image(path) | Background::Video(path) => {
                let info = self
                    .prober
                    .probe(path)
                    .map_err(|e| CompileError::unreadable_background(path, e))?;
                let is_image = matches!(background, Background::Image(_));

                let index = inputs.len();
                let options: Vec<String> = if is_image {
                    vec!["-loop".into(), "1".into(), "-framerate".into(), fps.to_string()]
                } else if settings.loop_background {
                    vec!["-stream_loop".into(), "-1".into()]
                } else {
                    Vec::new()
                };
                inputs.push(InputDescriptor::new(InputRole::Background, path).with_options(options));

                let mut node = Node::input(index, StreamKind::Video);
                if !is_image && !settings.loop_background {
                    // Hold the last frame for whatever the video does not cover.
                    let tpad = Filter::new("tpad").opt("stop_mode", "clone");
                    node = node.then(match song {
                        Some(d) => tpad.opt("stop_duration", seconds(d)),
                        None => tpad.opt("stop", -1),
                    });
                }
                if let Some(d) = song {
                    node = node
                        .then(Filter::new("trim").opt("duration", seconds(d)))
                        .then(Filter::new("setpts").arg("PTS-STARTPTS"));
                }

                let mut size = Size::new(info.width, info.height);
                if settings.scale_background {
                    node = node
                        .then(
                            Filter::new("scale")
                                .opt("w", target.width)
                                .opt("h", target.height)
                                .opt("force_original_aspect_ratio", "decrease"),
                        )
                        .then(pad_to(target, settings));
                    size = target;
                }
                (node.then(Filter::new("setsar").arg(1)), size)
            }
        };

        // 4:2:0 output needs even dimensions.
        let even = Size::new(size.width + size.width % 2, size.height + size.height % 2);
        if even != size {
            node = node.then(pad_to(even, settings));
            size = even;
        }
        Ok((node, size))
    }

    /// Overlay an intro or outro clip starting at `start` seconds.
    fn add_clip(
        &self,
        ctx: &mut ClipContext<'_>,
        which: &'static str,
        clip: &ClipOverlay,
        start: f64,
        base: Node,
    ) -> CompileResult<Node> {
        let Some(path) = clip.file.as_deref() else {
            return Ok(base);
        };
        let info = self
            .prober
            .probe(path)
            .map_err(|e| CompileError::unreadable_clip(which, path, e))?;
        let is_image = MediaKind::from_path(path) == Some(MediaKind::Image);

        let index = ctx.inputs.len();
        let options: Vec<String> = if is_image {
            vec![
                "-loop".into(),
                "1".into(),
                "-framerate".into(),
                ctx.settings.frame_rate.to_string(),
                "-t".into(),
                seconds(clip.length),
            ]
        } else {
            Vec::new()
        };
        ctx.inputs
            .push(InputDescriptor::new(InputRole::Overlay, path).with_options(options));

        let alpha = !clip.fade_black;
        let mut node = Node::input(index, StreamKind::Video)
            .then(Filter::new("trim").opt("duration", seconds(clip.length)))
            .then(Filter::new("setpts").arg("PTS-STARTPTS"))
            .then(
                Filter::new("scale")
                    .opt("w", ctx.size.width)
                    .opt("h", ctx.size.height),
            )
            .then(Filter::new("setsar").arg(1));
        if alpha {
            node = node.then(Filter::new("format").arg("yuva420p"));
        }
        if clip.fade_in > 0.0 {
            node = node.then(fade("in", 0.0, clip.fade_in, alpha));
        }
        if clip.fade_out > 0.0 {
            let fade_start = (clip.length - clip.fade_out).max(0.0);
            node = node.then(fade("out", fade_start, clip.fade_out, alpha));
        }
        node = node.then(Filter::new("setpts").arg(format!("PTS+{}/TB", seconds(start))));

        if clip.sound && !ctx.settings.no_audio {
            if info.has_audio && !is_image {
                let mut sound = Node::input(index, StreamKind::Audio)
                    .then(Filter::new("atrim").opt("duration", seconds(clip.length)))
                    .then(Filter::new("asetpts").arg("PTS-STARTPTS"));
                if start > 0.0 {
                    sound = sound.then(adelay(start));
                }
                ctx.clip_audio.push(sound);
            } else {
                ctx.warnings.push(format!(
                    "The {} clip {} has no sound to mix",
                    which,
                    path.display()
                ));
            }
        }

        Ok(base.overlay(node, 0, 0, EofAction::Pass))
    }
}

/// Mutable state threaded through clip overlays.
struct ClipContext<'c> {
    size: Size,
    settings: &'c RenderSettings,
    inputs: &'c mut Vec<InputDescriptor>,
    clip_audio: &'c mut Vec<Node>,
    warnings: &'c mut Vec<String>,
}

/// Burn subtitles into the base, directly when the canvas is the whole
/// frame, otherwise through a transparent layer placed at the offset.
fn burn_subtitles(
    base: Node,
    size: Size,
    subtitle_path: &Path,
    settings: &RenderSettings,
    song: Option<f64>,
) -> Node {
    let geometry = geometry::resolve(size, settings.aspect.target_width(), settings.aspect.border());
    let ass_file = subtitle_path.display().to_string();

    if geometry.is_identity(size) {
        return base.then(Filter::new("ass").opt("filename", ass_file));
    }

    let mut layer = Filter::new("color")
        .opt("c", "black@0.0")
        .opt("s", format_size(geometry.canvas))
        .opt("r", settings.frame_rate);
    if let Some(d) = song {
        layer = layer.opt("d", seconds(d));
    }
    let layer = Node::source(layer)
        .then(Filter::new("format").arg("rgba"))
        .then(Filter::new("ass").opt("filename", ass_file).opt("alpha", 1));

    base.overlay(
        layer,
        geometry.offset.x,
        geometry.offset.y,
        EofAction::Repeat,
    )
}

fn output_options(
    background: &Background,
    settings: &RenderSettings,
    audio: Option<&Node>,
    warnings: &mut Vec<String>,
) -> OutputOptions {
    let container = settings.container;
    let video_codec = settings.video_codec.clone();
    if !container.supports_video_codec(&video_codec) {
        warnings.push(format!(
            "Video codec {} is not supported in {} output",
            video_codec, container
        ));
    }

    let translucent = matches!(background, Background::Color(c) if c.is_translucent());
    let pixel_format = if translucent && video_codec == "libvpx-vp9" {
        "yuva420p"
    } else {
        if translucent {
            warnings.push(format!(
                "Transparent background requires libvpx-vp9; {} output will be opaque",
                video_codec
            ));
        }
        "yuv420p"
    };

    let audio = audio.map(|node| {
        let mut codec = settings.audio_codec.clone();
        if codec == "copy" && !matches!(node, Node::Input { .. }) {
            let fallback = container.audio_codecs()[0];
            warnings.push(format!(
                "Audio is mixed or delayed and cannot be copied; encoding with {}",
                fallback
            ));
            codec = fallback.to_string();
        }
        if !container.supports_audio_codec(&codec) {
            warnings.push(format!(
                "Audio codec {} is not supported in {} output",
                codec, container
            ));
        }
        let bitrate = (!matches!(codec.as_str(), "copy" | "flac"))
            .then(|| settings.audio_bitrate.clone());
        AudioOutput { codec, bitrate }
    });

    OutputOptions {
        video_codec,
        quality: settings.quality,
        pixel_format: pixel_format.to_string(),
        frame_rate: settings.frame_rate,
        audio,
    }
}

/// Output folder for a primary file.
pub fn output_dir_for(primary: &Path, settings: &RenderSettings) -> PathBuf {
    match &settings.output_dir {
        Some(dir) => dir.clone(),
        None => primary
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(DEFAULT_OUTPUT_FOLDER),
    }
}

/// Whether a file or folder name contains characters that break filter
/// arguments. Drive prefixes and separators are fine.
pub fn has_unsafe_chars(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().contains(UNSAFE_PATH_CHARS),
        _ => false,
    })
}

fn safe_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    stem.replace(UNSAFE_PATH_CHARS, "_")
}

fn format_size(size: Size) -> String {
    format!("{}x{}", size.width, size.height)
}

fn seconds(value: f64) -> String {
    format!("{:.3}", value)
}

fn pad_to(size: Size, settings: &RenderSettings) -> Filter {
    Filter::new("pad")
        .opt("w", size.width)
        .opt("h", size.height)
        .opt("x", "(ow-iw)/2")
        .opt("y", "(oh-ih)/2")
        .opt("color", settings.background_color.to_ffmpeg())
}

fn hold_clip(size: Size, fps: u32, duration: f64) -> Node {
    Node::source(
        Filter::new("color")
            .opt("c", "black")
            .opt("s", format_size(size))
            .opt("r", fps)
            .opt("d", seconds(duration)),
    )
    .then(Filter::new("setsar").arg(1))
}

fn adelay(seconds: f64) -> Filter {
    Filter::new("adelay")
        .opt("delays", (seconds * 1000.0).round() as u64)
        .opt("all", 1)
}

fn fade(direction: &str, start: f64, duration: f64, alpha: bool) -> Filter {
    let filter = Filter::new("fade")
        .opt("t", direction)
        .opt("st", seconds(start))
        .opt("d", seconds(duration));
    if alpha {
        filter.opt("alpha", 1)
    } else {
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::testing::ScriptedDecisions;
    use crate::config::Settings;
    use crate::external::testing::{FakeParser, FakeProber, FakeSubtitles};
    use crate::models::{AspectPreset, Color, Container};
    use crate::render::plan::Quality;
    use tempfile::tempdir;

    struct Fixture {
        dir: tempfile::TempDir,
        parser: FakeParser,
        subtitles: FakeSubtitles,
        prober: FakeProber,
        decisions: ScriptedDecisions,
    }

    impl Fixture {
        fn new(prober: FakeProber) -> Self {
            Self {
                dir: tempdir().unwrap(),
                parser: FakeParser::new(),
                subtitles: FakeSubtitles::new(),
                prober,
                decisions: ScriptedDecisions::new(),
            }
        }

        fn compiler(&self) -> RenderPlanCompiler<'_> {
            RenderPlanCompiler::new(&self.parser, &self.subtitles, &self.prober, &self.decisions)
        }

        fn touch(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, "x").unwrap();
            path
        }

        fn song_bundle(&self) -> TrackBundle {
            TrackBundle::new(self.touch("song.kbp"), FileCategory::Project)
                .with_audio(self.touch("song.mp3"))
        }
    }

    fn default_prober() -> FakeProber {
        FakeProber::new()
            .with_audio("song.mp3", Some(180.0))
            .with_media("cdg.png", 1500, 1080)
            .with_media("wide.mp4", 1920, 1080)
            .with_media("odd.png", 1001, 721)
    }

    #[test]
    fn matching_background_burns_in_directly() {
        let fx = Fixture::new(default_prober());
        let bundle = fx
            .song_bundle()
            .with_background(Background::Image(fx.touch("cdg.png")));

        let plan = fx.compiler().compile(&bundle, &RenderSettings::default()).unwrap();

        let out_dir = fx.dir.path().join(DEFAULT_OUTPUT_FOLDER);
        assert_eq!(plan.subtitle_path, out_dir.join("song.ass"));
        assert!(fs::read_to_string(&plan.subtitle_path)
            .unwrap()
            .contains("[Script Info]"));

        let encode = plan.encode.as_ref().unwrap();
        assert_eq!(encode.output_path, out_dir.join("song.mp4"));
        assert_eq!(encode.expected_duration, Some(180.0));
        let roles: Vec<_> = encode.inputs.iter().map(|i| i.role).collect();
        assert_eq!(roles, vec![InputRole::Background, InputRole::Audio]);
        assert_eq!(encode.inputs[0].options, vec!["-loop", "1", "-framerate", "60"]);

        let names = encode.graph.video.filter_names();
        assert!(names.contains(&"ass".to_string()));
        assert!(!names.contains(&"overlay".to_string()));
        assert_eq!(encode.graph.audio, Some(Node::input(1, StreamKind::Audio)));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn wide_background_gets_offset_overlay() {
        let fx = Fixture::new(default_prober());
        let bundle = fx
            .song_bundle()
            .with_background(Background::Video(fx.touch("wide.mp4")));
        let settings = RenderSettings {
            aspect: AspectPreset::StandardBorders,
            ..RenderSettings::default()
        };

        let plan = fx.compiler().compile(&bundle, &settings).unwrap();
        let video = &plan.encode.unwrap().graph.video;

        let Node::Overlay { x, y, eof, top, .. } = video else {
            panic!("expected overlay, got {:?}", video);
        };
        assert_eq!((*x, *y), (240, 0));
        assert_eq!(*eof, EofAction::Repeat);
        assert_eq!(top.find_filter("color").unwrap().get("s"), Some("1440x1080"));
        assert_eq!(top.find_filter("ass").unwrap().get("alpha"), Some("1"));
        // Non-looped video holds its last frame.
        assert_eq!(
            video.find_filter("tpad").unwrap().get("stop_mode"),
            Some("clone")
        );
    }

    #[test]
    fn looped_video_uses_stream_loop() {
        let fx = Fixture::new(default_prober());
        let bundle = fx
            .song_bundle()
            .with_background(Background::Video(fx.touch("wide.mp4")));
        let settings = RenderSettings {
            loop_background: true,
            ..RenderSettings::default()
        };

        let encode = fx.compiler().compile(&bundle, &settings).unwrap().encode.unwrap();
        assert_eq!(encode.inputs[0].options, vec!["-stream_loop", "-1"]);
        assert!(encode.graph.video.find_filter("tpad").is_none());
    }

    #[test]
    fn color_background_uses_target_resolution() {
        let fx = Fixture::new(default_prober());
        let bundle = fx.song_bundle();

        let encode = fx
            .compiler()
            .compile(&bundle, &RenderSettings::default())
            .unwrap()
            .encode
            .unwrap();

        assert_eq!(encode.inputs.len(), 1);
        assert_eq!(encode.inputs[0].role, InputRole::Audio);
        let color = encode.graph.video.find_filter("color").unwrap();
        assert_eq!(color.get("s"), Some("1500x1080"));
        assert_eq!(color.get("c"), Some("0x000000"));
        assert_eq!(color.get("d"), Some("180.000"));
        assert_eq!(encode.graph.audio, Some(Node::input(0, StreamKind::Audio)));
    }

    #[test]
    fn scaled_background_is_padded_to_resolution() {
        let fx = Fixture::new(default_prober());
        let bundle = fx
            .song_bundle()
            .with_background(Background::Image(fx.touch("cdg.png")));
        let settings = RenderSettings {
            scale_background: true,
            resolution: "1920x1080".parse().unwrap(),
            ..RenderSettings::default()
        };

        let encode = fx.compiler().compile(&bundle, &settings).unwrap().encode.unwrap();
        let video = &encode.graph.video;
        assert_eq!(video.find_filter("scale").unwrap().get("w"), Some("1920"));
        assert_eq!(video.find_filter("pad").unwrap().get("h"), Some("1080"));
        // 1920x1080 against 25:18 is pillarboxed.
        assert!(matches!(video, Node::Overlay { x: 210, y: 0, .. }));
    }

    #[test]
    fn odd_background_is_padded_even() {
        let fx = Fixture::new(default_prober());
        let bundle = fx
            .song_bundle()
            .with_background(Background::Image(fx.touch("odd.png")));

        let encode = fx
            .compiler()
            .compile(&bundle, &RenderSettings::default())
            .unwrap()
            .encode
            .unwrap();
        let pad = encode.graph.video.find_filter("pad").unwrap();
        assert_eq!((pad.get("w"), pad.get("h")), (Some("1002"), Some("722")));
    }

    #[test]
    fn subtitle_primary_is_used_in_place() {
        let fx = Fixture::new(default_prober());
        let bundle = TrackBundle::new(fx.touch("song.ass"), FileCategory::Subtitle)
            .with_audio(fx.touch("song.mp3"));

        let plan = fx.compiler().compile(&bundle, &RenderSettings::default()).unwrap();
        assert_eq!(plan.subtitle_path, fx.dir.path().join("song.ass"));
        assert_eq!(fx.subtitles.call_count(), 0);
    }

    #[test]
    fn unsafe_subtitle_path_is_copied() {
        let fx = Fixture::new(default_prober());
        let bundle = TrackBundle::new(fx.touch("it's, live.ass"), FileCategory::Subtitle)
            .with_audio(fx.touch("song.mp3"));
        let settings = RenderSettings {
            subtitle_only: true,
            ..RenderSettings::default()
        };

        let plan = fx.compiler().compile(&bundle, &settings).unwrap();
        let expected = fx
            .dir
            .path()
            .join(DEFAULT_OUTPUT_FOLDER)
            .join("it_s_ live.ass");
        assert_eq!(plan.subtitle_path, expected);
        assert!(expected.exists());
    }

    #[test]
    fn declined_overwrite_reuses_existing_subtitles() {
        let fx = Fixture::new(default_prober());
        let out_dir = fx.dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(out_dir.join("song.ass"), "edited by hand").unwrap();
        let settings = RenderSettings {
            output_dir: Some(out_dir.clone()),
            subtitle_only: true,
            ..RenderSettings::default()
        };

        let plan = fx.compiler().compile(&fx.song_bundle(), &settings).unwrap();
        assert_eq!(plan.subtitle_path, out_dir.join("song.ass"));
        assert_eq!(fs::read_to_string(&plan.subtitle_path).unwrap(), "edited by hand");
        assert_eq!(fx.subtitles.call_count(), 0);
        assert_eq!(fx.decisions.asked_overwrite.lock().len(), 1);
    }

    #[test]
    fn confirmed_overwrite_regenerates_subtitles() {
        let mut fx = Fixture::new(default_prober());
        fx.decisions = ScriptedDecisions::new().with_overwrite(true);
        let out_dir = fx.dir.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(out_dir.join("song.ass"), "old").unwrap();
        let settings = RenderSettings {
            output_dir: Some(out_dir.clone()),
            subtitle_only: true,
            aspect: AspectPreset::WideBorders,
            ..RenderSettings::default()
        };

        let plan = fx.compiler().compile(&fx.song_bundle(), &settings).unwrap();
        assert_ne!(fs::read_to_string(&plan.subtitle_path).unwrap(), "old");
        assert_eq!(fx.subtitles.last_width.load(std::sync::atomic::Ordering::SeqCst), 384);
    }

    #[test]
    fn subtitle_only_needs_no_audio() {
        let fx = Fixture::new(FakeProber::new());
        let bundle = TrackBundle::new(fx.touch("song.kbp"), FileCategory::Project);
        let settings = RenderSettings {
            subtitle_only: true,
            ..RenderSettings::default()
        };

        let plan = fx.compiler().compile(&bundle, &settings).unwrap();
        assert!(plan.encode.is_none());
        assert_eq!(plan.expected_duration(), None);
        assert_eq!(plan.output_path(), plan.subtitle_path.as_path());
    }

    #[test]
    fn missing_or_unreadable_inputs_fail_the_bundle() {
        let fx = Fixture::new(default_prober());
        let compiler = fx.compiler();
        let settings = RenderSettings::default();

        let no_audio = TrackBundle::new(fx.touch("song.kbp"), FileCategory::Project);
        assert!(matches!(
            compiler.compile(&no_audio, &settings),
            Err(CompileError::MissingAudio { .. })
        ));

        let gone = no_audio.clone().with_audio(fx.dir.path().join("gone.mp3"));
        assert!(matches!(
            compiler.compile(&gone, &settings),
            Err(CompileError::AudioNotFound { .. })
        ));

        let bad_bg = fx
            .song_bundle()
            .with_background(Background::Image(fx.touch("broken.png")));
        assert!(matches!(
            compiler.compile(&bad_bg, &settings),
            Err(CompileError::UnreadableBackground { .. })
        ));

        let missing_ass = TrackBundle::new(fx.dir.path().join("nope.ass"), FileCategory::Subtitle);
        assert!(matches!(
            compiler.compile(&missing_ass, &settings),
            Err(CompileError::SubtitleNotFound { .. })
        ));
    }

    #[test]
    fn subtitle_failure_is_typed() {
        let mut fx = Fixture::new(default_prober());
        fx.subtitles = FakeSubtitles::failing();
        let err = fx
            .compiler()
            .compile(&fx.song_bundle(), &RenderSettings::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::Subtitle { .. }));
        assert!(err.to_string().contains("song.kbp"));
    }

    #[test]
    fn configured_intro_reaches_the_plan() {
        let prober = default_prober().with_clip("intro.mp4", 1280, 720, false);
        let fx = Fixture::new(prober);
        let content = format!(
            "[intro]\nenabled = true\nfile = '{}'\nlength = \"0:05\"\noverlap = \"2.0\"\n",
            fx.touch("intro.mp4").display()
        );
        let settings: Settings = toml::from_str(&content).unwrap();
        let mut bundle = fx.song_bundle();
        bundle.advanced = settings.intro_outro().unwrap();

        let plan = fx
            .compiler()
            .compile(&bundle, &settings.render_settings())
            .unwrap();
        let encode = plan.encode.as_ref().unwrap();

        assert_eq!(encode.expected_duration, Some(183.0));
        let roles: Vec<_> = encode.inputs.iter().map(|i| i.role).collect();
        assert_eq!(roles, vec![InputRole::Audio, InputRole::Overlay]);
        assert_eq!(encode.inputs[1].path, fx.dir.path().join("intro.mp4"));
    }

    #[test]
    fn intro_and_outro_extend_the_timeline() {
        let prober = default_prober()
            .with_clip("intro.mp4", 1280, 720, true)
            .with_clip("outro.png", 640, 480, false);
        let fx = Fixture::new(prober);
        let mut bundle = fx.song_bundle();
        bundle.advanced.intro = ClipOverlay::new(fx.touch("intro.mp4"), 5.0)
            .with_overlap(2.0)
            .with_fades(1.0, 1.0)
            .with_sound(true);
        bundle.advanced.outro = ClipOverlay::new(fx.touch("outro.png"), 4.0)
            .with_overlap(1.0)
            .with_fade_black(true)
            .with_sound(true);

        let plan = fx.compiler().compile(&bundle, &RenderSettings::default()).unwrap();
        let encode = plan.encode.as_ref().unwrap();

        assert_eq!(encode.expected_duration, Some(186.0));
        let roles: Vec<_> = encode.inputs.iter().map(|i| i.role).collect();
        assert_eq!(
            roles,
            vec![InputRole::Audio, InputRole::Overlay, InputRole::Overlay]
        );
        assert_eq!(
            encode.inputs[2].options,
            vec!["-loop", "1", "-framerate", "60", "-t", "4.000"]
        );

        // Outro on top, intro beneath, padded base at the bottom.
        let Node::Overlay { base, top, eof, .. } = &encode.graph.video else {
            panic!("expected outro overlay");
        };
        assert_eq!(*eof, EofAction::Pass);
        assert!(top.filter_names().ends_with(&["setpts".to_string()]));
        assert!(top.find_filter("format").is_none());
        let Node::Overlay { base: padded, top: intro_top, .. } = base.as_ref() else {
            panic!("expected intro overlay");
        };
        assert_eq!(intro_top.find_filter("fade").unwrap().get("alpha"), Some("1"));
        let Node::Concat { segments, .. } = padded.as_ref() else {
            panic!("expected padded timeline");
        };
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].find_filter("color").unwrap().get("d"), Some("3.000"));
        assert_eq!(segments[2].find_filter("color").unwrap().get("d"), Some("3.000"));

        // Song delayed by the intro, intro sound mixed in, image outro is silent.
        let Some(Node::Mix { inputs }) = &encode.graph.audio else {
            panic!("expected mixed audio");
        };
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].find_filter("adelay").unwrap().get("delays"), Some("3000"));
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("outro"));

        let serialized = encode.graph.serialize();
        assert!(serialized
            .filter_complex
            .unwrap()
            .contains("setpts=PTS+182.000/TB"));
    }

    #[test]
    fn unknown_song_length_is_indeterminate() {
        let prober = FakeProber::new().with_audio("song.mp3", None);
        let fx = Fixture::new(prober);

        let plan = fx
            .compiler()
            .compile(&fx.song_bundle(), &RenderSettings::default())
            .unwrap();
        assert_eq!(plan.expected_duration(), None);
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan
            .encode
            .unwrap()
            .graph
            .video
            .find_filter("color")
            .unwrap()
            .get("d")
            .is_none());

        let mut bundle = fx.song_bundle();
        bundle.advanced.outro = ClipOverlay::new(fx.touch("outro.mp4"), 4.0);
        assert!(matches!(
            fx.compiler().compile(&bundle, &RenderSettings::default()),
            Err(CompileError::UnknownDuration { .. })
        ));
    }

    #[test]
    fn alpha_only_for_translucent_vp9() {
        let fx = Fixture::new(default_prober());
        let bundle = fx
            .song_bundle()
            .with_background(Background::Color(Color::rgba(0, 0, 0, 0)));

        let webm = RenderSettings {
            container: Container::Webm,
            video_codec: "libvpx-vp9".to_string(),
            audio_codec: "opus".to_string(),
            ..RenderSettings::default()
        };
        let plan = fx.compiler().compile(&bundle, &webm).unwrap();
        assert_eq!(plan.encode.unwrap().output.pixel_format, "yuva420p");
        assert!(plan.warnings.is_empty());

        let plan = fx.compiler().compile(&bundle, &RenderSettings::default()).unwrap();
        assert_eq!(plan.encode.unwrap().output.pixel_format, "yuv420p");
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn output_options_follow_settings() {
        let fx = Fixture::new(default_prober());
        let settings = RenderSettings {
            container: Container::Mkv,
            video_codec: "libx265".to_string(),
            quality: Quality::Lossless,
            audio_codec: "flac".to_string(),
            ..RenderSettings::default()
        };
        let encode = fx
            .compiler()
            .compile(&fx.song_bundle(), &settings)
            .unwrap()
            .encode
            .unwrap();
        assert_eq!(encode.output.quality, Quality::Lossless);
        assert_eq!(
            encode.output.audio,
            Some(AudioOutput {
                codec: "flac".to_string(),
                bitrate: None
            })
        );
        assert!(encode.output_path.to_string_lossy().ends_with("song.mkv"));

        let silent = RenderSettings {
            no_audio: true,
            ..RenderSettings::default()
        };
        let encode = fx
            .compiler()
            .compile(&fx.song_bundle(), &silent)
            .unwrap()
            .encode
            .unwrap();
        assert_eq!(encode.output.audio, None);
        assert_eq!(encode.graph.audio, None);
        assert!(encode.inputs.is_empty());
    }

    #[test]
    fn unsupported_codec_is_a_warning() {
        let fx = Fixture::new(default_prober());
        let settings = RenderSettings {
            container: Container::Webm,
            video_codec: "h264".to_string(),
            audio_codec: "opus".to_string(),
            ..RenderSettings::default()
        };
        let plan = fx.compiler().compile(&fx.song_bundle(), &settings).unwrap();
        assert!(plan.encode.is_some());
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("h264"));
    }

    #[test]
    fn unsafe_path_detection() {
        assert!(!has_unsafe_chars(Path::new("/music/My Song (Live).ass")));
        assert!(has_unsafe_chars(Path::new("/music/a,b.ass")));
        assert!(has_unsafe_chars(Path::new("/music/it's.ass")));
    }
}
