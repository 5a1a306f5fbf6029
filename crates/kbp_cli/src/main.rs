//! kbp2video command line.
//!
//! Associates the given files into track bundles, compiles render plans and
//! runs them through ffmpeg one at a time.

mod prompt;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::{ArgAction, Parser};

use kbp_core::association::{
    AssociationEngine, AssociationOptions, AutoDecisions, DecisionProvider,
};
use kbp_core::config::ConfigManager;
use kbp_core::external::{FfprobeProber, KbputilsTool};
use kbp_core::logging::{init_tracing, LogConfig, LogLevel};
use kbp_core::models::{AspectPreset, Resolution};
use kbp_core::orchestrator::{
    BatchEvent, BatchItem, BatchProgress, CancelToken, FfmpegLauncher, JobOrchestrator, JobState,
};
use kbp_core::render::{format_tokens_pretty, EncoderArgsBuilder, RenderPlanCompiler};

use crate::prompt::TerminalDecisions;

#[derive(Parser, Debug)]
#[command(name = "kbp2video", version, about = "Render karaoke projects into lyric videos")]
struct Cli {
    /// Project, subtitle, lyric, audio or background files, or folders.
    #[arg(required_unless_present = "list_presets")]
    paths: Vec<PathBuf>,

    /// Config file, created with defaults when missing.
    #[arg(long, short = 'c', default_value = "kbp2video.toml")]
    config: PathBuf,

    /// Write every output here instead of next to its project.
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Only write subtitle files.
    #[arg(long)]
    subtitle_only: bool,

    /// Leave background slots empty instead of matching files.
    #[arg(long)]
    skip_backgrounds: bool,

    /// Never ask: expand folders, take the first candidate, overwrite.
    #[arg(long, short = 'y')]
    yes: bool,

    /// Print the encoder commands instead of running them.
    #[arg(long)]
    dry_run: bool,

    /// Print the aspect and resolution presets, then exit.
    #[arg(long)]
    list_presets: bool,

    /// More output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_verbosity(cli.verbose));
    if cli.list_presets {
        for line in preset_lines() {
            println!("{}", line);
        }
        return Ok(());
    }

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    {
        let settings = config.settings_mut();
        if let Some(dir) = &cli.output_dir {
            settings.paths.output_folder = dir.display().to_string();
        }
        settings.batch.subtitle_only |= cli.subtitle_only;
        settings.batch.skip_backgrounds |= cli.skip_backgrounds;
        settings.batch.overwrite |= cli.yes;
    }
    config
        .ensure_dirs_exist()
        .context("creating output folders")?;
    let settings = config.settings().clone();

    let kbputils = KbputilsTool::new(&settings.tools.kbputils);
    let prober = FfprobeProber::new(&settings.tools.ffprobe);
    let auto = AutoDecisions::new(settings.batch.overwrite);
    let decisions: &dyn DecisionProvider = if cli.yes {
        &auto
    } else {
        &TerminalDecisions
    };

    let engine = AssociationEngine::new(&kbputils).with_lyric_options(settings.lyrics.clone());
    let mut bundles = Vec::new();
    let options = AssociationOptions {
        skip_backgrounds: settings.batch.skip_backgrounds,
    };
    let import = engine.import(&mut bundles, &cli.paths, decisions, &options);
    for error in &import.errors {
        tracing::warn!("Skipped: {}", error);
    }
    for warning in &import.warnings {
        tracing::warn!("{}", warning);
    }
    if import.no_files_found {
        bail!("no project, subtitle or lyric files found in the given paths");
    }
    if bundles.is_empty() {
        bail!("nothing to render");
    }

    let advanced = settings
        .intro_outro()
        .context("reading the [intro] and [outro] config sections")?;
    for bundle in &mut bundles {
        bundle.advanced = advanced.clone();
    }

    let render = settings.render_settings();
    let compiler = RenderPlanCompiler::new(&kbputils, &kbputils, &prober, decisions);
    let items: Vec<BatchItem> = bundles
        .iter()
        .map(|bundle| match compiler.compile(bundle, &render) {
            Ok(plan) => BatchItem::Ready(plan),
            Err(error) => BatchItem::Failed {
                label: bundle.label(),
                error,
            },
        })
        .collect();

    if cli.dry_run {
        for item in &items {
            match item {
                BatchItem::Ready(plan) => match &plan.encode {
                    Some(encode) => {
                        let args = EncoderArgsBuilder::new(encode).build();
                        println!("{}", format_tokens_pretty(&settings.tools.ffmpeg, &args));
                    }
                    None => println!("# {}: subtitles only", plan.label),
                },
                BatchItem::Failed { label, error } => println!("# {}: {}", label, error),
            }
        }
        return Ok(());
    }

    let orchestrator = JobOrchestrator::new(
        Arc::new(FfmpegLauncher::new(&settings.tools.ffmpeg)),
        config.logs_folder(),
    )
    .with_log_config(if cli.verbose > 0 {
        LogConfig::debug()
    } else {
        settings.log_config()
    })
    .with_poll_interval(Duration::from_millis(settings.tools.cancel_poll_ms.max(1)));

    let (handle, mut events) = orchestrator.spawn(items, CancelToken::new());
    let mut progress = BatchProgress::new();
    let mut shown = None;
    while let Some(event) = events.blocking_recv() {
        progress.apply(&event);
        match &event {
            BatchEvent::Started { job_count } => tracing::info!("Rendering {} job(s)", job_count),
            BatchEvent::Progress { label, .. } => {
                let step = progress.overall_percent() as u32 / 10;
                if shown != Some(step) {
                    shown = Some(step);
                    tracing::info!("[{:>3.0}%] {}", progress.overall_percent(), label);
                }
            }
            BatchEvent::JobSucceeded { label, output } => {
                tracing::info!("{} -> {}", label, output.display())
            }
            BatchEvent::Error { message, fatal: true } => tracing::error!("{}", message),
            BatchEvent::Error { message, fatal: false } => tracing::warn!("{}", message),
            BatchEvent::Cancelled => tracing::warn!("Cancelled"),
            BatchEvent::Finished { .. } => {}
        }
        if event.is_terminal() {
            break;
        }
    }

    let report = handle
        .join()
        .map_err(|_| anyhow::anyhow!("batch worker panicked"))?;
    let succeeded = report.count(JobState::Succeeded);
    tracing::info!(
        "{} of {} job(s) succeeded, logs in {}",
        succeeded,
        report.jobs.len(),
        config.logs_folder().display()
    );
    if report.had_fatal_errors() {
        bail!("{} job(s) failed", report.fatal_errors());
    }
    Ok(())
}

/// Config values accepted by `subtitle.aspect` and `video.resolution`.
fn preset_lines() -> Vec<String> {
    let mut lines = vec!["[subtitle] aspect:".to_string()];
    lines.extend(
        AspectPreset::ALL
            .iter()
            .map(|p| format!("  {:<18}{}", p.as_str(), p)),
    );
    lines.push("[video] resolution (or any WxH):".to_string());
    lines.extend(Resolution::PRESETS.iter().map(|r| format!("  {}", r)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_presets_needs_no_paths() {
        let cli = Cli::try_parse_from(["kbp2video", "--list-presets"]).unwrap();
        assert!(cli.list_presets);
        assert!(Cli::try_parse_from(["kbp2video"]).is_err());
    }

    #[test]
    fn preset_lines_use_config_values() {
        let lines = preset_lines();
        assert!(lines.contains(&"  cdg-borders       CDG, borders (25:18)".to_string()));
        assert!(lines.contains(&"  1920x1080".to_string()));
        assert_eq!(lines.len(), 2 + AspectPreset::ALL.len() + Resolution::PRESETS.len());
    }
}
