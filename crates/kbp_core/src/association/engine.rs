//! Turns dropped paths into track bundles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::external::{LyricOptions, ProjectParser};
use crate::models::{Background, BundleSlot, FileCategory, TrackBundle};

use super::classify::{classify, Classification};
use super::decisions::{DecisionProvider, DirectoryDecision};
use super::errors::AssociationError;
use super::key::{closest_keys, normalize, FileResultSet, NormalizedKey};

/// Options that shape bundling.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociationOptions {
    /// Leave background files unmatched for manual fill-in.
    pub skip_backgrounds: bool,
}

/// Result of scanning dropped paths.
#[derive(Debug, Default)]
pub struct AssociationOutcome {
    pub results: FileResultSet,
    /// Files that were skipped, with the reason.
    pub errors: Vec<AssociationError>,
}

/// Bundles created from an association result.
#[derive(Debug, Default)]
pub struct BundleOutcome {
    pub bundles: Vec<TrackBundle>,
    pub errors: Vec<AssociationError>,
    pub warnings: Vec<String>,
}

/// Summary of one import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// New bundles appended.
    pub added: usize,
    /// Empty or replaced slots filled on existing bundles.
    pub backfilled: usize,
    pub errors: Vec<AssociationError>,
    pub warnings: Vec<String>,
    /// No relevant file was found in the dropped paths.
    pub no_files_found: bool,
}

/// Directory-expansion policy remembered for the rest of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectoryPolicy {
    Ask,
    Expand,
    Skip,
}

/// Classifies dropped files and groups them into bundles.
pub struct AssociationEngine<'a> {
    parser: &'a dyn ProjectParser,
    lyrics: LyricOptions,
}

impl<'a> AssociationEngine<'a> {
    pub fn new(parser: &'a dyn ProjectParser) -> Self {
        Self {
            parser,
            lyrics: LyricOptions::default(),
        }
    }

    pub fn with_lyric_options(mut self, lyrics: LyricOptions) -> Self {
        self.lyrics = lyrics;
        self
    }

    /// Classify every dropped path, expanding folders on request.
    pub fn associate(
        &self,
        paths: &[PathBuf],
        decisions: &dyn DecisionProvider,
    ) -> AssociationOutcome {
        let mut outcome = AssociationOutcome::default();
        let mut policy = DirectoryPolicy::Ask;

        for path in paths {
            if !path.is_dir() {
                self.add_file(path, &mut outcome);
                continue;
            }

            let expand = match policy {
                DirectoryPolicy::Expand => true,
                DirectoryPolicy::Skip => false,
                DirectoryPolicy::Ask => match decisions.confirm_expand_directory(path) {
                    DirectoryDecision::Once => true,
                    DirectoryDecision::Always => {
                        policy = DirectoryPolicy::Expand;
                        true
                    }
                    DirectoryDecision::Never => {
                        policy = DirectoryPolicy::Skip;
                        false
                    }
                    DirectoryDecision::Skip => false,
                },
            };

            if expand {
                self.add_directory(path, &mut outcome);
            } else {
                tracing::debug!("Skipping folder {}", path.display());
            }
        }

        tracing::info!(
            "Found {} relevant file(s) in {} dropped path(s)",
            outcome.results.len(),
            paths.len()
        );
        outcome
    }

    fn add_directory(&self, dir: &Path, outcome: &mut AssociationOutcome) {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    self.add_file(entry.path(), outcome);
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    tracing::warn!("Cannot read {}: {}", path.display(), e);
                    outcome
                        .errors
                        .push(AssociationError::unreadable_directory(&path, e.to_string()));
                }
            }
        }
    }

    fn add_file(&self, path: &Path, outcome: &mut AssociationOutcome) {
        match classify(path) {
            Some(Classification::File(category)) => {
                outcome.results.add(category, path);
            }
            Some(Classification::Lyrics(format)) => {
                let target = path.with_extension("kbp");
                if !target.exists() {
                    tracing::info!(
                        "Importing {} lyrics from {}",
                        format.as_str(),
                        path.display()
                    );
                    if let Err(e) = self
                        .parser
                        .import_lyrics(path, format, &target, &self.lyrics)
                    {
                        tracing::warn!("{}", e);
                        outcome.errors.push(AssociationError::lyric_import(path, e));
                        return;
                    }
                }
                outcome.results.add(FileCategory::Project, target);
            }
            None => {}
        }
    }

    /// Create one bundle per primary key and fill its slots.
    pub fn build_bundles(
        &self,
        results: &FileResultSet,
        decisions: &dyn DecisionProvider,
        options: &AssociationOptions,
    ) -> BundleOutcome {
        let mut outcome = BundleOutcome::default();
        let merged = results.merged_primary();
        let single_primary = merged.len() == 1;

        for (key, entry) in &merged {
            let primary = self.pick_primary(key, &entry.paths, decisions, &mut outcome.warnings);

            let project = if entry.category == FileCategory::Project {
                match self.parser.parse(&primary) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        tracing::warn!("{}", e);
                        outcome
                            .errors
                            .push(AssociationError::project_parse(&primary, e));
                        continue;
                    }
                }
            } else {
                None
            };

            let mut bundle = TrackBundle::new(primary, entry.category);
            for slot in [BundleSlot::Audio, BundleSlot::Background] {
                if slot == BundleSlot::Background && options.skip_backgrounds {
                    continue;
                }
                let category = slot.category();
                let mut candidates = results.search(category, key);

                // One primary takes everything; one background serves every primary.
                if candidates.is_empty()
                    && (single_primary
                        || (slot == BundleSlot::Background
                            && results.file_count(FileCategory::Background) == 1))
                {
                    candidates = results.all_files(category);
                }

                let chosen = match candidates.len() {
                    0 => None,
                    1 => candidates.pop(),
                    _ => decisions.choose_one(
                        &candidates,
                        &format!(
                            "Multiple potential {} files were found for {}.",
                            category,
                            bundle.primary.display()
                        ),
                    ),
                };
                if let Some(file) = chosen {
                    tracing::debug!("Matched {} {} to {}", category, file.display(), key);
                    bundle.set_file(slot, &file);
                }
            }

            if let Some(doc) = project {
                if bundle.audio.is_none() {
                    bundle.audio = doc.resolved_audio();
                }
                if bundle.background.is_none() {
                    bundle.background = doc.palette_background.map(Background::Color);
                }
            }

            outcome.bundles.push(bundle);
        }

        outcome
    }

    fn pick_primary(
        &self,
        key: &NormalizedKey,
        paths: &[PathBuf],
        decisions: &dyn DecisionProvider,
        warnings: &mut Vec<String>,
    ) -> PathBuf {
        let first = paths[0].clone();
        if paths.len() == 1 {
            return first;
        }
        let prompt = format!(
            "Multiple files share the name '{}'. Select the one to keep.",
            key
        );
        let chosen = decisions.choose_one(paths, &prompt).unwrap_or(first);
        let dropped: Vec<String> = paths
            .iter()
            .filter(|p| **p != chosen)
            .map(|p| p.display().to_string())
            .collect();
        let warning = format!(
            "Kept {} for '{}', ignored: {}",
            chosen.display(),
            key,
            dropped.join(", ")
        );
        tracing::warn!("{}", warning);
        warnings.push(warning);
        chosen
    }

    /// Fill slots of existing bundles from audio/background-only results.
    ///
    /// Returns the number of slots written.
    pub fn backfill(
        &self,
        bundles: &mut [TrackBundle],
        results: &FileResultSet,
        decisions: &dyn DecisionProvider,
        options: &AssociationOptions,
    ) -> usize {
        let mut index: BTreeMap<NormalizedKey, Vec<usize>> = BTreeMap::new();
        for (i, bundle) in bundles.iter().enumerate() {
            index.entry(normalize(&bundle.primary)).or_default().push(i);
        }

        let mut filled = 0;
        for slot in [BundleSlot::Audio, BundleSlot::Background] {
            if slot == BundleSlot::Background && options.skip_backgrounds {
                continue;
            }
            let category = slot.category();
            let single_file = results.file_count(category) == 1;

            for (key, files) in results.entries(category) {
                let file = if files.len() > 1 {
                    let prompt = format!(
                        "Multiple potential {} files were found with similar names. Select one to import.",
                        category
                    );
                    match decisions.choose_one(files, &prompt) {
                        Some(file) => file,
                        None => continue,
                    }
                } else {
                    files[0].clone()
                };

                let mut matched: Vec<usize> = closest_keys(key, index.keys())
                    .into_iter()
                    .filter_map(|k| index.get(k))
                    .flatten()
                    .copied()
                    .collect();
                // A single dropped file was meant for one of the bundles.
                if matched.is_empty() && single_file {
                    matched = (0..bundles.len()).collect();
                }

                let target = match matched.len() {
                    0 => continue,
                    1 => matched[0],
                    _ => {
                        let primaries: Vec<PathBuf> =
                            matched.iter().map(|&i| bundles[i].primary.clone()).collect();
                        let prompt = format!(
                            "Multiple potential tracks were found for {}.",
                            file.display()
                        );
                        let Some(choice) = decisions.choose_one(&primaries, &prompt) else {
                            continue;
                        };
                        match primaries.iter().position(|p| *p == choice) {
                            Some(pos) => matched[pos],
                            None => continue,
                        }
                    }
                };

                let bundle = &mut bundles[target];
                if bundle.is_filled(slot)
                    && !decisions.confirm_replace(
                        &bundle.primary,
                        slot,
                        &bundle.slot_display(slot),
                        &file,
                    )
                {
                    continue;
                }
                if bundle.set_file(slot, &file) {
                    tracing::info!("Set {} of {} to {}", category, bundle.label(), file.display());
                    filled += 1;
                }
            }
        }
        filled
    }

    /// Import dropped paths into an existing bundle list.
    ///
    /// New primaries become new bundles; otherwise the files backfill
    /// existing bundles.
    pub fn import(
        &self,
        bundles: &mut Vec<TrackBundle>,
        paths: &[PathBuf],
        decisions: &dyn DecisionProvider,
        options: &AssociationOptions,
    ) -> ImportReport {
        let outcome = self.associate(paths, decisions);
        let mut report = ImportReport {
            errors: outcome.errors,
            ..ImportReport::default()
        };
        let results = outcome.results;

        if results.has_primaries() {
            let built = self.build_bundles(&results, decisions, options);
            report.added = built.bundles.len();
            report.errors.extend(built.errors);
            report.warnings.extend(built.warnings);
            bundles.extend(built.bundles);
        } else if !results.is_empty() && !bundles.is_empty() {
            report.backfilled = self.backfill(bundles, &results, decisions, options);
        } else {
            tracing::info!("No relevant files discovered with provided file list");
            report.no_files_found = true;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::decisions::testing::ScriptedDecisions;
    use crate::external::testing::FakeParser;
    use crate::models::Color;
    use std::fs;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn single_song_fills_every_slot() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();
        let mut bundles = Vec::new();

        let report = engine.import(
            &mut bundles,
            &paths(&["Song.kbp", "Song.mp3", "Song.jpg"]),
            &decisions,
            &AssociationOptions::default(),
        );

        assert_eq!(report.added, 1);
        assert_eq!(bundles.len(), 1);
        let bundle = &bundles[0];
        assert_eq!(normalize(&bundle.primary).as_str(), "song");
        assert_eq!(bundle.audio, Some(PathBuf::from("Song.mp3")));
        assert_eq!(bundle.background, Some(Background::Image("Song.jpg".into())));
        assert_eq!(decisions.choice_count(), 0);
    }

    #[test]
    fn several_candidates_ask_for_a_choice() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new().with_choices([Some(1)]);

        let outcome = engine.associate(&paths(&["Song.kbp", "Song_01.wav", "Song_02.wav"]), &decisions);
        assert_eq!(
            outcome
                .results
                .search(FileCategory::Audio, &normalize(Path::new("Song.kbp")))
                .len(),
            2
        );

        let built = engine.build_bundles(&outcome.results, &decisions, &AssociationOptions::default());
        assert_eq!(decisions.choice_count(), 1);
        // Equal scores list the greater key first.
        assert_eq!(
            decisions.asked_choices.lock()[0],
            vec![PathBuf::from("Song_02.wav"), PathBuf::from("Song_01.wav")]
        );
        assert_eq!(built.bundles[0].audio, Some(PathBuf::from("Song_01.wav")));
    }

    #[test]
    fn declined_choice_leaves_slot_empty() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new().with_choices([None]);

        let outcome = engine.associate(&paths(&["Song.kbp", "Song_01.wav", "Song_02.wav"]), &decisions);
        let built = engine.build_bundles(&outcome.results, &decisions, &AssociationOptions::default());
        assert_eq!(built.bundles[0].audio, None);
    }

    #[test]
    fn single_primary_takes_unmatched_files() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();

        let outcome = engine.associate(&paths(&["Song.kbp", "track.flac"]), &decisions);
        let built = engine.build_bundles(&outcome.results, &decisions, &AssociationOptions::default());
        assert_eq!(built.bundles[0].audio, Some(PathBuf::from("track.flac")));
    }

    #[test]
    fn single_background_serves_every_primary() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();

        let outcome = engine.associate(
            &paths(&["Alpha.kbp", "Omega.ass", "Alpha.mp3", "stage.png"]),
            &decisions,
        );
        let built = engine.build_bundles(&outcome.results, &decisions, &AssociationOptions::default());
        assert_eq!(built.bundles.len(), 2);
        for bundle in &built.bundles {
            assert_eq!(bundle.background, Some(Background::Image("stage.png".into())));
        }
        let omega = built
            .bundles
            .iter()
            .find(|b| b.primary == Path::new("Omega.ass"))
            .unwrap();
        assert_eq!(omega.primary_kind, FileCategory::Subtitle);
        assert_eq!(omega.audio, None);
    }

    #[test]
    fn skip_backgrounds_leaves_slot_for_manual_fill() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();

        let outcome = engine.associate(&paths(&["Song.ass", "Song.png"]), &decisions);
        let options = AssociationOptions {
            skip_backgrounds: true,
        };
        let built = engine.build_bundles(&outcome.results, &decisions, &options);
        assert_eq!(built.bundles[0].background, None);
    }

    #[test]
    fn project_hints_fill_empty_slots() {
        let parser = FakeParser::new()
            .with_audio("song.kbp", "media/song.ogg")
            .with_palette("song.kbp", Color::rgb(0, 0, 255));
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();

        let outcome = engine.associate(&paths(&["/k/song.kbp"]), &decisions);
        let built = engine.build_bundles(&outcome.results, &decisions, &AssociationOptions::default());
        let bundle = &built.bundles[0];
        assert_eq!(bundle.audio, Some(PathBuf::from("/k/media/song.ogg")));
        assert_eq!(bundle.background, Some(Background::Color(Color::rgb(0, 0, 255))));
    }

    #[test]
    fn unparsable_project_is_skipped_with_error() {
        let parser = FakeParser::new().failing("bad.kbp");
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();

        let outcome = engine.associate(&paths(&["bad.kbp", "good.kbp"]), &decisions);
        let built = engine.build_bundles(&outcome.results, &decisions, &AssociationOptions::default());
        assert_eq!(built.bundles.len(), 1);
        assert_eq!(built.errors.len(), 1);
        assert_eq!(built.errors[0].path(), Path::new("bad.kbp"));
    }

    #[test]
    fn shared_key_primaries_are_surfaced() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new().with_choices([Some(1)]);

        let outcome = engine.associate(&paths(&["a/Song.kbp", "b/song.kbp"]), &decisions);
        let built = engine.build_bundles(&outcome.results, &decisions, &AssociationOptions::default());
        assert_eq!(built.bundles.len(), 1);
        assert_eq!(built.bundles[0].primary, PathBuf::from("b/song.kbp"));
        assert_eq!(built.warnings.len(), 1);
        assert!(built.warnings[0].contains("a/Song.kbp"));
    }

    #[test]
    fn nothing_relevant_reports_no_files() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();
        let mut bundles = Vec::new();

        let report = engine.import(
            &mut bundles,
            &paths(&["notes.pdf", "Song.mp3"]),
            &decisions,
            &AssociationOptions::default(),
        );
        assert!(report.no_files_found);
        assert!(bundles.is_empty());
    }

    #[test]
    fn second_pass_backfills_existing_bundles() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();
        let mut bundles = vec![
            TrackBundle::new("Alpha.kbp", FileCategory::Project),
            TrackBundle::new("Omega.kbp", FileCategory::Project).with_audio("old.mp3"),
        ];

        let report = engine.import(
            &mut bundles,
            &paths(&["Alpha.flac", "Omega.wav"]),
            &decisions,
            &AssociationOptions::default(),
        );

        assert_eq!(report.added, 0);
        assert_eq!(report.backfilled, 1);
        assert_eq!(bundles[0].audio, Some(PathBuf::from("Alpha.flac")));
        // Replacement declined.
        assert_eq!(bundles[1].audio, Some(PathBuf::from("old.mp3")));
        assert_eq!(decisions.asked_replace.lock().len(), 1);
    }

    #[test]
    fn backfill_replaces_when_confirmed() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new().with_replace(true);
        let mut bundles = vec![TrackBundle::new("Omega.kbp", FileCategory::Project).with_audio("old.mp3")];

        let outcome = engine.associate(&paths(&["Omega.wav"]), &decisions);
        let filled = engine.backfill(
            &mut bundles,
            &outcome.results,
            &decisions,
            &AssociationOptions::default(),
        );
        assert_eq!(filled, 1);
        assert_eq!(bundles[0].audio, Some(PathBuf::from("Omega.wav")));
    }

    #[test]
    fn lone_backfill_file_asks_which_bundle() {
        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new().with_choices([Some(1)]);
        let mut bundles = vec![
            TrackBundle::new("Alpha.kbp", FileCategory::Project),
            TrackBundle::new("Omega.kbp", FileCategory::Project),
        ];

        let outcome = engine.associate(&paths(&["unrelated.png"]), &decisions);
        engine.backfill(&mut bundles, &outcome.results, &decisions, &AssociationOptions::default());
        assert_eq!(bundles[0].background, None);
        assert_eq!(bundles[1].background, Some(Background::Image("unrelated.png".into())));
    }

    #[test]
    fn folders_follow_directory_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        let third = dir.path().join("third");
        for (folder, file) in [(&first, "a.kbp"), (&second, "b.kbp"), (&third, "c.kbp")] {
            fs::create_dir_all(folder.join("nested")).unwrap();
            fs::write(folder.join("nested").join(file), "x").unwrap();
        }

        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new()
            .with_directories([DirectoryDecision::Skip, DirectoryDecision::Always]);

        let outcome = engine.associate(&[first, second, third], &decisions);
        let files = outcome.results.all_files(FileCategory::Project);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.kbp", "c.kbp"]);
        // "Always" stops further prompts.
        assert_eq!(decisions.asked_directories.lock().len(), 2);
    }

    #[test]
    fn never_skips_remaining_folders() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("a.kbp"), "x").unwrap();
        fs::write(second.join("b.kbp"), "x").unwrap();

        let parser = FakeParser::new();
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new().with_directories([DirectoryDecision::Never]);

        let outcome = engine.associate(&[first, second], &decisions);
        assert!(outcome.results.is_empty());
        assert_eq!(decisions.asked_directories.lock().len(), 1);
    }

    #[test]
    fn lyrics_are_converted_to_projects() {
        let dir = tempfile::tempdir().unwrap();
        let lrc = dir.path().join("Song.lrc");
        let broken = dir.path().join("Broken.txt");
        fs::write(&lrc, "[00:01.00]la").unwrap();
        fs::write(&broken, "x").unwrap();

        let parser = FakeParser::new().failing("Broken.txt");
        let engine = AssociationEngine::new(&parser);
        let decisions = ScriptedDecisions::new();

        let outcome = engine.associate(&[lrc, broken], &decisions);
        assert_eq!(
            outcome.results.all_files(FileCategory::Project),
            vec![dir.path().join("Song.kbp")]
        );
        assert!(dir.path().join("Song.kbp").exists());
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(outcome.errors[0], AssociationError::LyricImport { .. }));
    }
}
