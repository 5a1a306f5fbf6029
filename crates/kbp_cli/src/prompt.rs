//! Interactive answers on the terminal.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use kbp_core::association::{DecisionProvider, DirectoryDecision};
use kbp_core::models::BundleSlot;

/// Asks every question on stderr and reads the answer from stdin.
///
/// End of input answers with the default of each question.
pub struct TerminalDecisions;

impl TerminalDecisions {
    fn ask(&self, question: &str) -> String {
        eprint!("{} ", question);
        let _ = io::stderr().flush();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => answer.trim().to_lowercase(),
            Err(_) => String::new(),
        }
    }

    fn yes_no(&self, question: &str) -> bool {
        matches!(self.ask(&format!("{} [y/N]", question)).as_str(), "y" | "yes")
    }
}

impl DecisionProvider for TerminalDecisions {
    fn confirm_expand_directory(&self, path: &Path) -> DirectoryDecision {
        let question = format!(
            "Import every file in folder {}? [Y]es/[a]lways/[n]ever/[s]kip",
            path.display()
        );
        parse_directory_answer(&self.ask(&question))
    }

    fn choose_one(&self, candidates: &[PathBuf], prompt: &str) -> Option<PathBuf> {
        eprintln!("{}", prompt);
        for (i, candidate) in candidates.iter().enumerate() {
            eprintln!("  {}) {}", i + 1, candidate.display());
        }
        let answer = self.ask("Number (empty for none):");
        parse_choice(&answer, candidates.len()).map(|i| candidates[i].clone())
    }

    fn confirm_overwrite(&self, path: &Path) -> bool {
        self.yes_no(&format!("{} exists. Overwrite?", path.display()))
    }

    fn confirm_replace(
        &self,
        primary: &Path,
        slot: BundleSlot,
        current: &str,
        replacement: &Path,
    ) -> bool {
        self.yes_no(&format!(
            "{}: replace {:?} {} with {}?",
            primary.display(),
            slot,
            current,
            replacement.display()
        ))
    }
}

fn parse_directory_answer(answer: &str) -> DirectoryDecision {
    match answer {
        "" | "y" | "yes" => DirectoryDecision::Once,
        "a" | "always" => DirectoryDecision::Always,
        "n" | "never" => DirectoryDecision::Never,
        _ => DirectoryDecision::Skip,
    }
}

/// 1-based answer to a 0-based index.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let n: usize = answer.parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}
