//! Operator interaction.
//!
//! The engine never reads the terminal directly; every question goes through
//! a [`Prompter`], so runs can be scripted in tests.

use crate::error::Result;
use dialoguer::{Confirm, Input, Select};
use std::io::ErrorKind;
use std::path::Path;
use walkdir::WalkDir;

/// Source of operator answers.
pub trait Prompter {
    /// Choose a file, offering `candidates` (paths relative to the project root).
    fn pick_file(&mut self, message: &str, candidates: &[String]) -> Result<String>;

    /// Ask a yes/no question.
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Read a single line of free text (may be empty).
    fn input(&mut self, message: &str) -> Result<String>;

    /// Choose one of `items`, returning its index.
    fn select(&mut self, message: &str, items: &[String]) -> Result<usize>;

    /// Read a command line for the ad hoc REPL. `None` means the operator
    /// ended the session (EOF or interrupt).
    fn command_line(&mut self, message: &str) -> Result<Option<String>>;
}

/// Prompter reading from the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn pick_file(&mut self, message: &str, candidates: &[String]) -> Result<String> {
        if candidates.is_empty() {
            let path: String = Input::new().with_prompt(message).interact_text()?;
            return Ok(path.trim().to_string());
        }

        let index = Select::new()
            .with_prompt(message)
            .items(candidates)
            .default(0)
            .interact()?;
        Ok(candidates[index].clone())
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()?)
    }

    fn input(&mut self, message: &str) -> Result<String> {
        let line: String = Input::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()?;
        Ok(line)
    }

    fn select(&mut self, message: &str, items: &[String]) -> Result<usize> {
        Ok(Select::new()
            .with_prompt(message)
            .items(items)
            .default(0)
            .interact()?)
    }

    fn command_line(&mut self, message: &str) -> Result<Option<String>> {
        let result: std::result::Result<String, dialoguer::Error> = Input::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text();

        match result {
            Ok(line) => Ok(Some(line)),
            Err(dialoguer::Error::IO(e))
                if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::UnexpectedEof) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// List files under `root/dir` with extension `ext`, as sorted paths
/// relative to `root`.
pub fn candidates(root: &Path, dir: &str, ext: &str) -> Vec<String> {
    let ext = ext.trim_start_matches('.');
    let mut found: Vec<String> = WalkDir::new(root.join(dir))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|e| e == ext))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.display().to_string())
        })
        .collect();
    found.sort();
    found
}
