//! Playbook execution.

use crate::config::RunConfig;
use crate::error::Result;
use crate::orchestrator::RunState;
use crate::progress;
use crate::prompt::Prompter;
use crate::runner::Runner;
use crate::safety::SafeModeDecision;
use crate::tag::shortname;
use crate::ui;
use colored::Colorize;
use std::collections::BTreeSet;

pub const PLAYBOOK_CMD: &str = "ansible-playbook";

/// Exact answer required before a previewed run is applied
pub const CONFIRM_TOKEN: &str = "YES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Played,
    /// The operator did not confirm after the dry run
    Declined,
}

/// Runs `ansible-playbook` for one resolved configuration.
pub struct Player<'a> {
    runner: &'a dyn Runner,
    config: &'a RunConfig,
    safe: bool,
    tags: Vec<String>,
}

impl<'a> Player<'a> {
    pub fn new(runner: &'a dyn Runner, config: &'a RunConfig, decision: &SafeModeDecision) -> Self {
        Self {
            runner,
            config,
            safe: decision.is_safe(),
            tags: Vec::new(),
        }
    }

    /// Restrict the run to the given execution tags (empty = all tasks).
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Ask `ansible-playbook --list-tags` which tags the playbook declares.
    pub fn declared_tags(&self) -> Result<Vec<String>> {
        let playbook = self.config.playbook.to_string_lossy();
        let inventory = self.config.inventory.to_string_lossy();

        let pb = progress::spinner("Reading playbook tags...");
        let output = self.runner.capture_checked(
            PLAYBOOK_CMD,
            &[&playbook, "-i", &inventory, "--list-tags"],
        );
        progress::finish_clear(&pb);

        Ok(parse_listed_tags(&output?))
    }

    /// Extra arguments appended to the invocation. Always empty in safe mode.
    pub fn extra_args(&self) -> Vec<String> {
        if self.safe {
            Vec::new()
        } else {
            self.config.unsafe_args()
        }
    }

    /// Arguments for `ansible-playbook`.
    pub fn command_args(&self, dry: bool) -> Vec<String> {
        let mut args = vec![
            self.config.playbook.display().to_string(),
            "-i".to_string(),
            self.config.inventory.display().to_string(),
        ];
        if let Some(flag) = self.config.verbosity_flag() {
            args.push(flag.to_string());
        }
        if !self.tags.is_empty() {
            args.push("--tags".to_string());
            args.push(self.tags.join(","));
        }
        args.extend(self.extra_args());
        if dry {
            args.push("--check".to_string());
            args.push("--diff".to_string());
        }
        args
    }

    /// Run the playbook once, as a dry run or for real.
    pub fn play(&self, dry: bool) -> Result<()> {
        let args = self.command_args(dry);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        ui::dim(&format!("{} {}", PLAYBOOK_CMD, args.join(" ")));
        self.runner.run_checked(PLAYBOOK_CMD, &args)
    }

    /// Play, previewing first when requested.
    ///
    /// With preview on, the dry run is followed by a prompt that must be
    /// answered with [`CONFIRM_TOKEN`]; anything else ends the step without
    /// playing.
    pub fn execute(&self, prompter: &mut dyn Prompter, state: &mut RunState) -> Result<PlayOutcome> {
        if self.safe && self.config.unsafe_args.is_some() {
            ui::warn("UNSAFE_ARGS is ignored in safe mode");
        }

        if self.config.preview {
            self.play(true)?;
            state.advance(RunState::PlayedDry);

            let question = format!(
                "Provisioning playbook {:?} with inventory {:?} now?",
                shortname(&self.config.playbook),
                shortname(&self.config.inventory)
            );
            let hint = format!("Type »{CONFIRM_TOKEN}« to proceed!");
            ui::red_box(&[&question, &hint]);

            if prompter.input("Proceed")? != CONFIRM_TOKEN {
                println!("Have it your way, then.");
                return Ok(PlayOutcome::Declined);
            }
        }

        self.play(false)?;
        state.advance(RunState::Played);
        Ok(PlayOutcome::Played)
    }
}

/// Collect the tags from `--list-tags` output (`TASK TAGS: [a, b]` lines).
pub fn parse_listed_tags(output: &str) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for line in output.lines() {
        let Some((_, rest)) = line.split_once("TASK TAGS:") else {
            continue;
        };
        let inner = rest.trim().trim_start_matches('[').trim_end_matches(']');
        tags.extend(
            inner
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
    }
    tags.into_iter().collect()
}

/// Let the operator pick a subset of `available` tags.
///
/// An empty answer selects nothing, which runs every task.
pub fn select_tags(available: &[String], prompter: &mut dyn Prompter) -> Result<Vec<String>> {
    if available.is_empty() {
        return Ok(Vec::new());
    }

    println!("Playbook tags: {}", available.join(" ").cyan());
    let answer = prompter.input("Tags to run (space-separated, empty for all)")?;

    let mut selected: Vec<String> = Vec::new();
    for tag in answer.split_whitespace() {
        if !available.iter().any(|t| t == tag) {
            ui::warn(&format!("Ignoring unknown tag {tag:?}"));
        } else if !selected.iter().any(|t| t == tag) {
            selected.push(tag.to_string());
        }
    }
    Ok(selected)
}
