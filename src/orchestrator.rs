//! The provisioning run.
//!
//! [`Orchestrator::provision`] strings the steps together:
//!
//! 1. `load_argument_cache`: offer variables left behind by an earlier run
//! 2. resolve the [`RunConfig`] and decide safe mode
//! 3. `sync_git`: in safe mode, require a clean and synced release branch
//! 4. `play`: optional dry run and confirmation, then the real run
//! 5. `after_play`: in safe mode, tag the run and notify the team
//!
//! The argument cache is settled by a guard that lives for the whole run, so
//! it is written on every exit path that did not get as far as playing.

use crate::cache::{ArgumentCache, CacheGuard};
use crate::config::{Environment, ProjectConfig, RunConfig};
use crate::error::Result;
use crate::git::{Git, GitSyncGuard, SyncOutcome};
use crate::notify::{self, Notifier, RunSummary};
use crate::player::{self, PlayOutcome, Player};
use crate::prompt::Prompter;
use crate::runner::Runner;
use crate::safety::{self, DecisionSource, SafeMode, SafeModeDecision};
use crate::tag::ProvisionTag;
use crate::ui;
use chrono::Local;
use std::path::PathBuf;
use std::time::Instant;

// ============================================================================
// Run State
// ============================================================================

/// How far a run got. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Initialized,
    Synced,
    PlayedDry,
    Played,
    Tagged,
    Notified,
}

impl RunState {
    /// Move to `next` if it is further along than the current state.
    pub fn advance(&mut self, next: RunState) {
        if next > *self {
            log::debug!("run state {:?} -> {:?}", self, next);
            *self = next;
        }
    }

    /// Whether the playbook was applied for real.
    pub fn has_played(self) -> bool {
        self >= RunState::Played
    }
}

/// What a finished (or declined) run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    pub decision: SafeModeDecision,
    pub outcome: PlayOutcome,
    /// Execution tags the run was limited to
    pub exec_tags: Vec<String>,
    /// Provisioning tag published for the run
    pub tag: Option<String>,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator<'a> {
    root: PathBuf,
    project: ProjectConfig,
    runner: &'a dyn Runner,
    prompter: &'a mut dyn Prompter,
    notifier: Option<&'a dyn Notifier>,
    started: Instant,
    state: RunState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        project: ProjectConfig,
        runner: &'a dyn Runner,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            root: root.into(),
            project,
            runner,
            prompter,
            notifier: None,
            started: Instant::now(),
            state: RunState::Initialized,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn cache(&self) -> ArgumentCache {
        ArgumentCache::in_dir(&self.root)
    }

    /// Repository name used in notifications.
    fn project_name(&self) -> String {
        self.project.github_repo.clone().unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        })
    }

    /// Run the whole provisioning sequence.
    pub fn provision(&mut self, env: &mut Environment) -> Result<RunReport> {
        let cache = self.cache();
        let mut guard = CacheGuard::new(&cache);
        guard.record(env);

        self.load_argument_cache(env)?;
        guard.record(env);

        let resolved = RunConfig::resolve(env, &mut *self.prompter, &self.root);
        guard.record(env);
        let config = resolved?;

        let decision = safety::decide_file(&config.playbook, &config.inventory)?;
        report_decision(&decision);

        self.sync_git(&config, &decision)?;

        let (outcome, exec_tags) = self.play(&config, &decision)?;
        if self.state.has_played() {
            guard.mark_played();
        }

        let tag = match outcome {
            PlayOutcome::Played => self.after_play(&config, &decision, &exec_tags)?,
            PlayOutcome::Declined => None,
        };

        guard.finish()?;
        Ok(RunReport {
            state: self.state,
            decision,
            outcome,
            exec_tags,
            tag,
        })
    }

    /// Offer cached variables from an earlier run. Returns whether they were
    /// taken over into `env`.
    pub fn load_argument_cache(&mut self, env: &mut Environment) -> Result<bool> {
        self.cache().offer(env, &mut *self.prompter)
    }

    pub fn sync_git(
        &mut self,
        config: &RunConfig,
        decision: &SafeModeDecision,
    ) -> Result<SyncOutcome> {
        let outcome = GitSyncGuard::new(self.runner, &config.branch).enforce(decision)?;
        if outcome == SyncOutcome::Synced {
            self.state.advance(RunState::Synced);
        }
        Ok(outcome)
    }

    /// Choose execution tags, then run the playbook.
    pub fn play(
        &mut self,
        config: &RunConfig,
        decision: &SafeModeDecision,
    ) -> Result<(PlayOutcome, Vec<String>)> {
        let player = Player::new(self.runner, config, decision);
        let available = player.declared_tags()?;
        let selected = player::select_tags(&available, &mut *self.prompter)?;
        let player = player.with_tags(selected);

        let outcome = player.execute(&mut *self.prompter, &mut self.state)?;
        Ok((outcome, player.tags().to_vec()))
    }

    /// Tag the run and notify the team. Only done in safe mode.
    ///
    /// Returns the published tag.
    pub fn after_play(
        &mut self,
        config: &RunConfig,
        decision: &SafeModeDecision,
        exec_tags: &[String],
    ) -> Result<Option<String>> {
        if !decision.is_safe() {
            log::debug!("Not in safe mode, not tagging the run");
            return Ok(None);
        }

        let tag = ProvisionTag::new(
            Local::now().naive_local(),
            &config.playbook,
            &config.inventory,
            &config.user,
        )
        .encode();

        Git::new(self.runner).publish_tag(&tag)?;
        ui::success(&format!("Tagged this provisioning run as {tag}"));
        self.state.advance(RunState::Tagged);

        self.notify(config, &tag, exec_tags);
        Ok(Some(tag))
    }

    /// Notification failures are reported, never returned.
    fn notify(&mut self, config: &RunConfig, tag: &str, exec_tags: &[String]) {
        let elapsed = self.started.elapsed();
        let Some(notifier) = self.notifier else {
            log::debug!("No notifier configured");
            println!("Total runtime was {}.", notify::format_duration(elapsed));
            return;
        };

        let sha = match Git::new(self.runner).head_sha() {
            Ok(sha) => sha,
            Err(e) => {
                ui::warn(&format!("Could not notify the team: {e}"));
                return;
            }
        };

        let summary = RunSummary {
            config,
            tag,
            sha: &sha,
            elapsed,
            exec_tags,
        };
        let notification = notify::build_notification(&self.project, &self.project_name(), &summary);

        match notifier.notify(&notification) {
            Ok(()) => {
                ui::success("Notified the team.");
                self.state.advance(RunState::Notified);
            }
            Err(e) => ui::warn(&format!("Could not notify the team: {e}")),
        }
        println!("Total runtime was {}.", notify::format_duration(elapsed));
    }
}

fn report_decision(decision: &SafeModeDecision) {
    let source = match (decision.source, decision.declared) {
        (DecisionSource::PlaybookVars, SafeMode::ExplicitlyUnsafe) => "every play sets safe_mode: false",
        (DecisionSource::PlaybookVars, _) => "every play sets safe_mode",
        (DecisionSource::InventoryName, _) => "inventory name",
    };
    if decision.is_safe() {
        ui::info(&format!("Safe mode is on ({source})"));
    } else {
        ui::warn(&format!("Safe mode is off ({source})"));
    }
}
