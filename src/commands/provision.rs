use anyhow::{Context as _, Result, bail};

use crate::Context;
use crate::config::{Environment, ProjectConfig};
use crate::error::{ErrorKind, ShovelError};
use crate::interrupt;
use crate::notify::FlowdockNotifier;
use crate::orchestrator::Orchestrator;
use crate::player::{PLAYBOOK_CMD, PlayOutcome};
use crate::prompt::TerminalPrompter;
use crate::runner::{SystemRunner, command_exists};
use crate::ui;

/// Provision the project in the current directory
pub fn run(ctx: &Context) -> Result<()> {
    if !command_exists(PLAYBOOK_CMD) {
        bail!("{PLAYBOOK_CMD} not found in PATH");
    }

    interrupt::install();

    let project = ProjectConfig::load(&ctx.root).context("Failed to load project config")?;
    let notifier = FlowdockNotifier::from_config(&project.notify);
    if notifier.is_none() {
        log::info!("No notify.api_token configured, team notifications are off");
    }

    let runner = SystemRunner;
    let mut prompter = TerminalPrompter;
    let mut env = Environment::from_process();

    let mut orchestrator = Orchestrator::new(&ctx.root, project, &runner, &mut prompter);
    if let Some(notifier) = &notifier {
        orchestrator = orchestrator.with_notifier(notifier);
    }

    let report = orchestrator.provision(&mut env).inspect_err(|e| {
        log::debug!("run aborted with {:?} error", e.kind());
        if e.kind() == ErrorKind::GitState {
            ui::dim("Fix the checkout and run again, the run variables are cached.");
        } else if matches!(e, ShovelError::Interrupted(_)) {
            ui::dim("Run stopped, the run variables are cached.");
        }
    })?;
    log::debug!(
        "run finished in state {:?}, safe mode {}",
        report.state,
        report.decision.is_safe()
    );

    if report.outcome == PlayOutcome::Played && !ctx.quiet {
        match &report.tag {
            Some(tag) => ui::success(&format!("Provisioned {tag}")),
            None => ui::success("Provisioning done."),
        }
        if !report.exec_tags.is_empty() {
            ui::dim(&format!("limited to tags: {}", report.exec_tags.join(", ")));
        }
    }
    Ok(())
}
