use anyhow::{Context as _, Result};
use colored::Colorize;

use crate::Context;
use crate::git::Git;
use crate::runner::{Runner, SystemRunner};
use crate::tag::ProvisionTag;
use crate::ui;

/// List previous provisioning runs
pub fn run(ctx: &Context) -> Result<()> {
    let runs = provision_runs(&SystemRunner)?;

    if runs.is_empty() {
        if !ctx.quiet {
            ui::info("No provisioning runs tagged yet");
        }
        return Ok(());
    }

    for run in &runs {
        println!("{}", format_run(run));
    }
    Ok(())
}

/// Decoded provisioning tags, in the order git lists them.
pub fn provision_runs(runner: &dyn Runner) -> Result<Vec<ProvisionTag>> {
    let tags = Git::new(runner).tags().context("Failed to list git tags")?;
    Ok(tags.iter().filter_map(|t| ProvisionTag::decode(t)).collect())
}

fn format_run(run: &ProvisionTag) -> String {
    format!(
        "{} {} by {}",
        run.time.format("%FT%T").to_string().yellow(),
        format!("{}@{}", run.playbook, run.inventory).green(),
        run.user.red()
    )
}
