use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use inventory::InventoryFile;
use std::path::Path;

use crate::Context;
use crate::config::{self, Environment, FileKind};
use crate::prompt::{Prompter, TerminalPrompter};
use crate::runner::{Runner, SystemRunner, command_exists};
use crate::ui;

const ADHOC_CMD: &str = "ansible";

/// Run ad hoc shell commands against a host set until the operator quits
pub fn run(ctx: &Context) -> Result<()> {
    if !command_exists(ADHOC_CMD) {
        bail!("{ADHOC_CMD} not found in PATH");
    }

    let mut env = Environment::from_process();
    let mut prompter = TerminalPrompter;
    let path = config::resolve_file(&mut env, &mut prompter, &ctx.root, FileKind::Inventory)?;
    let inventory = InventoryFile::read(&path)
        .with_context(|| format!("Failed to read inventory {}", path.display()))?;

    repl(&SystemRunner, &mut prompter, &inventory, &path)
}

/// Ask for a host set, then run every entered line on it with the shell module.
pub fn repl(
    runner: &dyn Runner,
    prompter: &mut dyn Prompter,
    inventory: &InventoryFile,
    path: &Path,
) -> Result<()> {
    let names: Vec<String> = inventory
        .host_set_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        bail!("No host sets in {}", path.display());
    }

    let index = prompter.select("Host set", &names)?;
    let name = names.get(index).context("Host set selection out of range")?;
    let set = inventory.get(name)?;

    ui::header(&format!("{} ({} hosts)", set.name, set.len()));
    for host in set {
        ui::dim(&host.to_string());
    }
    println!("{}", "Enter shell commands, Ctrl-D to quit.".dimmed());

    let inventory_arg = path.to_string_lossy();
    let prompt = format!("{}>", set.name);
    while let Some(line) = prompter.command_line(&prompt)? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        log::debug!("adhoc on {}: {}", set.name, line);
        let ok = runner.run(
            ADHOC_CMD,
            &[&set.name, "-i", &inventory_arg, "-m", "shell", "-a", line],
        )?;
        if !ok {
            ui::warn(&format!("{line:?} failed on some hosts"));
        }
    }
    println!();
    Ok(())
}
