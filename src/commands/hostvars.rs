use anyhow::{Context as _, Result, bail};
use inventory::InventoryFile;
use std::path::Path;

use crate::Context;
use crate::config::{self, Environment, FileKind};
use crate::error::ShovelError;
use crate::prompt::TerminalPrompter;
use crate::runner::{Runner, SystemRunner, command_exists};
use crate::ui;

const INVENTORY_CMD: &str = "ansible-inventory";

/// Print the variables of the first host in the inventory
pub fn run(ctx: &Context) -> Result<()> {
    if !command_exists(INVENTORY_CMD) {
        bail!("{INVENTORY_CMD} not found in PATH");
    }

    let mut env = Environment::from_process();
    let path = config::resolve_file(
        &mut env,
        &mut TerminalPrompter,
        &ctx.root,
        FileKind::Inventory,
    )?;

    let (host, vars) = fetch_hostvars(&SystemRunner, &path)?;
    if !ctx.quiet {
        ui::header(&host);
    }
    print!("{vars}");
    Ok(())
}

/// Fetch the variables of the first host and render them as YAML.
///
/// Returns the host name and the YAML document.
pub fn fetch_hostvars(runner: &dyn Runner, path: &Path) -> Result<(String, String)> {
    let inventory = InventoryFile::read(path)
        .with_context(|| format!("Failed to read inventory {}", path.display()))?;
    let host = inventory
        .first_host()
        .ok_or_else(|| ShovelError::NoHosts(path.to_path_buf()))?;

    let json = runner.capture_checked(
        INVENTORY_CMD,
        &["-i", &path.to_string_lossy(), "--host", &host.name],
    )?;
    let vars: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| ShovelError::parse(format!("hostvars of {}", host.name), e))?;
    let yaml = serde_yaml::to_string(&vars).context("Failed to render hostvars")?;

    Ok((host.name.clone(), yaml))
}
