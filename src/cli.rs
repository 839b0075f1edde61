use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "shovel")]
#[command(version)]
#[command(about = "Provision infrastructure with Ansible playbooks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sync the release branch, play, tag the run and notify the team
    ///
    /// Reads USER, VERBOSE, PREVIEW, UNSAFE_ARGS, PLAYBOOK, INVENTORY and
    /// BRANCH from the environment and asks for anything missing.
    Provision,

    /// List previous provisioning runs
    #[command(alias = "provision:list")]
    List,

    /// Run ad hoc shell commands against a host set
    #[command(alias = "provision:command")]
    Command,

    /// Show the variables of the first host in the inventory
    #[command(alias = "provision:hostvars")]
    Hostvars,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
