use crate::error::{Result, ShovelError};
use crate::interrupt;
use std::process::{Command, ExitStatus, Stdio};

/// Captured result of an external command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Executes external commands (`git`, `ansible-playbook`, ...).
///
/// Every call blocks until the child exits.
pub trait Runner {
    /// Run a command and inherit stdio (shows output in real-time).
    /// Returns whether the command exited successfully.
    fn run(&self, cmd: &str, args: &[&str]) -> Result<bool>;

    /// Run a command and capture its output.
    fn capture(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command, failing on a non-zero exit.
    fn run_checked(&self, cmd: &str, args: &[&str]) -> Result<()> {
        log::debug!("run: {} {}", cmd, args.join(" "));
        if self.run(cmd, args)? {
            Ok(())
        } else {
            Err(ShovelError::command(cmd, args, "non-zero exit status"))
        }
    }

    /// Run a command and return its trimmed stdout, failing on a non-zero exit.
    fn capture_checked(&self, cmd: &str, args: &[&str]) -> Result<String> {
        log::debug!("capture: {} {}", cmd, args.join(" "));
        let output = self.capture(cmd, args)?;
        if output.success {
            Ok(output.stdout.trim().to_string())
        } else {
            Err(ShovelError::command(cmd, args, output.stderr.trim()))
        }
    }
}

/// Runner backed by real child processes.
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<bool> {
        interrupt::check(cmd, args)?;
        let status = Command::new(cmd)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| ShovelError::command(cmd, args, format!("failed to execute: {e}")))?;
        check_interrupted(cmd, args, status)?;
        Ok(status.success())
    }

    fn capture(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        interrupt::check(cmd, args)?;
        let output = Command::new(cmd)
            .args(args)
            .output()
            .map_err(|e| ShovelError::command(cmd, args, format!("failed to execute: {e}")))?;
        check_interrupted(cmd, args, output.status)?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// A child killed by SIGINT, or any child once Ctrl-C was pressed, ends the
/// run instead of counting as a failed command.
fn check_interrupted(cmd: &str, args: &[&str], status: ExitStatus) -> Result<()> {
    if killed_by_interrupt(status) {
        return Err(ShovelError::interrupted(cmd, args));
    }
    interrupt::check(cmd, args)
}

#[cfg(unix)]
fn killed_by_interrupt(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    const SIGINT: i32 = 2;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: ExitStatus) -> bool {
    false
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
