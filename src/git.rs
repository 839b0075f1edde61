//! Git operations and the release-branch sync guard.

use crate::error::{Result, ShovelError};
use crate::runner::Runner;
use crate::safety::SafeModeDecision;
use crate::ui;

/// Remote that release branches and tags are synced with
pub const REMOTE: &str = "origin";

/// Thin wrapper over the `git` CLI.
pub struct Git<'a> {
    runner: &'a dyn Runner,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn Runner) -> Self {
        Self { runner }
    }

    pub fn current_branch(&self) -> Result<String> {
        self.runner
            .capture_checked("git", &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Tracked files with uncommitted modifications.
    pub fn modified_files(&self) -> Result<Vec<String>> {
        let output = self.runner.capture_checked("git", &["ls-files", "-m"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn pull(&self, branch: &str) -> Result<()> {
        self.runner.run_checked("git", &["pull", REMOTE, branch])
    }

    pub fn push(&self, branch: &str) -> Result<()> {
        self.runner.run_checked("git", &["push", REMOTE, branch])
    }

    pub fn head_sha(&self) -> Result<String> {
        self.runner.capture_checked("git", &["rev-parse", "HEAD"])
    }

    /// All tag names, in the order `git tag` prints them.
    pub fn tags(&self) -> Result<Vec<String>> {
        let output = self.runner.capture_checked("git", &["tag"])?;
        Ok(output.lines().map(|l| l.trim().to_string()).collect())
    }

    /// Create `tag` at HEAD and force-push it.
    pub fn publish_tag(&self, tag: &str) -> Result<()> {
        self.runner.run_checked("git", &["tag", tag])?;
        self.runner.run_checked("git", &["push", REMOTE, "-f", tag])
    }
}

/// Result of [`GitSyncGuard::enforce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not in safe mode, nothing checked
    Skipped,
    /// Branch verified clean and synced with the remote
    Synced,
}

/// Makes sure a safe-mode run provisions exactly what is on the release
/// branch.
pub struct GitSyncGuard<'a> {
    git: Git<'a>,
    release_branch: &'a str,
}

impl<'a> GitSyncGuard<'a> {
    pub fn new(runner: &'a dyn Runner, release_branch: &'a str) -> Self {
        Self {
            git: Git::new(runner),
            release_branch,
        }
    }

    /// Check branch and working tree, then pull and push the release branch.
    /// Does nothing outside safe mode.
    pub fn enforce(&self, decision: &SafeModeDecision) -> Result<SyncOutcome> {
        if !decision.is_safe() {
            log::debug!("Not in safe mode, skipping git sync");
            return Ok(SyncOutcome::Skipped);
        }

        let branch = self.git.current_branch()?;
        if branch != self.release_branch {
            return Err(ShovelError::WrongBranch {
                expected: self.release_branch.to_string(),
                actual: branch,
            });
        }
        ui::success(&format!(
            "Branch {} is checked out, nice!",
            self.release_branch
        ));

        let modified = self.git.modified_files()?;
        if !modified.is_empty() {
            return Err(ShovelError::DirtyTree { files: modified });
        }
        ui::success("No modified files, good job!");

        self.git.pull(self.release_branch)?;
        self.git.push(self.release_branch)?;
        Ok(SyncOutcome::Synced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::{DecisionSource, SafeMode};
    use crate::testing::RecordingRunner;

    fn decision(safe: bool) -> SafeModeDecision {
        SafeModeDecision {
            declared: SafeMode::Undetermined,
            source: DecisionSource::InventoryName,
            safe,
        }
    }

    fn runner(branch: &str, modified: &str) -> RecordingRunner {
        RecordingRunner::new()
            .respond("git rev-parse --abbrev-ref HEAD", &format!("{branch}\n"))
            .respond("git ls-files -m", modified)
    }

    #[test]
    fn test_safe_clean_branch_syncs() {
        let runner = runner("master", "");
        let guard = GitSyncGuard::new(&runner, "master");

        assert_eq!(guard.enforce(&decision(true)).unwrap(), SyncOutcome::Synced);
        assert!(runner.ran("git pull origin master"));
        assert!(runner.ran("git push origin master"));
    }

    #[test]
    fn test_wrong_branch_is_fatal() {
        let runner = runner("feature/x", "");
        let guard = GitSyncGuard::new(&runner, "master");

        let err = guard.enforce(&decision(true)).unwrap_err();
        assert!(matches!(err, ShovelError::WrongBranch { ref expected, .. } if expected == "master"));
        assert!(!runner.ran_matching("git pull"));
    }

    #[test]
    fn test_dirty_tree_blocks_and_lists_files() {
        let runner = runner("master", "site.yml\nroles/web/tasks/main.yml\n");
        let guard = GitSyncGuard::new(&runner, "master");

        match guard.enforce(&decision(true)).unwrap_err() {
            ShovelError::DirtyTree { files } => {
                assert_eq!(files, vec!["site.yml", "roles/web/tasks/main.yml"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!runner.ran_matching("git pull"));
        assert!(!runner.ran_matching("git push"));
    }

    #[test]
    fn test_dirty_tree_blocks_on_wrong_branch_too() {
        let runner = runner("develop", "site.yml\n");
        let guard = GitSyncGuard::new(&runner, "master");
        assert!(guard.enforce(&decision(true)).is_err());
    }

    #[test]
    fn test_unsafe_mode_ignores_dirty_tree() {
        let runner = runner("develop", "site.yml\n");
        let guard = GitSyncGuard::new(&runner, "master");

        assert_eq!(
            guard.enforce(&decision(false)).unwrap(),
            SyncOutcome::Skipped
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_pull_failure_aborts_before_push() {
        let runner = runner("master", "").fail_on("git pull origin master");
        let guard = GitSyncGuard::new(&runner, "master");

        let err = guard.enforce(&decision(true)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ExternalCommand);
        assert!(!runner.ran("git push origin master"));
    }

    #[test]
    fn test_publish_tag() {
        let runner = RecordingRunner::new();
        Git::new(&runner).publish_tag("provision_x").unwrap();
        assert_eq!(
            runner.calls(),
            vec!["git tag provision_x", "git push origin -f provision_x"]
        );
    }

    #[test]
    fn test_tags_keeps_git_order() {
        let runner = RecordingRunner::new().respond("git tag", "v1\nprovision_b\nprovision_a\n");
        assert_eq!(
            Git::new(&runner).tags().unwrap(),
            vec!["v1", "provision_b", "provision_a"]
        );
    }
}
