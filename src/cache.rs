//! Argument cache.
//!
//! When a provisioning run stops before the playbook was played, the
//! variables it resolved are written to `.shovel-cache`. The next run offers
//! them for reuse and consumes the file whether or not the offer is taken.
//!
//! The file is only ever created if absent; there is no locking, so two
//! concurrent runs in the same directory race on it.

use crate::config::{EnvVar, Environment};
use crate::error::{Result, ShovelError};
use crate::prompt::Prompter;
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Cache file name, relative to the project root
pub const CACHE_FILE: &str = ".shovel-cache";

/// Cached variable name to value.
pub type CacheRecord = BTreeMap<String, String>;

pub struct ArgumentCache {
    path: PathBuf,
}

impl ArgumentCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The cache file of the project at `root`.
    pub fn in_dir(root: &Path) -> Self {
        Self::new(root.join(CACHE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the cache, or `None` if there is no cache file.
    pub fn load(&self) -> Result<Option<Environment>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: CacheRecord = serde_json::from_slice(&bytes)
            .map_err(|e| ShovelError::parse(format!("cache {}", self.path.display()), e))?;

        let env = Environment::from_pairs(record)?;
        if let Some(var) = EnvVar::ALL
            .into_iter()
            .find(|var| !var.is_cached() && env.is_set(*var))
        {
            return Err(ShovelError::UnsupportedVariable(var.name().to_string()));
        }

        log::debug!("Loaded argument cache from {}", self.path.display());
        Ok(Some(env))
    }

    /// Write `record` unless a cache file already exists.
    ///
    /// Returns whether the file was written.
    pub fn store(&self, record: &CacheRecord) -> Result<bool> {
        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| ShovelError::parse("argument cache", e))?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::debug!("Argument cache already present, not overwriting");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&content)?;

        log::debug!("Saved argument cache to {}", self.path.display());
        Ok(true)
    }

    /// Delete the cache file if present.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::debug!("Removed argument cache {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Offer cached variables to the operator and merge them into `env` on
    /// agreement. The cache file is deleted either way.
    ///
    /// Returns whether cached variables were merged.
    pub fn offer(&self, env: &mut Environment, prompter: &mut dyn Prompter) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        let cached = match self.load() {
            Ok(Some(cached)) => cached,
            Ok(None) => return Ok(false),
            Err(e) => {
                crate::ui::warn(&format!("Ignoring unreadable argument cache: {e}"));
                self.remove()?;
                return Ok(false);
            }
        };

        println!("Found cached variables:");
        for line in format_record(&cached.cacheable()) {
            println!("{}", line.yellow());
        }

        let reuse = prompter.confirm("Use cached variables?");
        self.remove()?;

        if reuse? {
            env.merge(&cached);
            return Ok(true);
        }
        Ok(false)
    }

    /// Settle the cache at the end of a run.
    ///
    /// A run that played leaves no cache behind; any other run records its
    /// variables unless a cache is already there.
    pub fn finalize(&self, record: &CacheRecord, played: bool) -> Result<()> {
        if played {
            return self.remove();
        }
        if self.store(record)? {
            crate::ui::info(&format!(
                "Saved run variables to {} for the next attempt",
                self.path().display()
            ));
        }
        Ok(())
    }
}

/// Lines of `name: value` with names right-aligned.
pub fn format_record(record: &CacheRecord) -> Vec<String> {
    let width = record.keys().map(String::len).max().unwrap_or(0);
    record
        .iter()
        .map(|(name, value)| format!("{name:>width$}: {value}"))
        .collect()
}

/// Settles the argument cache when dropped.
///
/// Created at the start of a run; keeps the latest resolved variables and
/// whether the playbook was played. Dropping it (on success, on an error
/// return, or while unwinding) calls [`ArgumentCache::finalize`].
pub struct CacheGuard<'a> {
    cache: &'a ArgumentCache,
    record: CacheRecord,
    played: bool,
    settled: bool,
}

impl<'a> CacheGuard<'a> {
    pub fn new(cache: &'a ArgumentCache) -> Self {
        Self {
            cache,
            record: CacheRecord::new(),
            played: false,
            settled: false,
        }
    }

    /// Remember the cacheable variables of `env`.
    pub fn record(&mut self, env: &Environment) {
        self.record = env.cacheable();
    }

    pub fn mark_played(&mut self) {
        self.played = true;
    }

    /// Settle now, reporting errors instead of only logging them.
    pub fn finish(mut self) -> Result<()> {
        self.settled = true;
        self.cache.finalize(&self.record, self.played)
    }
}

impl Drop for CacheGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Err(e) = self.cache.finalize(&self.record, self.played) {
            log::warn!("Failed to settle argument cache: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Answer, ScriptedPrompter};

    fn env(pairs: &[(&str, &str)]) -> Environment {
        Environment::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        let vars = env(&[("USER", "alice"), ("PLAYBOOK", "site")]);

        assert!(cache.store(&vars.cacheable()).unwrap());
        assert_eq!(cache.load().unwrap(), Some(vars));
    }

    #[test]
    fn test_store_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());

        assert!(cache.store(&env(&[("USER", "first")]).cacheable()).unwrap());
        assert!(!cache.store(&env(&[("USER", "second")]).cacheable()).unwrap());

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.get(EnvVar::User), Some("first"));
    }

    #[cfg(unix)]
    #[test]
    fn test_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        cache.store(&CacheRecord::new()).unwrap();

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_rejects_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        fs::write(cache.path(), r#"{"HOME": "/root"}"#).unwrap();

        assert!(matches!(
            cache.load(),
            Err(ShovelError::UnsupportedVariable(name)) if name == "HOME"
        ));

        fs::write(cache.path(), r#"{"BRANCH": "main"}"#).unwrap();
        assert!(matches!(
            cache.load(),
            Err(ShovelError::UnsupportedVariable(name)) if name == "BRANCH"
        ));
    }

    #[test]
    fn test_offer_accepted_merges_and_consumes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        cache
            .store(&env(&[("PLAYBOOK", "site"), ("INVENTORY", "staging")]).cacheable())
            .unwrap();

        let mut current = env(&[("USER", "alice"), ("PLAYBOOK", "other")]);
        let mut prompter = ScriptedPrompter::new([Answer::Confirm(true)]);

        assert!(cache.offer(&mut current, &mut prompter).unwrap());
        assert_eq!(current.get(EnvVar::Playbook), Some("site"));
        assert_eq!(current.get(EnvVar::Inventory), Some("staging"));
        assert_eq!(current.get(EnvVar::User), Some("alice"));
        assert!(!cache.exists());
    }

    #[test]
    fn test_offer_declined_still_consumes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        cache.store(&env(&[("PLAYBOOK", "site")]).cacheable()).unwrap();

        let mut current = Environment::new();
        let mut prompter = ScriptedPrompter::new([Answer::Confirm(false)]);

        assert!(!cache.offer(&mut current, &mut prompter).unwrap());
        assert_eq!(current.get(EnvVar::Playbook), None);
        assert!(!cache.exists());
    }

    #[test]
    fn test_offer_without_cache_asks_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        let mut prompter = ScriptedPrompter::default();

        assert!(!cache.offer(&mut Environment::new(), &mut prompter).unwrap());
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_offer_discards_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        fs::write(cache.path(), b"\x04\x08{garbage").unwrap();

        let mut prompter = ScriptedPrompter::default();
        assert!(!cache.offer(&mut Environment::new(), &mut prompter).unwrap());
        assert!(!cache.exists());
    }

    #[test]
    fn test_guard_writes_on_drop_when_not_played() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());

        {
            let mut guard = CacheGuard::new(&cache);
            guard.record(&env(&[("USER", "alice"), ("BRANCH", "main")]));
        }

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.cacheable(), env(&[("USER", "alice")]).cacheable());
    }

    #[test]
    fn test_guard_leaves_no_cache_when_played() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());
        cache.store(&env(&[("USER", "stale")]).cacheable()).unwrap();

        let mut guard = CacheGuard::new(&cache);
        guard.record(&env(&[("USER", "alice")]));
        guard.mark_played();
        guard.finish().unwrap();

        assert!(!cache.exists());
    }

    #[test]
    fn test_guard_runs_during_unwind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArgumentCache::in_dir(dir.path());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = CacheGuard::new(&cache);
            guard.record(&env(&[("INVENTORY", "staging")]));
            panic!("interrupted");
        }));

        assert!(result.is_err());
        assert!(cache.exists());
    }

    #[test]
    fn test_format_record_aligns_names() {
        let record = env(&[("USER", "alice"), ("UNSAFE_ARGS", "-e x=1")]).cacheable();
        assert_eq!(
            format_record(&record),
            vec![
                "UNSAFE_ARGS: -e x=1".to_string(),
                "       USER: alice".to_string()
            ]
        );
    }
}
