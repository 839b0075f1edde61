use crate::error::{Result, ShovelError};
use crate::prompt::{self, Prompter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default release branch when `BRANCH` is not set
pub const DEFAULT_BRANCH: &str = "master";

/// Project config file, looked up in the project root
pub const PROJECT_FILE: &str = "shovel.toml";

pub const PLAYBOOK_DIR: &str = "playbooks";
pub const PLAYBOOK_EXT: &str = ".yml";
pub const INVENTORY_DIR: &str = "inventories";
pub const INVENTORY_EXT: &str = ".ini";

// ============================================================================
// Environment Variables
// ============================================================================

/// The environment variables a run is allowed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnvVar {
    User,
    Verbose,
    Preview,
    UnsafeArgs,
    Playbook,
    Inventory,
    Branch,
}

impl EnvVar {
    pub const ALL: [EnvVar; 7] = [
        EnvVar::User,
        EnvVar::Verbose,
        EnvVar::Preview,
        EnvVar::UnsafeArgs,
        EnvVar::Playbook,
        EnvVar::Inventory,
        EnvVar::Branch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnvVar::User => "USER",
            EnvVar::Verbose => "VERBOSE",
            EnvVar::Preview => "PREVIEW",
            EnvVar::UnsafeArgs => "UNSAFE_ARGS",
            EnvVar::Playbook => "PLAYBOOK",
            EnvVar::Inventory => "INVENTORY",
            EnvVar::Branch => "BRANCH",
        }
    }

    /// Whether the variable is carried over between runs by the argument cache.
    pub fn is_cached(self) -> bool {
        !matches!(self, EnvVar::Branch)
    }
}

impl fmt::Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EnvVar {
    type Err = ShovelError;

    fn from_str(s: &str) -> Result<Self> {
        EnvVar::ALL
            .into_iter()
            .find(|var| var.name() == s)
            .ok_or_else(|| ShovelError::UnsupportedVariable(s.to_string()))
    }
}

/// Snapshot of the supported environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<EnvVar, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every supported variable from the process environment.
    pub fn from_process() -> Self {
        let vars = EnvVar::ALL
            .into_iter()
            .filter_map(|var| std::env::var(var.name()).ok().map(|value| (var, value)))
            .collect();
        Self { vars }
    }

    /// Build from name/value pairs, rejecting unsupported names.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut env = Self::new();
        for (name, value) in pairs {
            env.set(name.as_ref().parse()?, value);
        }
        Ok(env)
    }

    /// Get a variable; empty values count as unset.
    pub fn get(&self, var: EnvVar) -> Option<&str> {
        self.vars
            .get(&var)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_set(&self, var: EnvVar) -> bool {
        self.vars.contains_key(&var)
    }

    pub fn set(&mut self, var: EnvVar, value: impl Into<String>) {
        self.vars.insert(var, value.into());
    }

    /// Overlay cached values on top of this environment.
    pub fn merge(&mut self, other: &Environment) {
        for (var, value) in &other.vars {
            self.vars.insert(*var, value.clone());
        }
    }

    /// The cacheable subset as name/value pairs.
    pub fn cacheable(&self) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .filter(|(var, _)| var.is_cached())
            .map(|(var, value)| (var.name().to_string(), value.clone()))
            .collect()
    }

    fn flag(&self, var: EnvVar) -> bool {
        self.get(var)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .is_some_and(|v| v == 1)
    }
}

// ============================================================================
// Run Config
// ============================================================================

/// Everything a provisioning run needs, resolved once up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub playbook: PathBuf,
    pub inventory: PathBuf,
    pub user: String,
    pub verbose: bool,
    pub preview: bool,
    pub unsafe_args: Option<String>,
    pub branch: String,
}

impl RunConfig {
    /// Resolve the run configuration, prompting for a playbook or inventory
    /// that the environment does not name.
    ///
    /// Interactively chosen values are written back into `env` so the
    /// argument cache can offer them next time.
    pub fn resolve(
        env: &mut Environment,
        prompter: &mut dyn Prompter,
        root: &Path,
    ) -> Result<Self> {
        let playbook = resolve_file(env, prompter, root, FileKind::Playbook)?;
        let inventory = resolve_file(env, prompter, root, FileKind::Inventory)?;
        let user = env
            .get(EnvVar::User)
            .ok_or(ShovelError::MissingVariable("USER"))?
            .to_string();

        let config = Self {
            playbook,
            inventory,
            user,
            verbose: env.flag(EnvVar::Verbose),
            preview: env.flag(EnvVar::Preview),
            unsafe_args: env.get(EnvVar::UnsafeArgs).map(str::to_string),
            branch: env
                .get(EnvVar::Branch)
                .unwrap_or(DEFAULT_BRANCH)
                .to_string(),
        };
        log::debug!("resolved run config: {config:?}");
        Ok(config)
    }

    /// `-vvvv` when maximum verbosity was requested.
    pub fn verbosity_flag(&self) -> Option<&'static str> {
        self.verbose.then_some("-vvvv")
    }

    /// Operator-supplied extra arguments, split on whitespace.
    pub fn unsafe_args(&self) -> Vec<String> {
        self.unsafe_args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FileKind {
    Playbook,
    Inventory,
}

impl FileKind {
    fn var(self) -> EnvVar {
        match self {
            FileKind::Playbook => EnvVar::Playbook,
            FileKind::Inventory => EnvVar::Inventory,
        }
    }

    fn dir(self) -> &'static str {
        match self {
            FileKind::Playbook => PLAYBOOK_DIR,
            FileKind::Inventory => INVENTORY_DIR,
        }
    }

    fn ext(self) -> &'static str {
        match self {
            FileKind::Playbook => PLAYBOOK_EXT,
            FileKind::Inventory => INVENTORY_EXT,
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            FileKind::Playbook => "Playbook",
            FileKind::Inventory => "Inventory",
        }
    }
}

/// Resolve a playbook or inventory path from the environment or the operator.
pub fn resolve_file(
    env: &mut Environment,
    prompter: &mut dyn Prompter,
    root: &Path,
    kind: FileKind,
) -> Result<PathBuf> {
    let var = kind.var();
    let value = match env.get(var) {
        Some(value) => value.to_string(),
        None => {
            let candidates = prompt::candidates(root, kind.dir(), kind.ext());
            loop {
                let picked = prompter.pick_file(kind.prompt(), &candidates)?;
                let picked = picked.trim().to_string();
                if picked.is_empty() || root.join(&picked).exists() {
                    break picked;
                }
                log::debug!("{} does not exist, asking again", picked);
            }
        }
    };

    if value.is_empty() {
        return Err(ShovelError::MissingVariable(var.name()));
    }
    env.set(var, value.clone());

    let path = expand(&value, root, kind.dir(), kind.ext());
    if !path.exists() {
        return Err(ShovelError::MissingFile(path));
    }
    Ok(path)
}

/// Turn a short name or path into a full path.
///
/// Values containing `/` are used as paths (with `~` expanded); bare names
/// are looked up in `dir`. A missing extension gets `ext`.
pub fn expand(value: &str, root: &Path, dir: &str, ext: &str) -> PathBuf {
    let mut path = if value.contains('/') {
        let expanded = PathBuf::from(shellexpand::tilde(value).as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            root.join(expanded)
        }
    } else {
        root.join(dir).join(value)
    };

    if path.extension().is_none() {
        path.set_extension(ext.trim_start_matches('.'));
    }
    path
}

// ============================================================================
// Project Config
// ============================================================================

/// Per-repository settings from `shovel.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// GitHub repository as `owner/name`, used for commit and tag links
    #[serde(default)]
    pub github_repo: Option<String>,

    #[serde(default = "default_github_host")]
    pub github_host: String,

    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Team inbox API token; notifications are skipped without one
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    #[serde(default)]
    pub from_address: Option<String>,
}

fn default_github_host() -> String {
    "https://github.com".to_string()
}

fn default_endpoint() -> String {
    "https://api.flowdock.com/v1/messages/team_inbox".to_string()
}

fn default_source() -> String {
    "ansible".to_string()
}

fn default_from_name() -> String {
    "Provisionaire".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            github_repo: None,
            github_host: default_github_host(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            endpoint: default_endpoint(),
            source: default_source(),
            from_name: default_from_name(),
            from_address: None,
        }
    }
}

impl ProjectConfig {
    /// Load `shovel.toml` from `root`, or defaults if there is none.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_FILE);
        if !path.exists() {
            log::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)?;
        log::debug!("Loaded project config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ShovelError::InvalidConfig(format!("{PROJECT_FILE}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(repo) = &self.github_repo {
            let valid = matches!(
                repo.split_once('/'),
                Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
            );
            if !valid {
                return Err(ShovelError::InvalidConfig(format!(
                    "github_repo must be of format owner/name, got {repo:?}"
                )));
            }
        }
        Ok(())
    }
}
