//! Safe-mode decision.
//!
//! A run is in safe mode when it may touch production-like systems. Safe
//! mode forces the release branch to be clean and synced and disables
//! `UNSAFE_ARGS`.
//!
//! Plays opt out with `vars: { safe_mode: false }`. Only when the playbook
//! says nothing conclusive does the inventory name decide.

use crate::error::{Result, ShovelError};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// What the playbook itself declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeMode {
    /// Every play sets `safe_mode: false`
    ExplicitlyUnsafe,
    /// Every play sets `safe_mode`, and not all of them to `false`
    ExplicitlySafe,
    /// At least one play leaves `safe_mode` unset (or there are no plays)
    Undetermined,
}

/// Where the final decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    PlaybookVars,
    InventoryName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeModeDecision {
    pub declared: SafeMode,
    pub source: DecisionSource,
    pub safe: bool,
}

impl SafeModeDecision {
    pub fn is_safe(&self) -> bool {
        self.safe
    }
}

/// The `safe_mode` declaration of one play, if any.
pub type PlaySafeMode = Option<Value>;

/// Decide safe mode from a playbook file and the inventory path.
pub fn decide_file(playbook: &Path, inventory: &Path) -> Result<SafeModeDecision> {
    let content = fs::read_to_string(playbook)?;
    decide(&content, inventory).map_err(|e| match e {
        ShovelError::Parse { message, .. } => {
            ShovelError::parse(format!("playbook {}", playbook.display()), message)
        }
        other => other,
    })
}

/// Decide safe mode from playbook YAML and the inventory path.
pub fn decide(playbook_yaml: &str, inventory: &Path) -> Result<SafeModeDecision> {
    let plays = parse_plays(playbook_yaml)?;
    let declared = declared_mode(&plays);

    let decision = match declared {
        SafeMode::ExplicitlyUnsafe => SafeModeDecision {
            declared,
            source: DecisionSource::PlaybookVars,
            safe: false,
        },
        SafeMode::ExplicitlySafe => SafeModeDecision {
            declared,
            source: DecisionSource::PlaybookVars,
            safe: true,
        },
        SafeMode::Undetermined => SafeModeDecision {
            declared,
            source: DecisionSource::InventoryName,
            safe: is_protected_inventory(inventory),
        },
    };

    log::debug!("safe mode decision: {decision:?}");
    Ok(decision)
}

/// Reduce per-play declarations to the playbook's declared mode.
pub fn declared_mode(plays: &[PlaySafeMode]) -> SafeMode {
    if plays.is_empty() {
        return SafeMode::Undetermined;
    }
    if plays.iter().all(|p| matches!(p, Some(Value::Bool(false)))) {
        return SafeMode::ExplicitlyUnsafe;
    }
    if plays.iter().all(Option::is_some) {
        return SafeMode::ExplicitlySafe;
    }
    SafeMode::Undetermined
}

/// Inventories whose path names production or staging are protected.
pub fn is_protected_inventory(inventory: &Path) -> bool {
    let path = inventory.to_string_lossy();
    path.contains("production") || path.contains("staging")
}

/// Extract `vars.safe_mode` from each play of a playbook document.
fn parse_plays(playbook_yaml: &str) -> Result<Vec<PlaySafeMode>> {
    let doc: Value =
        serde_yaml::from_str(playbook_yaml).map_err(|e| ShovelError::parse("playbook", e))?;

    let Value::Sequence(plays) = doc else {
        return Err(ShovelError::parse(
            "playbook",
            "expected a list of plays at the top level",
        ));
    };

    plays
        .iter()
        .enumerate()
        .map(|(index, play)| {
            let Value::Mapping(play) = play else {
                return Err(ShovelError::parse(
                    "playbook",
                    format!("play #{} is not a mapping", index + 1),
                ));
            };
            match play.get("vars") {
                None | Some(Value::Null) => Ok(None),
                Some(Value::Mapping(vars)) => Ok(vars.get("safe_mode").cloned()),
                Some(_) => Err(ShovelError::parse(
                    "playbook",
                    format!("vars of play #{} is not a mapping", index + 1),
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const ALL_UNSAFE: &str = "\
- hosts: web
  vars:
    safe_mode: false
- hosts: db
  vars:
    safe_mode: false
";

    const NO_KEY: &str = "\
- hosts: web
  roles: [nginx]
- hosts: db
  vars:
    pg_version: 16
";

    #[test]
    fn test_all_plays_unsafe_ignores_inventory() {
        let decision = decide(ALL_UNSAFE, Path::new("inventories/production.ini")).unwrap();
        assert_eq!(decision.declared, SafeMode::ExplicitlyUnsafe);
        assert_eq!(decision.source, DecisionSource::PlaybookVars);
        assert!(!decision.is_safe());
    }

    #[test]
    fn test_no_key_staging_is_safe() {
        let decision = decide(NO_KEY, Path::new("inventories/staging.ini")).unwrap();
        assert_eq!(decision.declared, SafeMode::Undetermined);
        assert_eq!(decision.source, DecisionSource::InventoryName);
        assert!(decision.is_safe());
    }

    #[test]
    fn test_no_key_production_is_safe() {
        let decision = decide(NO_KEY, Path::new("inventories/production.ini")).unwrap();
        assert!(decision.is_safe());
    }

    #[test]
    fn test_no_key_other_inventory_is_unsafe() {
        let decision = decide(NO_KEY, Path::new("inventories/development.ini")).unwrap();
        assert!(!decision.is_safe());
    }

    #[test]
    fn test_explicitly_safe() {
        let yaml = "- hosts: all\n  vars:\n    safe_mode: true\n";
        let decision = decide(yaml, Path::new("inventories/vagrant.ini")).unwrap();
        assert_eq!(decision.declared, SafeMode::ExplicitlySafe);
        assert!(decision.is_safe());
    }

    #[test]
    fn test_mixed_declarations_fall_back_to_inventory() {
        let yaml = "\
- hosts: a
  vars:
    safe_mode: true
- hosts: b
- hosts: c
  vars:
    safe_mode: false
";
        let decision = decide(yaml, Path::new("inventories/vagrant.ini")).unwrap();
        assert_eq!(decision.declared, SafeMode::Undetermined);
        assert!(!decision.is_safe());

        let decision = decide(yaml, Path::new("inventories/staging.ini")).unwrap();
        assert!(decision.is_safe());
    }

    #[test]
    fn test_one_false_one_true_is_explicitly_safe() {
        let yaml = "\
- hosts: a
  vars:
    safe_mode: false
- hosts: b
  vars:
    safe_mode: true
";
        let decision = decide(yaml, Path::new("inventories/vagrant.ini")).unwrap();
        assert_eq!(decision.declared, SafeMode::ExplicitlySafe);
    }

    #[test]
    fn test_empty_playbook_uses_inventory() {
        let decision = decide("[]", Path::new("inventories/production.ini")).unwrap();
        assert_eq!(decision.declared, SafeMode::Undetermined);
        assert!(decision.is_safe());
    }

    #[test]
    fn test_malformed_playbook_is_parse_error() {
        let err = decide("- hosts: [unclosed", Path::new("x.ini")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = decide("hosts: all", Path::new("x.ini")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = decide("- hosts: all\n  vars: [1, 2]\n", Path::new("x.ini")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_decide_file_names_playbook_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "just a string").unwrap();

        let err = decide_file(&path, Path::new("staging.ini")).unwrap_err();
        assert!(err.to_string().contains("broken.yml"));
    }
}
