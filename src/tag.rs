//! Provisioning tags.
//!
//! A played run in safe mode is recorded as a git tag:
//!
//! ```text
//! provision_2024_03_01_14_05_site_production_alice
//! ```
//!
//! The name segments never contain `_`, so a tag splits back into exactly
//! the fields it was made from.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

pub const TAG_PREFIX: &str = "provision";

const TIME_FORMAT: &str = "%Y_%m_%d_%H_%M";

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^provision_(\d{4})_(\d{2})_(\d{2})_(\d{2})_(\d{2})_([^_\s]+)_([^_\s]+)_([^_\s]+)$")
        .expect("tag pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionTag {
    /// Start of the run, truncated to the minute
    pub time: NaiveDateTime,
    pub playbook: String,
    pub inventory: String,
    pub user: String,
}

impl ProvisionTag {
    /// Build a tag for a run of `playbook` against `inventory`.
    pub fn new(time: NaiveDateTime, playbook: &Path, inventory: &Path, user: &str) -> Self {
        Self {
            time: truncate_to_minute(time),
            playbook: shortname(playbook),
            inventory: shortname(inventory),
            user: normalize(user),
        }
    }

    /// Canonical tag name.
    pub fn encode(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            TAG_PREFIX,
            self.time.format(TIME_FORMAT),
            self.playbook,
            self.inventory,
            self.user
        )
    }

    /// Parse a tag name. Anything that is not a well-formed provisioning tag
    /// yields `None`.
    pub fn decode(tag: &str) -> Option<Self> {
        let caps = TAG_PATTERN.captures(tag)?;
        let number = |i: usize| caps[i].parse::<u32>().ok();

        let year = caps[1].parse::<i32>().ok()?;
        let time = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?
            .and_hms_opt(number(4)?, number(5)?, 0)?;

        Some(Self {
            time,
            playbook: caps[6].to_string(),
            inventory: caps[7].to_string(),
            user: caps[8].to_string(),
        })
    }
}

impl fmt::Display for ProvisionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// File name without directory or extension, normalized for use in a tag.
pub fn shortname(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize(&stem)
}

fn normalize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}

fn truncate_to_minute(time: NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_encode() {
        let tag = ProvisionTag::new(
            at(2024, 3, 1, 14, 5, 42),
            Path::new("playbooks/site.yml"),
            Path::new("inventories/production.ini"),
            "alice",
        );
        assert_eq!(tag.encode(), "provision_2024_03_01_14_05_site_production_alice");
    }

    #[test]
    fn test_decode_reconstructs_fields() {
        let original = ProvisionTag::new(
            at(2023, 12, 31, 23, 59, 59),
            Path::new("/abs/path/web.yml"),
            Path::new("staging.ini"),
            "bob",
        );
        let decoded = ProvisionTag::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.time, at(2023, 12, 31, 23, 59, 0));
        assert_eq!(decoded.encode(), original.encode());
    }

    #[test]
    fn test_underscores_are_normalized() {
        let tag = ProvisionTag::new(
            at(2024, 1, 2, 3, 4, 0),
            Path::new("playbooks/db_primary.yml"),
            Path::new("inventories/eu_production.ini"),
            "jane_doe",
        );
        assert_eq!(
            tag.encode(),
            "provision_2024_01_02_03_04_db-primary_eu-production_jane-doe"
        );
        assert_eq!(ProvisionTag::decode(&tag.encode()), Some(tag));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for bad in [
            "",
            "v1.0.0",
            "provision",
            "provision_2024_01_02_03_04_site_production",
            "provision_2024_01_02_03_04_site_production_alice_extra",
            "provision_2024_01_02_03_site_production_alice",
            "provision_2024_0a_02_03_04_site_production_alice",
            "provision_24_01_02_03_04_site_production_alice",
            "provision_2024_13_02_03_04_site_production_alice",
            "provision_2024_01_02_25_04_site_production_alice",
            "deploy_2024_01_02_03_04_site_production_alice",
        ] {
            assert_eq!(ProvisionTag::decode(bad), None, "{bad} should not decode");
        }
    }

    #[test]
    fn test_decode_rejects_surrounding_whitespace() {
        let tag = "provision_2024_01_02_03_04_site_production_alice";
        assert!(ProvisionTag::decode(tag).is_some());
        assert!(ProvisionTag::decode(&format!("{tag}\n")).is_none());
        assert!(ProvisionTag::decode(&format!("  {tag}")).is_none());
    }

    #[test]
    fn test_shortname() {
        assert_eq!(shortname(Path::new("playbooks/web/site.yml")), "site");
        assert_eq!(shortname(Path::new("hosts")), "hosts");
        assert_eq!(shortname(Path::new("inventories/prod.v2.ini")), "prod.v2");
    }
}
