//! Core types for inventory data.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single target host with its inline attributes.
///
/// Two hosts are the same host when both the name and every attribute match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    /// Host name as written in the inventory
    pub name: String,
    /// `key=value` attributes from the host line
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Host {
    /// Create a host without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// A named group of hosts.
///
/// Behaves like a set: inserting a host equal to one already present is a
/// no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSet {
    /// Name from the `[section]` header
    pub name: String,
    hosts: Vec<Host>,
}

impl HostSet {
    /// Create an empty host set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: Vec::new(),
        }
    }

    /// Insert a host, returning `false` if an identical host was already present.
    pub fn insert(&mut self, host: Host) -> bool {
        if self.hosts.contains(&host) {
            return false;
        }
        self.hosts.push(host);
        true
    }

    /// Iterate over the hosts.
    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    /// Find a host by name.
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// The first host entered for this set.
    pub fn first(&self) -> Option<&Host> {
        self.hosts.first()
    }

    /// Number of distinct hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the set has no hosts.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl<'a> IntoIterator for &'a HostSet {
    type Item = &'a Host;
    type IntoIter = std::slice::Iter<'a, Host>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}

/// A parsed inventory document.
///
/// Host sets keep the order in which their headers first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFile {
    host_sets: Vec<HostSet>,
}

impl InventoryFile {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all host sets in order of first appearance.
    pub fn host_set_names(&self) -> Vec<&str> {
        self.host_sets.iter().map(|s| s.name.as_str()).collect()
    }

    /// All host sets in order of first appearance.
    pub fn host_sets(&self) -> &[HostSet] {
        &self.host_sets
    }

    /// Look up a host set by its exact name.
    pub fn get(&self, name: &str) -> Result<&HostSet> {
        self.host_sets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::UnknownHostSet(name.to_string()))
    }

    /// The first host of the first host set, if any.
    pub fn first_host(&self) -> Option<&Host> {
        self.host_sets.iter().find_map(HostSet::first)
    }

    /// Get a host set for writing, creating it on first use.
    pub(crate) fn open_host_set(&mut self, name: &str) -> &mut HostSet {
        let index = match self.host_sets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.host_sets.push(HostSet::new(name));
                self.host_sets.len() - 1
            }
        };
        &mut self.host_sets[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_set_deduplicates_equal_hosts() {
        let mut set = HostSet::new("web");
        assert!(set.insert(Host::new("host1").with_attribute("port", "22")));
        assert!(!set.insert(Host::new("host1").with_attribute("port", "22")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_host_set_keeps_same_name_with_different_attributes() {
        let mut set = HostSet::new("web");
        set.insert(Host::new("host1").with_attribute("port", "22"));
        set.insert(Host::new("host1").with_attribute("port", "2222"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_host_display() {
        let host = Host::new("db1")
            .with_attribute("role", "primary")
            .with_attribute("ansible_host", "10.0.0.2");
        assert_eq!(host.to_string(), "db1 ansible_host=10.0.0.2 role=primary");
    }

    #[test]
    fn test_get_unknown_host_set() {
        let inventory = InventoryFile::new();
        assert!(matches!(
            inventory.get("web"),
            Err(Error::UnknownHostSet(name)) if name == "web"
        ));
    }

    #[test]
    fn test_open_host_set_reuses_existing() {
        let mut inventory = InventoryFile::new();
        inventory.open_host_set("web").insert(Host::new("a"));
        inventory.open_host_set("db").insert(Host::new("b"));
        inventory.open_host_set("web").insert(Host::new("c"));

        assert_eq!(inventory.host_set_names(), vec!["web", "db"]);
        assert_eq!(inventory.get("web").unwrap().len(), 2);
    }

    #[test]
    fn test_first_host_skips_empty_sets() {
        let mut inventory = InventoryFile::new();
        inventory.open_host_set("empty");
        inventory.open_host_set("web").insert(Host::new("web1"));
        assert_eq!(inventory.first_host().map(|h| h.name.as_str()), Some("web1"));
    }
}
