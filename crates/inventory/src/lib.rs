//! # inventory
//!
//! Parser for INI-style Ansible inventory files.
//!
//! An inventory is a list of named host sets (`[section]` headers), each
//! holding hosts with inline `key=value` attributes.
//!
//! ## Example
//!
//! ```
//! let inventory = inventory::parse_string("[web]\nweb1 ansible_host=10.0.0.1\n").unwrap();
//!
//! assert_eq!(inventory.host_set_names(), vec!["web"]);
//! let web1 = inventory.get("web").unwrap().first().unwrap();
//! assert_eq!(web1.get("ansible_host"), Some("10.0.0.1"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::{parse_file, parse_string};
pub use types::{Host, HostSet, InventoryFile};

use std::path::Path;

impl InventoryFile {
    /// Read and parse an inventory file.
    pub fn read(path: &Path) -> Result<Self> {
        parser::parse_file(path)
    }
}
