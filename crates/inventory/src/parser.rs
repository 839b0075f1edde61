//! Parser for INI-style inventory files.
//!
//! ```text
//! # comment
//! [web]
//! host1 ansible_host=10.0.0.1
//! [db]
//! host2 ansible_host=10.0.0.2 role=primary
//! app[01:03].example.com:2222
//! ```

use crate::error::{Error, Result};
use crate::types::{Host, InventoryFile};
use std::collections::BTreeMap;
use std::path::Path;

/// Parse an inventory from a file path.
pub fn parse_file(path: &Path) -> Result<InventoryFile> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_string(&content)
}

/// Parse an inventory from a string.
pub fn parse_string(content: &str) -> Result<InventoryFile> {
    let mut inventory = InventoryFile::new();
    let mut current: Option<String> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_num = index + 1;
        let line = raw.trim_end();
        let trimmed = line.trim_start();

        // Skip empty lines and comments
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(name) = parse_header(line) {
            inventory.open_host_set(name);
            current = Some(name.to_string());
            continue;
        }

        let Some(hosts) = parse_hosts(line, line_num)? else {
            return Err(Error::Parse {
                line: line_num,
                content: line.to_string(),
            });
        };

        let Some(set_name) = current.as_deref() else {
            return Err(Error::MissingHostSet { line: line_num });
        };
        let set = inventory.open_host_set(set_name);
        for host in hosts {
            set.insert(host);
        }
    }

    Ok(inventory)
}

/// Match a `[name]` header line.
fn parse_header(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?;
    if name.is_empty() || name.contains(']') {
        return None;
    }
    Some(name)
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Parse a host line into the hosts it names. Returns `None` when the line
/// does not start with a host name.
///
/// The first token is the host pattern: an optional `:port` suffix becomes
/// `ansible_port` and `[01:03]` / `[a:c]` ranges expand to one host each.
/// Later `key=value` tokens are attributes; other tokens are ignored.
fn parse_hosts(line: &str, line_num: usize) -> Result<Option<Vec<Host>>> {
    if !line.starts_with(is_host_char) {
        return Ok(None);
    }
    let parse_error = || Error::Parse {
        line: line_num,
        content: line.to_string(),
    };

    let mut tokens = line.split_whitespace();
    let Some(token) = tokens.next() else {
        return Ok(None);
    };
    let (pattern, port) = split_port(token);
    let names = expand_ranges(pattern).ok_or_else(parse_error)?;
    if names.iter().any(|name| name.is_empty() || !name.chars().all(is_host_char)) {
        return Err(parse_error());
    }

    let mut attributes = BTreeMap::new();
    if let Some(port) = port {
        attributes.insert("ansible_port".to_string(), port.to_string());
    }
    for pair in tokens {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                attributes.insert(key.to_string(), value.to_string());
            }
            _ => {}
        }
    }

    Ok(Some(
        names
            .into_iter()
            .map(|name| Host {
                name,
                attributes: attributes.clone(),
            })
            .collect(),
    ))
}

/// Split a trailing `:port` off a host pattern.
fn split_port(token: &str) -> (&str, Option<&str>) {
    let after_ranges = token.rfind(']').map_or(0, |i| i + 1);
    if let Some(colon) = token[after_ranges..].rfind(':') {
        let at = after_ranges + colon;
        let port = &token[at + 1..];
        if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
            return (&token[..at], Some(port));
        }
    }
    (token, None)
}

/// Expand every `[start:end]` range in a host pattern.
fn expand_ranges(pattern: &str) -> Option<Vec<String>> {
    let Some(open) = pattern.find('[') else {
        return (!pattern.contains(']')).then(|| vec![pattern.to_string()]);
    };
    let close = open + pattern[open..].find(']')?;
    let prefix = &pattern[..open];
    if prefix.contains(']') {
        return None;
    }

    let items = expand_range(&pattern[open + 1..close])?;
    let tails = expand_ranges(&pattern[close + 1..])?;
    Some(
        items
            .iter()
            .flat_map(|item| tails.iter().map(move |tail| format!("{prefix}{item}{tail}")))
            .collect(),
    )
}

/// `01:03` gives 01 02 03 and `a:c` gives a b c. An optional third part is
/// the step.
fn expand_range(range: &str) -> Option<Vec<String>> {
    let mut parts = range.split(':');
    let (start, end) = (parts.next()?, parts.next()?);
    let step = match parts.next() {
        Some(step) => step.parse::<usize>().ok().filter(|s| *s > 0)?,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }

    if let (Ok(first), Ok(last)) = (start.parse::<u64>(), end.parse::<u64>()) {
        if first > last {
            return None;
        }
        let width = if start.len() > 1 && start.starts_with('0') {
            start.len()
        } else {
            0
        };
        return Some(
            (first..=last)
                .step_by(step)
                .map(|n| format!("{n:0width$}"))
                .collect(),
        );
    }

    let (mut from, mut to) = (start.chars(), end.chars());
    match (from.next(), from.next(), to.next(), to.next()) {
        (Some(first), None, Some(last), None)
            if first.is_ascii_alphabetic() && last.is_ascii_alphabetic() && first <= last =>
        {
            Some((first..=last).step_by(step).map(String::from).collect())
        }
        _ => None,
    }
}
