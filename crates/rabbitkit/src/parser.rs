//! Parser for `rabbitmqctl list_user_permissions` output.
//!
//! ## Format
//!
//! One record per line, four columns: `vhost configure write read`.
//! Columns are separated by one or more spaces or tabs. The three
//! permission columns may be blank, which shows up as adjacent
//! delimiters:
//!
//! ```text
//! /           .*  .*  .*
//! staging     ^amq\.gen.*     .*
//! bar\t\t\t3
//! ```

use crate::error::{Error, Result};
use crate::types::{PermissionMap, PermissionRecord};
use regex::Regex;
use std::sync::LazyLock;

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(\S*)\s+(\S*)\s+(\S*)$")
        .expect("LINE_RE is a valid regex pattern")
});

/// Parse listing output into a map keyed by vhost.
///
/// Returns `Ok(None)` when the output holds no records at all, which means
/// the user has no permissions anywhere. Any line that does not split into
/// exactly four columns fails the whole parse.
pub fn parse_user_permissions(output: &str) -> Result<Option<PermissionMap>> {
    let mut permissions = PermissionMap::new();

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let record = parse_line(line)?;
        permissions.insert(record.vhost.clone(), record);
    }

    if permissions.is_empty() {
        Ok(None)
    } else {
        Ok(Some(permissions))
    }
}

/// Parse a single listing line.
pub fn parse_line(line: &str) -> Result<PermissionRecord> {
    let caps = LINE_RE.captures(line).ok_or_else(|| Error::Parse {
        line: line.to_string(),
    })?;

    let column = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
    Ok(PermissionRecord::new(column(1), column(2), column(3), column(4)))
}
