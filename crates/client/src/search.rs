// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// Name search over connection group trees

use regex::Regex;

use crate::error::Result;
use crate::types::{Connection, ConnectionGroup};

/// How a name is compared
#[derive(Debug, Clone)]
pub enum NameMatch {
    Exact(String),
    Pattern(Regex),
}

impl NameMatch {
    pub fn exact(name: impl Into<String>) -> Self {
        NameMatch::Exact(name.into())
    }

    /// Regular expression, unanchored
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(NameMatch::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(expected) => expected == name,
            NameMatch::Pattern(regex) => regex.is_match(name),
        }
    }
}

/// Connections anywhere below `tree` whose name matches, depth first
pub fn find_connections<'t>(tree: &'t ConnectionGroup, matcher: &NameMatch) -> Vec<&'t Connection> {
    let mut found = Vec::new();
    collect_connections(tree, matcher, &mut found);
    found
}

fn collect_connections<'t>(group: &'t ConnectionGroup, matcher: &NameMatch, found: &mut Vec<&'t Connection>) {
    found.extend(group.connections().iter().filter(|c| matcher.matches(&c.name)));
    for child in group.groups() {
        collect_connections(child, matcher, found);
    }
}

/// Groups below `tree` (the tree root excluded) whose name matches
pub fn find_groups<'t>(tree: &'t ConnectionGroup, matcher: &NameMatch) -> Vec<&'t ConnectionGroup> {
    let mut found = Vec::new();
    collect_groups(tree, matcher, &mut found);
    found
}

fn collect_groups<'t>(
    group: &'t ConnectionGroup,
    matcher: &NameMatch,
    found: &mut Vec<&'t ConnectionGroup>,
) {
    for child in group.groups() {
        if matcher.matches(&child.name) {
            found.push(child);
        }
        collect_groups(child, matcher, found);
    }
}
