// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// guacapy CLI - Output Module
// Tables for humans, JSON for scripts

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use guacapy::{
    ActiveConnection, Connection, ConnectionGroup, Form, HistoryEntry, ObjectKind, PermissionSet,
    ProtocolInfo, SharingProfile, User, UserGroup,
};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(label).add_attribute(Attribute::Bold).fg(Color::Cyan))
        .collect()
}

fn new_table(labels: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(labels));
    table
}

fn print_table(table: Table, count: usize, noun: &str) {
    println!();
    println!("{}", table);
    println!();
    println!("{} {}(s) found", count.to_string().cyan(), noun);
    println!();
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

pub fn print_users(users: &BTreeMap<String, User>) {
    let mut table = new_table(&["Username", "Full name", "Email", "Status", "Last active"]);
    for user in users.values() {
        let status = if user.attributes.is_disabled() {
            Cell::new("disabled").fg(Color::Red)
        } else if user.attributes.is_expired() {
            Cell::new("expired").fg(Color::Yellow)
        } else {
            Cell::new("active").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(&user.username).fg(Color::Green),
            Cell::new(or_dash(user.attributes.full_name.as_deref())),
            Cell::new(or_dash(user.attributes.email_address.as_deref())),
            status,
            Cell::new(timestamp(user.last_active)).fg(Color::DarkGrey),
        ]);
    }
    print_table(table, users.len(), "user");
}

pub fn print_user(user: &User, groups: &[String]) {
    let attrs = &user.attributes;
    println!();
    println!("{}", format!("User: {}", user.username).bold().green());
    println!("  Full name:    {}", or_dash(attrs.full_name.as_deref()));
    println!("  Email:        {}", or_dash(attrs.email_address.as_deref()));
    println!("  Organization: {}", or_dash(attrs.organization.as_deref()));
    println!("  Role:         {}", or_dash(attrs.organizational_role.as_deref()));
    println!("  Timezone:     {}", or_dash(attrs.timezone.as_deref()));
    println!("  Disabled:     {}", attrs.is_disabled());
    println!("  Last active:  {}", timestamp(user.last_active));
    if attrs.valid_from.is_some() || attrs.valid_until.is_some() {
        println!(
            "  Valid:        {} .. {}",
            or_dash(attrs.valid_from.as_deref()),
            or_dash(attrs.valid_until.as_deref())
        );
    }
    if !groups.is_empty() {
        println!("  Groups:       {}", groups.join(", ").cyan());
    }
    println!();
}

pub fn print_groups(groups: &BTreeMap<String, UserGroup>) {
    let mut table = new_table(&["Identifier", "Status"]);
    for group in groups.values() {
        let status = if group.disabled {
            Cell::new("disabled").fg(Color::Red)
        } else {
            Cell::new("active").fg(Color::Green)
        };
        table.add_row(vec![Cell::new(&group.identifier).fg(Color::Green), status]);
    }
    print_table(table, groups.len(), "group");
}

pub fn print_identifiers(title: &str, identifiers: &[String]) {
    println!();
    println!("{}", title.bold());
    if identifiers.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for identifier in identifiers {
        println!("  {}", identifier);
    }
    println!();
}

pub fn print_connections(connections: &BTreeMap<String, Connection>) {
    let mut table = new_table(&["ID", "Name", "Protocol", "Group", "Active", "Last active"]);
    for (id, connection) in connections {
        let active = connection.active_connections.unwrap_or(0);
        let active_cell = if active > 0 {
            Cell::new(active).fg(Color::Green)
        } else {
            Cell::new(active).fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&connection.name).fg(Color::Green),
            Cell::new(&connection.protocol),
            Cell::new(&connection.parent_identifier),
            active_cell,
            Cell::new(timestamp(connection.last_active)).fg(Color::DarkGrey),
        ]);
    }
    print_table(table, connections.len(), "connection");
}

/// Parameters whose values are never echoed
fn is_secret_parameter(name: &str) -> bool {
    name.contains("password") || name.contains("passphrase") || name == "private-key"
}

pub fn print_connection(connection: &Connection) {
    println!();
    println!("{}", format!("Connection: {}", connection.name).bold().green());
    println!("  ID:       {}", or_dash(connection.identifier.as_deref()).dimmed());
    println!("  Protocol: {}", connection.protocol);
    println!("  Group:    {}", connection.parent_identifier);

    if !connection.parameters.is_empty() {
        println!();
        println!("{}", "  Parameters:".bold());
        for (name, value) in &connection.parameters {
            let shown = if is_secret_parameter(name) { "********" } else { value };
            println!("    {:<24} {}", name, shown);
        }
    }
    println!();
}

pub fn print_connections_found(connections: &[Connection]) {
    let mut table = new_table(&["ID", "Name", "Protocol", "Group"]);
    for connection in connections {
        table.add_row(vec![
            Cell::new(or_dash(connection.identifier.as_deref())),
            Cell::new(&connection.name).fg(Color::Green),
            Cell::new(&connection.protocol),
            Cell::new(&connection.parent_identifier),
        ]);
    }
    print_table(table, connections.len(), "connection");
}

pub fn print_connection_groups(groups: &BTreeMap<String, ConnectionGroup>) {
    let mut table = new_table(&["ID", "Name", "Type", "Parent", "Active"]);
    for (id, group) in groups {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&group.name).fg(Color::Green),
            Cell::new(group.group_type),
            Cell::new(or_dash(group.parent_identifier.as_deref())),
            Cell::new(group.active_connections.unwrap_or(0)),
        ]);
    }
    print_table(table, groups.len(), "connection group");
}

pub fn print_tree(group: &ConnectionGroup) {
    println!();
    print_tree_level(group, 0);
    println!();
}

fn print_tree_level(group: &ConnectionGroup, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}▸ {} {}",
        indent,
        group.name.bold(),
        format!("[{}] ({})", group.group_type, or_dash(group.identifier.as_deref())).dimmed()
    );
    for connection in group.connections() {
        println!(
            "{}  • {} {}",
            indent,
            connection.name.green(),
            format!("{} ({})", connection.protocol, or_dash(connection.identifier.as_deref())).dimmed()
        );
    }
    for child in group.groups() {
        print_tree_level(child, depth + 1);
    }
}

pub fn print_sharing_profiles(profiles: &BTreeMap<String, SharingProfile>) {
    let mut table = new_table(&["ID", "Name", "Primary connection"]);
    for (id, profile) in profiles {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&profile.name).fg(Color::Green),
            Cell::new(&profile.primary_connection_identifier),
        ]);
    }
    print_table(table, profiles.len(), "sharing profile");
}

pub fn print_sessions(sessions: &BTreeMap<String, ActiveConnection>) {
    let mut table = new_table(&["ID", "User", "Connection", "Remote host", "Started"]);
    for (id, session) in sessions {
        table.add_row(vec![
            Cell::new(id).fg(Color::DarkGrey),
            Cell::new(or_dash(session.username.as_deref())).fg(Color::Green),
            Cell::new(or_dash(session.connection_identifier.as_deref())),
            Cell::new(or_dash(session.remote_host.as_deref())),
            Cell::new(timestamp(session.start_date)),
        ]);
    }
    print_table(table, sessions.len(), "active connection");
}

pub fn print_history(entries: &[HistoryEntry]) {
    let mut table = new_table(&["User", "Connection", "Remote host", "Start", "End"]);
    for entry in entries {
        let end = if entry.active {
            Cell::new("active").fg(Color::Green)
        } else {
            Cell::new(timestamp(entry.end_date))
        };
        table.add_row(vec![
            Cell::new(or_dash(entry.username.as_deref())),
            Cell::new(or_dash(entry.connection_name.as_deref())),
            Cell::new(or_dash(entry.remote_host.as_deref())),
            Cell::new(timestamp(entry.start_date)),
            end,
        ]);
    }
    print_table(table, entries.len(), "history entry");
}

pub fn print_permissions(subject: &str, permissions: &PermissionSet) {
    println!();
    println!("{}", format!("Permissions of {}", subject).bold().green());

    let system: Vec<String> = permissions
        .system_permissions
        .iter()
        .map(|p| p.to_string())
        .collect();
    println!("  System: {}", if system.is_empty() { "-".to_string() } else { system.join(", ") });

    let kinds = [
        ("Connections", ObjectKind::Connection),
        ("Connection groups", ObjectKind::ConnectionGroup),
        ("Sharing profiles", ObjectKind::SharingProfile),
        ("Active connections", ObjectKind::ActiveConnection),
        ("Users", ObjectKind::User),
        ("User groups", ObjectKind::UserGroup),
    ];
    for (label, kind) in kinds {
        let objects = permissions.objects(kind);
        if objects.is_empty() {
            continue;
        }
        println!("  {}:", label);
        for (id, granted) in objects {
            let granted: Vec<String> = granted.iter().map(|p| p.to_string()).collect();
            println!("    {:<16} {}", id, granted.join(", ").dimmed());
        }
    }
    println!();
}

pub fn print_protocols(protocols: &BTreeMap<String, ProtocolInfo>) {
    let mut table = new_table(&["Protocol", "Connection fields", "Sharing fields"]);
    for (name, protocol) in protocols {
        let count = |forms: &[Form]| forms.iter().map(|f| f.fields.len()).sum::<usize>();
        table.add_row(vec![
            Cell::new(name).fg(Color::Green),
            Cell::new(count(&protocol.connection_forms)),
            Cell::new(count(&protocol.sharing_profile_forms)),
        ]);
    }
    print_table(table, protocols.len(), "protocol");
}

pub fn print_forms(forms: &[Form]) {
    let mut table = new_table(&["Form", "Field", "Type", "Options"]);
    for form in forms {
        for field in &form.fields {
            table.add_row(vec![
                Cell::new(or_dash(form.name.as_deref())),
                Cell::new(&field.name).fg(Color::Green),
                Cell::new(&field.field_type),
                Cell::new(field.options.as_deref().map(|o| o.join(", ")).unwrap_or_default())
                    .fg(Color::DarkGrey),
            ]);
        }
    }
    let fields = forms.iter().map(|f| f.fields.len()).sum();
    print_table(table, fields, "field");
}
