// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 guacapy Contributors

// guacapy - CLI Client
// Command-line interface for administering an Apache Guacamole server

mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dialoguer::{Confirm, Password};
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use guacapy::{
    Connection, ConnectionGroup, GuacamoleClient, NameMatch, ObjectKind, ObjectPermission,
    Scheme, SharingProfile, SystemPermission, User, UserGroup, ROOT_CONNECTION_GROUP,
};

use crate::config::{parse_scheme, CliConfig, Overrides};

#[derive(Parser)]
#[command(name = "guacapy")]
#[command(about = "Apache Guacamole REST API client", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.config/guacapy/cli.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Guacamole server hostname
    #[arg(short = 'H', long, env = "GUACAPY_HOST", global = true)]
    server: Option<String>,

    /// Guacamole server port
    #[arg(short = 'P', long, global = true)]
    port: Option<u16>,

    /// URL scheme of the server (http or https)
    #[arg(long, value_parser = parse_scheme, global = true)]
    scheme: Option<Scheme>,

    /// Path Guacamole is deployed under, e.g. /guacamole/
    #[arg(long, global = true)]
    base_path: Option<String>,

    /// Guacamole username
    #[arg(short, long, env = "GUACAPY_USERNAME", global = true)]
    username: Option<String>,

    /// Guacamole password (prompted when absent from config and keychain)
    #[arg(long, env = "GUACAPY_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Base32 TOTP secret for servers with two-factor authentication
    #[arg(long, env = "GUACAPY_TOTP_SECRET", hide_env_values = true, global = true)]
    totp_secret: Option<String>,

    /// Data source to operate on (default: the one chosen at login)
    #[arg(short, long, global = true)]
    data_source: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// Pin the server certificate by its SHA-256 fingerprint
    #[arg(long, global = true)]
    fingerprint: Option<String>,

    /// Store a prompted password in the system keychain after login
    #[arg(long, global = true)]
    remember: bool,

    /// Output as JSON for scripting
    #[arg(short, long, global = true)]
    json: bool,

    /// Do not ask for confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the logged-in user and its effective permissions
    Whoami,

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage user groups
    Groups {
        #[command(subcommand)]
        action: GroupCommands,
    },

    /// Manage connections
    Connections {
        #[command(subcommand)]
        action: ConnectionCommands,
    },

    /// Manage connection groups
    ConnectionGroups {
        #[command(subcommand)]
        action: ConnectionGroupCommands,
    },

    /// Manage sharing profiles
    SharingProfiles {
        #[command(subcommand)]
        action: SharingProfileCommands,
    },

    /// Inspect and terminate active connections
    Sessions {
        #[command(subcommand)]
        action: SessionCommands,
    },

    /// Inspect protocol and attribute schemas
    Schema {
        #[command(subcommand)]
        action: SchemaCommands,
    },

    /// Create a connection from a URI, e.g. ssh://user@host:22
    QuickConnect {
        uri: String,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List all users
    List,

    /// Show a user and its group memberships
    Show { username: String },

    /// Create a user
    Create {
        username: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        user_password: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        organization: Option<String>,

        /// Create the account disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Delete a user
    Delete { username: String },

    /// Add a user to a user group
    AddToGroup { username: String, group: String },

    /// Remove a user from a user group
    RemoveFromGroup { username: String, group: String },

    /// Grant permissions to a user
    Grant {
        username: String,
        #[command(flatten)]
        grants: GrantArgs,
    },

    /// Revoke permissions from a user
    Revoke {
        username: String,
        #[command(flatten)]
        grants: GrantArgs,
    },

    /// Show the permissions granted to a user
    Permissions {
        username: String,

        /// Include permissions inherited from groups
        #[arg(short, long)]
        effective: bool,
    },

    /// Show a user's connection history
    History { username: String },

    /// Change the password of the logged-in user
    Passwd,
}

#[derive(clap::Args)]
struct GrantArgs {
    /// System permission, e.g. CREATE_USER (repeatable)
    #[arg(long)]
    system: Vec<String>,

    /// Connection identifier (repeatable)
    #[arg(long)]
    connection: Vec<String>,

    /// Connection group identifier (repeatable)
    #[arg(long)]
    connection_group: Vec<String>,

    /// Object permission applied to connections and connection groups
    #[arg(long, default_value = "READ")]
    permission: String,
}

#[derive(Subcommand)]
enum GroupCommands {
    /// List all user groups
    List,

    /// Show a user group, its members and parents
    Show { identifier: String },

    /// Create a user group
    Create {
        identifier: String,

        #[arg(long)]
        disabled: bool,
    },

    /// Delete a user group
    Delete { identifier: String },

    /// List member users and member groups
    Members { identifier: String },

    /// Add a user (or with --group, a user group) to a group
    AddMember {
        identifier: String,
        member: String,

        /// Member is a user group
        #[arg(long)]
        group: bool,
    },

    /// Remove a user (or with --group, a user group) from a group
    RemoveMember {
        identifier: String,
        member: String,

        /// Member is a user group
        #[arg(long)]
        group: bool,
    },

    /// Show the permissions granted to a user group
    Permissions { identifier: String },
}

#[derive(Subcommand)]
enum ConnectionCommands {
    /// List all connections
    List,

    /// Show a connection with its parameters
    Show { identifier: String },

    /// Create a connection
    Create {
        name: String,

        /// Protocol (rdp, ssh, vnc, telnet, kubernetes)
        #[arg(long, default_value = "rdp")]
        protocol: String,

        /// Target hostname
        #[arg(long)]
        hostname: String,

        /// Target port (default depends on the protocol)
        #[arg(long)]
        target_port: Option<u16>,

        /// Parent connection group
        #[arg(long, default_value = ROOT_CONNECTION_GROUP)]
        group: String,

        /// Extra parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Delete a connection
    Delete { identifier: String },

    /// Find connections by name
    Find {
        name: String,

        /// Treat the name as a regular expression
        #[arg(short, long)]
        regex: bool,

        /// Connection group to search under
        #[arg(long, default_value = ROOT_CONNECTION_GROUP)]
        group: String,
    },

    /// Show a connection's history
    History { identifier: String },
}

#[derive(Subcommand)]
enum ConnectionGroupCommands {
    /// List all connection groups
    List,

    /// Print the connection tree under a group
    Tree {
        #[arg(default_value = ROOT_CONNECTION_GROUP)]
        identifier: String,
    },

    /// Create a connection group
    Create {
        name: String,

        #[arg(long, default_value = ROOT_CONNECTION_GROUP)]
        parent: String,

        /// Create a balancing group instead of an organizational one
        #[arg(long)]
        balancing: bool,
    },

    /// Delete a connection group and everything below it
    Delete { identifier: String },
}

#[derive(Subcommand)]
enum SharingProfileCommands {
    /// List all sharing profiles
    List,

    /// Create a sharing profile for a connection
    Create {
        name: String,
        connection: String,

        /// Viewers cannot send input
        #[arg(long)]
        read_only: bool,
    },

    /// Delete a sharing profile
    Delete { identifier: String },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List active connections
    List,

    /// Terminate one or more active connections
    Kill {
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Obtain a share key for an active connection
    Share {
        identifier: String,
        sharing_profile: String,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// List supported protocols
    Protocols,

    /// Show the attribute forms of an object type
    Attributes {
        #[arg(value_enum)]
        kind: AttributeKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AttributeKind {
    User,
    UserGroup,
    Connection,
    ConnectionGroup,
    SharingProfile,
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => Ok((key.trim().to_string(), val.to_string())),
        _ => Err(format!("expected key=value, got '{}'", value)),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "guacapy=warn",
        1 => "guacapy=debug",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply(Overrides {
        hostname: cli.server.clone(),
        port: cli.port,
        protocol: cli.scheme,
        base_path: cli.base_path.clone(),
        username: cli.username.clone(),
        password: cli.password.clone(),
        totp_secret: cli.totp_secret.clone(),
        data_source: cli.data_source.clone(),
        insecure: cli.insecure,
        fingerprint: cli.fingerprint.clone(),
    });

    if config.client.hostname.is_empty() {
        anyhow::bail!(
            "No Guacamole server configured. Use --server or set hostname in {}",
            CliConfig::config_path()?.display()
        );
    }
    if config.client.username.is_empty() {
        anyhow::bail!("No username configured. Use --username or set username in the config file");
    }

    let prompted = config.resolve_password()?;

    let client = GuacamoleClient::connect(config.client.clone())
        .await
        .with_context(|| format!("Failed to log in to {}", config.client.hostname))?;
    debug!(
        "Logged in as {} (data source {})",
        client.username(),
        client.data_source()
    );

    if prompted && cli.remember {
        config.store_password_in_keychain()?;
    }

    let result = run(&cli, &client).await;

    if let Err(e) = client.logout().await {
        warn!("Failed to log out: {}", e);
    }

    result
}

async fn run(cli: &Cli, client: &GuacamoleClient) -> Result<()> {
    match &cli.command {
        Commands::Whoami => whoami(cli, client).await,
        Commands::Users { action } => users(cli, client, action).await,
        Commands::Groups { action } => groups(cli, client, action).await,
        Commands::Connections { action } => connections(cli, client, action).await,
        Commands::ConnectionGroups { action } => connection_groups(cli, client, action).await,
        Commands::SharingProfiles { action } => sharing_profiles(cli, client, action).await,
        Commands::Sessions { action } => sessions(cli, client, action).await,
        Commands::Schema { action } => schema(cli, client, action).await,
        Commands::QuickConnect { uri } => {
            let identifier = client.quick_connect(uri).await?;
            if cli.json {
                output::print_json(&serde_json::json!({ "identifier": identifier }))?;
            } else {
                println!("{}", format!("✓ Connection {} created", identifier).green().bold());
            }
            Ok(())
        }
    }
}

fn confirm(cli: &Cli, prompt: String) -> Result<bool> {
    if cli.yes {
        return Ok(true);
    }
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    if !confirmed {
        println!("{}", "Deletion cancelled".dimmed());
    }
    Ok(confirmed)
}

fn done(message: String) {
    println!("{}", format!("✓ {}", message).green().bold());
}

async fn whoami(cli: &Cli, client: &GuacamoleClient) -> Result<()> {
    let user = client.users().current().await?;
    let permissions = client.users().current_effective_permissions().await?;

    if cli.json {
        return output::print_json(&serde_json::json!({
            "user": user,
            "dataSource": client.data_source(),
            "availableDataSources": client.available_data_sources(),
            "permissions": permissions,
        }));
    }

    output::print_user(&user, &[]);
    println!(
        "  Data source: {} (available: {})",
        client.data_source().cyan(),
        client.available_data_sources().join(", ")
    );
    output::print_permissions(&user.username, &permissions);
    Ok(())
}

async fn users(cli: &Cli, client: &GuacamoleClient, action: &UserCommands) -> Result<()> {
    let api = client.users();
    match action {
        UserCommands::List => {
            let users = api.list().await?;
            if cli.json {
                return output::print_json(&users);
            }
            output::print_users(&users);
        }
        UserCommands::Show { username } => {
            let user = api.get(username).await?;
            let groups = api.user_groups(username).await?;
            if cli.json {
                return output::print_json(&serde_json::json!({ "user": user, "groups": groups }));
            }
            output::print_user(&user, &groups);
        }
        UserCommands::Create {
            username,
            user_password,
            email,
            full_name,
            organization,
            disabled,
        } => {
            let password = match user_password {
                Some(p) => p.clone(),
                None => Password::new()
                    .with_prompt(format!("Password for new user {}", username))
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()
                    .context("Failed to read password")?,
            };

            let mut user = User::new(username.as_str(), password).disabled(*disabled);
            if let Some(email) = email {
                user = user.with_email(email.as_str());
            }
            if let Some(name) = full_name {
                user = user.with_full_name(name.as_str());
            }
            if let Some(org) = organization {
                user = user.with_organization(org.as_str());
            }

            let created = api
                .create(&user)
                .await
                .with_context(|| format!("Failed to create user '{}'", username))?;
            if cli.json {
                return output::print_json(&created);
            }
            done(format!("User '{}' created", created.username));
        }
        UserCommands::Delete { username } => {
            if confirm(cli, format!("Delete user '{}'?", username.yellow()))? {
                api.delete(username).await?;
                done(format!("User '{}' deleted", username));
            }
        }
        UserCommands::AddToGroup { username, group } => {
            api.add_to_group(username, group).await?;
            done(format!("Added '{}' to group '{}'", username, group));
        }
        UserCommands::RemoveFromGroup { username, group } => {
            api.remove_from_group(username, group).await?;
            done(format!("Removed '{}' from group '{}'", username, group));
        }
        UserCommands::Grant { username, grants } => {
            apply_grants(client, username, grants, true).await?;
            done(format!("Permissions granted to '{}'", username));
        }
        UserCommands::Revoke { username, grants } => {
            apply_grants(client, username, grants, false).await?;
            done(format!("Permissions revoked from '{}'", username));
        }
        UserCommands::Permissions { username, effective } => {
            let permissions = if *effective {
                api.effective_permissions(username).await?
            } else {
                api.permissions(username).await?
            };
            if cli.json {
                return output::print_json(&permissions);
            }
            output::print_permissions(username, &permissions);
        }
        UserCommands::History { username } => {
            let history = api.history(username).await?;
            if cli.json {
                return output::print_json(&history);
            }
            output::print_history(&history);
        }
        UserCommands::Passwd => {
            let old_password = Password::new()
                .with_prompt("Current password")
                .interact()
                .context("Failed to read password")?;
            let new_password = Password::new()
                .with_prompt("New password")
                .with_confirmation("Confirm new password", "Passwords do not match")
                .interact()
                .context("Failed to read password")?;
            api.update_password(client.username(), &old_password, &new_password)
                .await
                .context("Failed to change password")?;
            done("Password changed".to_string());
        }
    }
    Ok(())
}

async fn apply_grants(client: &GuacamoleClient, username: &str, grants: &GrantArgs, grant: bool) -> Result<()> {
    if grants.system.is_empty() && grants.connection.is_empty() && grants.connection_group.is_empty() {
        anyhow::bail!("Nothing to change. Use --system, --connection or --connection-group");
    }

    let permissions = client.user_permissions(username);
    let object_permission: ObjectPermission = grants.permission.parse()?;

    for name in &grants.system {
        let permission: SystemPermission = name.parse()?;
        if grant {
            permissions.grant_system(permission).await?;
        } else {
            permissions.revoke_system(permission).await?;
        }
    }

    let objects = grants
        .connection
        .iter()
        .map(|id| (ObjectKind::Connection, id))
        .chain(grants.connection_group.iter().map(|id| (ObjectKind::ConnectionGroup, id)));
    for (kind, identifier) in objects {
        if grant {
            permissions.grant_object(kind, identifier, object_permission).await?;
        } else {
            permissions.revoke_object(kind, identifier, object_permission).await?;
        }
    }
    Ok(())
}

async fn groups(cli: &Cli, client: &GuacamoleClient, action: &GroupCommands) -> Result<()> {
    let api = client.user_groups();
    match action {
        GroupCommands::List => {
            let groups = api.list().await?;
            if cli.json {
                return output::print_json(&groups);
            }
            output::print_groups(&groups);
        }
        GroupCommands::Show { identifier } => {
            let group = api.get(identifier).await?;
            let users = api.member_users(identifier).await?;
            let member_groups = api.member_user_groups(identifier).await?;
            let parents = api.parent_groups(identifier).await?;
            if cli.json {
                return output::print_json(&serde_json::json!({
                    "group": group,
                    "memberUsers": users,
                    "memberUserGroups": member_groups,
                    "parentGroups": parents,
                }));
            }
            println!();
            println!("{}", format!("User group: {}", group.identifier).bold().green());
            println!("  Disabled: {}", group.disabled);
            output::print_identifiers("Member users", &users);
            output::print_identifiers("Member groups", &member_groups);
            output::print_identifiers("Parent groups", &parents);
        }
        GroupCommands::Create { identifier, disabled } => {
            let mut group = UserGroup::new(identifier.as_str());
            group.disabled = *disabled;
            let created = api.create(&group).await?;
            if cli.json {
                return output::print_json(&created);
            }
            done(format!("User group '{}' created", created.identifier));
        }
        GroupCommands::Delete { identifier } => {
            if confirm(cli, format!("Delete user group '{}'?", identifier.yellow()))? {
                api.delete(identifier).await?;
                done(format!("User group '{}' deleted", identifier));
            }
        }
        GroupCommands::Members { identifier } => {
            let users = api.member_users(identifier).await?;
            let member_groups = api.member_user_groups(identifier).await?;
            if cli.json {
                return output::print_json(&serde_json::json!({
                    "users": users,
                    "groups": member_groups,
                }));
            }
            output::print_identifiers("Member users", &users);
            output::print_identifiers("Member groups", &member_groups);
        }
        GroupCommands::AddMember { identifier, member, group } => {
            if *group {
                api.add_member_user_group(identifier, member).await?;
            } else {
                api.add_member_user(identifier, member).await?;
            }
            done(format!("Added '{}' to '{}'", member, identifier));
        }
        GroupCommands::RemoveMember { identifier, member, group } => {
            if *group {
                api.remove_member_user_group(identifier, member).await?;
            } else {
                api.remove_member_user(identifier, member).await?;
            }
            done(format!("Removed '{}' from '{}'", member, identifier));
        }
        GroupCommands::Permissions { identifier } => {
            let permissions = api.permissions(identifier).await?;
            if cli.json {
                return output::print_json(&permissions);
            }
            output::print_permissions(identifier, &permissions);
        }
    }
    Ok(())
}

fn build_connection(
    name: &str,
    protocol: &str,
    hostname: &str,
    port: Option<u16>,
    group: &str,
    params: &[(String, String)],
) -> Connection {
    let mut connection = match protocol {
        "rdp" => Connection::rdp(name, hostname),
        "ssh" => Connection::ssh(name, hostname),
        "vnc" => Connection::vnc(name, hostname),
        other => Connection::new(name, other).with_hostname(hostname),
    };
    if let Some(port) = port {
        connection = connection.with_port(port);
    }
    connection = connection.in_group(group);
    for (key, value) in params {
        connection = connection.with_parameter(key.as_str(), value.as_str());
    }
    connection
}

async fn connections(cli: &Cli, client: &GuacamoleClient, action: &ConnectionCommands) -> Result<()> {
    let api = client.connections();
    match action {
        ConnectionCommands::List => {
            let connections = api.list().await?;
            if cli.json {
                return output::print_json(&connections);
            }
            output::print_connections(&connections);
        }
        ConnectionCommands::Show { identifier } => {
            let mut connection = api.get(identifier).await?;
            connection.parameters = api.parameters(identifier).await?;
            if cli.json {
                return output::print_json(&connection);
            }
            output::print_connection(&connection);
        }
        ConnectionCommands::Create {
            name,
            protocol,
            hostname,
            target_port,
            group,
            params,
        } => {
            let connection = build_connection(name, protocol, hostname, *target_port, group, params);
            let created = api
                .create(&connection)
                .await
                .with_context(|| format!("Failed to create connection '{}'", name))?;
            if cli.json {
                return output::print_json(&created);
            }
            done(format!(
                "Connection '{}' created with ID {}",
                created.name,
                created.identifier.as_deref().unwrap_or("?")
            ));
        }
        ConnectionCommands::Delete { identifier } => {
            if confirm(cli, format!("Delete connection '{}'?", identifier.yellow()))? {
                api.delete(identifier).await?;
                done(format!("Connection '{}' deleted", identifier));
            }
        }
        ConnectionCommands::Find { name, regex, group } => {
            let matcher = if *regex {
                NameMatch::pattern(name)?
            } else {
                NameMatch::exact(name.as_str())
            };
            let found = client.connection_groups().find_connection(group, &matcher).await?;
            if cli.json {
                return output::print_json(&found);
            }
            if found.is_empty() {
                println!("{}", format!("No connection matches '{}'", name).yellow());
                return Ok(());
            }
            output::print_connections_found(&found);
        }
        ConnectionCommands::History { identifier } => {
            let history = api.history(identifier).await?;
            if cli.json {
                return output::print_json(&history);
            }
            output::print_history(&history);
        }
    }
    Ok(())
}

async fn connection_groups(
    cli: &Cli,
    client: &GuacamoleClient,
    action: &ConnectionGroupCommands,
) -> Result<()> {
    let api = client.connection_groups();
    match action {
        ConnectionGroupCommands::List => {
            let groups = api.list().await?;
            if cli.json {
                return output::print_json(&groups);
            }
            output::print_connection_groups(&groups);
        }
        ConnectionGroupCommands::Tree { identifier } => {
            let tree = api.tree(identifier).await?;
            if cli.json {
                return output::print_json(&tree);
            }
            output::print_tree(&tree);
        }
        ConnectionGroupCommands::Create { name, parent, balancing } => {
            let group = if *balancing {
                ConnectionGroup::balancing(name.as_str(), parent.as_str())
            } else {
                ConnectionGroup::organizational(name.as_str(), parent.as_str())
            };
            let created = api.create(&group).await?;
            if cli.json {
                return output::print_json(&created);
            }
            done(format!(
                "Connection group '{}' created with ID {}",
                created.name,
                created.identifier.as_deref().unwrap_or("?")
            ));
        }
        ConnectionGroupCommands::Delete { identifier } => {
            if confirm(
                cli,
                format!("Delete connection group '{}' and all of its contents?", identifier.yellow()),
            )? {
                api.delete(identifier).await?;
                done(format!("Connection group '{}' deleted", identifier));
            }
        }
    }
    Ok(())
}

async fn sharing_profiles(
    cli: &Cli,
    client: &GuacamoleClient,
    action: &SharingProfileCommands,
) -> Result<()> {
    let api = client.sharing_profiles();
    match action {
        SharingProfileCommands::List => {
            let profiles = api.list().await?;
            if cli.json {
                return output::print_json(&profiles);
            }
            output::print_sharing_profiles(&profiles);
        }
        SharingProfileCommands::Create { name, connection, read_only } => {
            let mut profile = SharingProfile::new(name.as_str(), connection.as_str());
            if *read_only {
                profile = profile.read_only();
            }
            let created = api.create(&profile).await?;
            if cli.json {
                return output::print_json(&created);
            }
            done(format!(
                "Sharing profile '{}' created with ID {}",
                created.name,
                created.identifier.as_deref().unwrap_or("?")
            ));
        }
        SharingProfileCommands::Delete { identifier } => {
            if confirm(cli, format!("Delete sharing profile '{}'?", identifier.yellow()))? {
                api.delete(identifier).await?;
                done(format!("Sharing profile '{}' deleted", identifier));
            }
        }
    }
    Ok(())
}

async fn sessions(cli: &Cli, client: &GuacamoleClient, action: &SessionCommands) -> Result<()> {
    let api = client.active_connections();
    match action {
        SessionCommands::List => {
            let sessions = api.list().await?;
            if cli.json {
                return output::print_json(&sessions);
            }
            output::print_sessions(&sessions);
        }
        SessionCommands::Kill { identifiers } => {
            let prompt = format!("Terminate {} active connection(s)?", identifiers.len());
            if !confirm(cli, prompt)? {
                return Ok(());
            }
            if let [identifier] = identifiers.as_slice() {
                match api.kill(identifier).await {
                    Ok(()) => done(format!("Active connection {} terminated", identifier)),
                    Err(e) if e.is_not_found() => {
                        println!("{}", format!("Active connection {} was not found", identifier).yellow());
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                api.kill_many(identifiers.as_slice()).await?;
                done(format!("{} active connections terminated", identifiers.len()));
            }
        }
        SessionCommands::Share { identifier, sharing_profile } => {
            let credentials = api.sharing_credentials(identifier, sharing_profile).await?;
            if cli.json {
                return output::print_json(&credentials);
            }
            match credentials.share_key() {
                Some(key) => println!("{}", key),
                None => anyhow::bail!("Server returned no share key"),
            }
        }
    }
    Ok(())
}

async fn schema(cli: &Cli, client: &GuacamoleClient, action: &SchemaCommands) -> Result<()> {
    let api = client.schema();
    match action {
        SchemaCommands::Protocols => {
            let protocols = api.protocols().await?;
            if cli.json {
                return output::print_json(&protocols);
            }
            output::print_protocols(&protocols);
        }
        SchemaCommands::Attributes { kind } => {
            let forms = match kind {
                AttributeKind::User => api.user_attributes().await?,
                AttributeKind::UserGroup => api.user_group_attributes().await?,
                AttributeKind::Connection => api.connection_attributes().await?,
                AttributeKind::ConnectionGroup => api.connection_group_attributes().await?,
                AttributeKind::SharingProfile => api.sharing_profile_attributes().await?,
            };
            if cli.json {
                return output::print_json(&forms);
            }
            output::print_forms(&forms);
        }
    }
    Ok(())
}
