use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "warren")]
#[command(version)]
#[command(about = "Declarative RabbitMQ user permissions via rabbitmqctl", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/warren/config.toml)
    #[arg(short, long, global = true, env = "WARREN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the rabbitmqctl executable
    #[arg(long, global = true, env = "RABBITMQCTL")]
    pub rabbitmqctl: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show current vs declared permissions
    Status(StatusArgs),

    /// Preview what apply would change
    Diff(TargetArgs),

    /// Converge the broker to the declared permissions
    Apply(ApplyArgs),

    /// List a user's permissions on every vhost
    List {
        /// User name
        user: String,
    },

    /// Set one or more permissions of user@vhost, leaving the others as they are
    Set(SetArgs),

    /// Clear all permissions of user@vhost
    Clear {
        /// Permission name (user@vhost)
        name: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only this user, or this user@vhost
    pub target: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Only this user, or this user@vhost
    pub target: Option<String>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only this user, or this user@vhost
    pub target: Option<String>,

    /// Show what would change without running rabbitmqctl
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct SetArgs {
    /// Permission name (user@vhost)
    pub name: String,

    /// Configure permission regex
    #[arg(long)]
    pub configure: Option<String>,

    /// Write permission regex
    #[arg(long)]
    pub write: Option<String>,

    /// Read permission regex
    #[arg(long)]
    pub read: Option<String>,
}
