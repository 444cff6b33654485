use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dbdesk")]
#[command(about = "Local database desktop backend", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the local HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Refuse every write route
        #[arg(long)]
        read_only: bool,
    },

    /// Redact a JSON payload the way it is redacted before leaving for the
    /// AI model
    Redact {
        /// JSON file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Convert Extended JSON into transport JSON
    Normalize {
        /// JSON file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Manage keyboard shortcuts
    #[command(subcommand)]
    Shortcuts(ShortcutCommands),

    /// Print the config file location and effective settings
    Config,
}

#[derive(Subcommand)]
pub enum ShortcutCommands {
    /// List every action with its bindings
    List,

    /// Bind a combo such as `ctrl+shift+a` as an action's primary shortcut
    Set {
        /// Action id, e.g. mongo.run-query
        action: String,

        combo: String,
    },

    /// Restore the default bindings
    Reset,
}
