//! Command-line interface.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "report-generation", version, about = "Report Generation service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The chosen command, `serve` when none was given.
    pub fn command(self) -> Command {
        self.command
            .unwrap_or_else(|| Command::Serve(ServeArgs::default()))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve(ServeArgs),
    /// Manage database schema migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Bind host, overrides HOST
    #[arg(long)]
    pub host: Option<String>,
    /// Bind port, overrides PORT
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Subcommand)]
pub enum MigrateAction {
    /// Create a new empty reversible revision
    Revision {
        /// Revision message, used in the file name
        #[arg(short, long)]
        message: String,
        /// Accepted for compatibility; schema diffing is not supported
        #[arg(long)]
        autogenerate: bool,
    },
    /// Apply pending migrations
    Upgrade {
        #[arg(default_value = "head")]
        revision: String,
    },
    /// Revert migrations: -N steps back, or down to a version
    Downgrade {
        #[arg(default_value = "-1", allow_negative_numbers = true)]
        revision: i64,
    },
    /// Show applied migrations
    Current,
}
