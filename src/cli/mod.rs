//! CLI module - Command-line interface for Tokengate

use clap::{Parser, Subcommand};

/// Tokengate - per-user access token administration
#[derive(Parser)]
#[command(name = "tokengate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server and the expiration sweeper
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Run a single expiration sweep and exit
    Sweep,

    /// Create the schema and reset the admin account to the default
    /// credentials. Destructive: replaces any existing admin record.
    InitDb,
}
