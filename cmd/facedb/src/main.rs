//! facedb - inspect and maintain the face identity database.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{DeleteCommand, GroupsCommand, ListCommand, ShowCommand, StatsCommand, VerifyCommand};

/// facedb - inspect and maintain the face identity database.
///
/// The database path comes from the config file, then from the
/// FACE_RECOGNITION_DB environment variable, then from --db.
#[derive(Parser)]
#[command(name = "facedb")]
#[command(about = "Face identity database tool")]
#[command(version)]
pub struct Cli {
    /// Config file (YAML)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database file, overrides config and environment
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List identities
    List(ListCommand),
    /// Show one identity with its encodings and recent detections
    Show(ShowCommand),
    /// Detection statistics for an identity
    Stats(StatsCommand),
    /// List groups
    Groups(GroupsCommand),
    /// Check stored encodings against the configured dimension
    Verify(VerifyCommand),
    /// Soft-delete an identity
    Delete(DeleteCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::List(cmd) => cmd.run(&cli),
        Commands::Show(cmd) => cmd.run(&cli),
        Commands::Stats(cmd) => cmd.run(&cli),
        Commands::Groups(cmd) => cmd.run(&cli),
        Commands::Verify(cmd) => cmd.run(&cli),
        Commands::Delete(cmd) => cmd.run(&cli),
    }
}
