use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dt-cli", about = "Replay analytics calls into the event log")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Feed a JSON-lines file of SDK calls through the SDK
    Ingest(IngestArgs),
}

#[derive(Args, Clone, Debug)]
pub struct IngestArgs {
    /// Path to a TOML or HCL configuration file
    #[arg(long, default_value = "dt.toml", env = "DT_CONFIG")]
    pub config: PathBuf,

    /// JSON-lines file, one call per line
    #[arg(long)]
    pub input: PathBuf,

    /// Enable the core's diagnostic output
    #[arg(long)]
    pub log: bool,
}
