use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use firstboot::commands;
use firstboot::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing with RUST_LOG env filter
    // e.g., RUST_LOG=firstboot=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let host = cli.host();
    tracing::debug!(id = ?host.id(), version = ?host.version_id(), "Loaded os-release");

    match cli.command {
        Commands::Render(args) => commands::render::run(args, &host),
        Commands::Detect(args) => commands::detect::run(args, &host),
        Commands::Flags(args) => commands::flags::run(args),
        Commands::Installed(args) => commands::installed::run(args, &host),
        Commands::Schema(args) => commands::schema::run(args),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
