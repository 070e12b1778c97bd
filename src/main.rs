use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing - only show logs with --verbose
    let filter = if cli.verbose {
        EnvFilter::new("epicflow=debug")
    } else {
        EnvFilter::new("epicflow=warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Progress(args) => cli::progress::execute(args),
        Commands::Velocity(args) => cli::velocity::execute(args),
        Commands::Gates(args) => cli::gates::execute(args).await,
        Commands::Parse(args) => cli::parse::execute(args),
        Commands::Budget(args) => cli::budget::execute(args),
        Commands::Close(args) => cli::close::execute(args),
        Commands::Schema => cli::schema::execute(),
    }
}
