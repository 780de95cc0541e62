use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use truthforge::cli::{Cli, Commands};
use truthforge::{Config, TruthForge, commands, config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let app = TruthForge::new(Config::from_cli(&cli))?;

    match cli.command {
        Commands::Ingest(args) => commands::handle_ingest(args, &app).await?,
        Commands::Search(args) => commands::handle_search(args, &app).await?,
        Commands::Verify(args) => commands::handle_verify(args, &app).await?,
        Commands::Fix(args) => commands::handle_fix(args, &app).await?,
        Commands::Models => commands::handle_models(&app).await?,
        Commands::Stats => commands::handle_stats(&app).await?,
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `-v`/`-q` pick the level. Logs go to stderr so command
/// output stays pipeable.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::log_filter(verbose, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
