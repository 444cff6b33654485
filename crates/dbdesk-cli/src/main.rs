mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use dbdesk_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Commands::Serve {
            host,
            port,
            read_only,
        } => {
            let config = Config::load()?;
            commands::serve::handle(config, host, port, read_only).await
        }
        cli::Commands::Redact { file } => {
            let config = Config::load()?;
            commands::redact::handle(&config, file.as_deref())
        }
        cli::Commands::Normalize { file } => commands::normalize::handle(file.as_deref()),
        cli::Commands::Shortcuts(cmd) => commands::shortcuts::handle(cmd),
        cli::Commands::Config => commands::show_config(),
    }
}
