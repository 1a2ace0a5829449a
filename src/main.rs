use anyhow::Result;
use clap::Parser;
use divvy::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("divvy={},sqlx=warn", cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    cli.run().await
}
