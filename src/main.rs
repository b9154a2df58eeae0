use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use frontdesk::cli::{self, Cli, Console};
use frontdesk::config::AppConfig;
use frontdesk::db;
use frontdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // stdout carries the conversation; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    tracing::info!(database = %config.database_url, "database ready");

    let state = AppState::new(conn, config);
    let mut console = Console::new(BufReader::new(tokio::io::stdin()), std::io::stdout());

    cli::run(&state, cli.command, &mut console).await
}
