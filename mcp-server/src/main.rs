use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod mcp_handler;
mod use_cases;

use lotto_suggest::config;
use lotto_suggest::connection::conn;
use lotto_suggest::presets::seed_default_lotteries;
use mcp_handler::{MCPHandler, stdio};
use use_cases::{ApiUseCase, LotteryUseCase, SuggestionUseCase};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Let's pick some lottery numbers.");

    let db_conn = conn(&config.database_url)?;
    seed_default_lotteries(&db_conn)?;
    let db_conn_arc = Arc::new(db_conn);

    let lottery_use_case = LotteryUseCase::new(Arc::clone(&db_conn_arc));
    let suggestion_use_case =
        SuggestionUseCase::new(Arc::clone(&db_conn_arc), config.weights, config.seed);
    let api_use_case = ApiUseCase::new(Arc::clone(&db_conn_arc), config.feed_url.clone());

    let handler = MCPHandler::new(
        Arc::new(lottery_use_case),
        Arc::new(suggestion_use_case),
        Arc::new(api_use_case),
    );

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
