//! Run one aggregation against the configured feeds and print the JSON body.

use market_news_aggregator::{AppState, NewsResponse};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let state = AppState::from_env()?;
    let body = match state.aggregator.aggregate().await {
        Ok(news) => NewsResponse::ok(news),
        Err(e) => {
            tracing::error!(error = ?e, "news aggregation failed");
            NewsResponse::failed()
        }
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    if !body.success {
        std::process::exit(1);
    }
    Ok(())
}
