use anyhow::{Context, Result};
use rusqlite::Connection;
use std::time::Duration;
use tracing::{info, warn};

use crate::database::get_active_lotteries;
use crate::import::{DrawFeed, ImportReport, save_feed_draws};

pub async fn fetch_draw_feed(
    client: &reqwest::Client,
    feed_url: &str,
    lottery: &str,
) -> Result<DrawFeed> {
    let response = client
        .get(feed_url)
        .query(&[("lottery", lottery)])
        .send()
        .await
        .with_context(|| format!("Failed to reach draw feed {}", feed_url))?
        .error_for_status()?;

    let feed: DrawFeed = response.json().await.context("Invalid draw feed payload")?;
    Ok(feed)
}

/// Pulls recent results for every active lottery and stores the new ones.
///
/// A failing lottery is logged and skipped so the others still sync.
pub async fn fetch_and_save_draws(conn: &Connection, feed_url: &str) -> Result<ImportReport> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let mut report = ImportReport::default();

    for lottery in get_active_lotteries(conn)? {
        info!("🔍 Fetching {} results from {}", lottery.name, feed_url);

        match fetch_draw_feed(&client, feed_url, &lottery.name).await {
            Ok(feed) => {
                if !feed.lottery.eq_ignore_ascii_case(&lottery.name) {
                    warn!(
                        "✗ Feed answered with {} when asked for {}",
                        feed.lottery, lottery.name
                    );
                    continue;
                }
                let saved = save_feed_draws(conn, &lottery, &feed.draws)?;
                info!(
                    "✓ {}: {} new draws, {} already stored, {} rejected",
                    lottery.name, saved.inserted, saved.duplicates, saved.rejected
                );
                report.merge(saved);
            }
            Err(e) => {
                warn!("✗ Error fetching results for {}: {:#}", lottery.name, e);
            }
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Ok(report)
}
