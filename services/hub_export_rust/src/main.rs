//! One-shot hub snapshot exporter.
//!
//! Reads the league database, reconciles every tournament, and writes a
//! single JSON file the static hub front-end serves as-is.

mod config;

use anyhow::{Context, Result};
use config::ExportConfig;
use dotenv::dotenv;
use leaguehub_core::db::{create_pool, DbPoolConfig, PgLeagueStore};
use leaguehub_core::scoring::MatchScorer;
use leaguehub_core::utils::json_safe;
use leaguehub_core::views::build_hub_payload;
use log::info;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting hub export...");
    let config = ExportConfig::from_env()?;

    let pool = create_pool(&config.database_url, DbPoolConfig::batch()).await?;
    let store = PgLeagueStore::new(pool);
    let scorer = MatchScorer::new();

    let payload = build_hub_payload(&store, config.matches_limit, &scorer).await?;
    info!(
        "Snapshot built: {} matches, {} teams, {} tournaments, {} schedules",
        payload.summary.match_count,
        payload.summary.team_count,
        payload.summary.tournament_count,
        payload.summary.schedule_count
    );

    let value = json_safe(serde_json::to_value(&payload)?);
    let rendered = serde_json::to_string_pretty(&value)?;

    let out = Path::new(&config.out_path);
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    tokio::fs::write(out, rendered)
        .await
        .with_context(|| format!("writing {}", out.display()))?;

    info!("Hub snapshot written to {}", out.display());
    Ok(())
}
