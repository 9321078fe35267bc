//! Exporter configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub database_url: String,
    /// Output path for the snapshot JSON.
    pub out_path: String,
    /// How many recent matches to embed.
    pub matches_limit: i64,
}

impl ExportConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("SUPABASE_DB_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .context("SUPABASE_DB_URL (or DATABASE_URL) must be set")?;

        Ok(Self {
            database_url,
            out_path: env::var("HUB_EXPORT_OUT").unwrap_or_else(|_| "data/hub.json".to_string()),
            matches_limit: env::var("HUB_EXPORT_MATCHES_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(200),
        })
    }
}
