//! Third-party profile enrichment.
//!
//! Avatar and profile URLs are derived locally; persona names come from the
//! Steam Web API when a key is configured. All lookups are best-effort: a
//! failure or timeout leaves the enriched field absent, it never fails a
//! response.

use crate::identity::{canonical_player_key, steam64_from_str};
use crate::ttl_cache::TtlCache;
use crate::types::Profile;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Deterministic placeholder avatar for players without a usable Discord id.
pub fn default_discord_avatar(discord_id: Option<&str>) -> String {
    let seed = discord_id
        .and_then(|id| id.trim().parse::<u64>().ok())
        .map(|id| id % 5)
        .unwrap_or(0);
    format!("https://cdn.discordapp.com/embed/avatars/{seed}.png")
}

/// Avatar URL for a linked Discord account, placeholder otherwise.
pub fn discord_avatar_url(discord_id: Option<&str>) -> String {
    match discord_id.map(str::trim) {
        Some(id) if !id.is_empty() => format!("https://unavatar.io/discord/{id}"),
        _ => default_discord_avatar(discord_id),
    }
}

/// Community profile URL: direct for SteamID64-shaped ids, a user search
/// otherwise.
pub fn steam_profile_url(steam_id: Option<&str>) -> Option<String> {
    let sid = steam_id.map(str::trim).filter(|s| !s.is_empty())?;
    if sid.len() >= 16 && sid.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("https://steamcommunity.com/profiles/{sid}"))
    } else {
        Some(format!(
            "https://steamcommunity.com/search/users/#text={sid}"
        ))
    }
}

/// Best-effort keyed profile lookup. `None` means "no enrichment available".
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve(&self, identity: &str) -> Option<Profile>;
}

// ============================================================================
// Steam Web API
// ============================================================================

#[derive(Debug, Deserialize)]
struct SummariesEnvelope {
    response: SummariesBody,
}

#[derive(Debug, Deserialize)]
struct SummariesBody {
    #[serde(default)]
    players: Vec<PlayerSummary>,
}

#[derive(Debug, Deserialize)]
struct PlayerSummary {
    personaname: Option<String>,
    avatarfull: Option<String>,
}

/// `ISteamUser/GetPlayerSummaries` client.
#[derive(Clone)]
pub struct SteamProfileClient {
    client: Client,
    api_key: String,
}

impl SteamProfileClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    async fn fetch_summary(&self, steam64: u64) -> Result<Profile> {
        let url = format!(
            "https://api.steampowered.com/ISteamUser/GetPlayerSummaries/v2/?key={}&steamids={}",
            self.api_key, steam64
        );
        let envelope: SummariesEnvelope = self.client.get(&url).send().await?.json().await?;
        let summary = envelope
            .response
            .players
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no summary returned for {steam64}"))?;
        Ok(Profile {
            display_name: summary.personaname,
            avatar_url: summary.avatarfull,
        })
    }
}

#[async_trait]
impl ProfileResolver for SteamProfileClient {
    async fn resolve(&self, identity: &str) -> Option<Profile> {
        let steam64 = steam64_from_str(identity)?;
        match self.fetch_summary(steam64).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                debug!("steam profile lookup failed for {identity}: {err:#}");
                None
            }
        }
    }
}

// ============================================================================
// Caching wrapper
// ============================================================================

/// Fronts any resolver with the short-TTL cache, keyed by canonical
/// identity. Failed lookups are not cached; they retry lazily on the next
/// request.
pub struct CachedProfileResolver<R> {
    inner: R,
    cache: Arc<TtlCache<String, Profile>>,
}

impl<R: ProfileResolver> CachedProfileResolver<R> {
    pub fn new(inner: R, cache: Arc<TtlCache<String, Profile>>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<R: ProfileResolver> ProfileResolver for CachedProfileResolver<R> {
    async fn resolve(&self, identity: &str) -> Option<Profile> {
        let key = canonical_player_key(identity);
        if let Some(profile) = self.cache.get(&key) {
            return Some(profile);
        }
        let profile = self.inner.resolve(identity).await?;
        self.cache.put(key, profile.clone());
        Some(profile)
    }
}
