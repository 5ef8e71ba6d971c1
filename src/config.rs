//! Bot configuration read from the environment (and `.env`, loaded in `main`).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::commands::music::utils::autoplay_manager::{
    DEFAULT_AUTOPLAY_FETCH_LIMIT, DEFAULT_AUTOPLAY_PICKS, DEFAULT_HISTORY_CAPACITY,
};
use crate::commands::music::utils::guild_player::PlayerSettings;
use crate::commands::music::utils::music_manager::{MusicError, MusicResult};

const DEFAULT_PREFIX: &str = "-";
const DEFAULT_YT_DLP: &str = "yt-dlp";
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub discord_token: String,
    pub command_prefix: String,
    pub yt_dlp_path: String,
    pub idle_timeout: Duration,
    pub history_capacity: usize,
    pub autoplay_picks: usize,
    pub autoplay_fetch_limit: usize,
}

impl BotConfig {
    pub fn from_env() -> MusicResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MusicResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let discord_token = get("DISCORD_TOKEN")
            .ok_or_else(|| MusicError::ConfigError("DISCORD_TOKEN is not set".to_string()))?;

        let idle_timeout = match get("IDLE_TIMEOUT") {
            Some(raw) => humantime::parse_duration(&raw).map_err(|e| {
                MusicError::ConfigError(format!("IDLE_TIMEOUT '{}' is invalid: {}", raw, e))
            })?,
            None => DEFAULT_IDLE_TIMEOUT,
        };

        Ok(Self {
            discord_token,
            command_prefix: get("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            yt_dlp_path: get("YT_DLP_PATH").unwrap_or_else(|| DEFAULT_YT_DLP.to_string()),
            idle_timeout,
            history_capacity: parse_count(
                "HISTORY_CAPACITY",
                get("HISTORY_CAPACITY"),
                DEFAULT_HISTORY_CAPACITY,
            )?,
            autoplay_picks: parse_count(
                "AUTOPLAY_PICKS",
                get("AUTOPLAY_PICKS"),
                DEFAULT_AUTOPLAY_PICKS,
            )?,
            autoplay_fetch_limit: parse_count(
                "AUTOPLAY_FETCH_LIMIT",
                get("AUTOPLAY_FETCH_LIMIT"),
                DEFAULT_AUTOPLAY_FETCH_LIMIT,
            )?,
        })
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            idle_timeout: self.idle_timeout,
            history_capacity: self.history_capacity,
            autoplay_picks: self.autoplay_picks,
            autoplay_fetch_limit: self.autoplay_fetch_limit,
        }
    }
}

/// Parses a positive count, falling back to `default` when unset.
fn parse_count(key: &str, raw: Option<String>, default: usize) -> MusicResult<usize> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match usize::from_str(&raw) {
        Ok(0) => Err(MusicError::ConfigError(format!("{} must be at least 1", key))),
        Ok(value) => Ok(value),
        Err(e) => Err(MusicError::ConfigError(format!(
            "{} '{}' is invalid: {}",
            key, raw, e
        ))),
    }
}
