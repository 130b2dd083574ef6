use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serenity::model::id::ChannelId;

use crate::commands::giveaway::discord::parse_channel_id;
use crate::commands::giveaway::models::{
    EngineConfig, DEFAULT_MAX_DURATION_HOURS, DEFAULT_MAX_WINNERS, MILLIS_PER_HOUR,
};
use crate::commands::giveaway::scheduler::DEFAULT_SWEEP_INTERVAL;
use crate::error::{Error, Result};

pub const DEFAULT_STORE_PATH: &str = "config.json";

/// Settings of the whole bot, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub log_channel: Option<ChannelId>,
    pub default_channel: Option<ChannelId>,
    pub store_path: PathBuf,
    pub sweep_interval: Duration,
    pub max_duration_hours: u64,
    pub max_winners: u32,
}

fn parse_number<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(ref raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|_| {
            Error::Config(format!("`{}` must be a number, got `{}`.", key, raw))
        }),
        _ => Ok(default),
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = match lookup("DISCORD_TOKEN") {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => return Err(Error::Config("`DISCORD_TOKEN` is not set.".to_string())),
        };

        let channel = |key: &str| lookup(key).and_then(|value| parse_channel_id(&value));
        let store_path = lookup("GIVEAWAY_STORE_PATH")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());

        let sweep_interval = parse_number(
            "GIVEAWAY_SWEEP_INTERVAL_SECS",
            lookup("GIVEAWAY_SWEEP_INTERVAL_SECS"),
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )?;
        if sweep_interval == 0 {
            let message = "`GIVEAWAY_SWEEP_INTERVAL_SECS` must be positive.".to_string();
            return Err(Error::Config(message));
        }

        let max_duration_hours = parse_number(
            "GIVEAWAY_MAX_DURATION_HOURS",
            lookup("GIVEAWAY_MAX_DURATION_HOURS"),
            DEFAULT_MAX_DURATION_HOURS,
        )?;
        let max_winners = parse_number(
            "GIVEAWAY_MAX_WINNERS",
            lookup("GIVEAWAY_MAX_WINNERS"),
            DEFAULT_MAX_WINNERS,
        )?;
        if max_duration_hours == 0 || max_winners == 0 {
            let message = "Giveaway limits must be positive.".to_string();
            return Err(Error::Config(message));
        }

        Ok(BotConfig {
            token,
            log_channel: channel("LOG_CHANNEL_ID"),
            default_channel: channel("DEFAULT_GIVEAWAY_CHANNEL_ID"),
            store_path: PathBuf::from(store_path),
            sweep_interval: Duration::from_secs(sweep_interval),
            max_duration_hours,
            max_winners,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        let max_duration_ms = (self.max_duration_hours as i64).saturating_mul(MILLIS_PER_HOUR);
        EngineConfig {
            max_duration_ms,
            max_winners: self.max_winners,
        }
    }
}
