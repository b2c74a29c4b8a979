use anyhow::{Context, Result};
use url::Url;

use crate::db::{self, Store};
use crate::error::ConfigError;

pub const MIN_INTERVAL_MINUTES: u32 = 15;
pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;
pub const TARGET_URL: &str = "https://www.twitch.tv/drops/campaigns";

/// Settings read at the start of every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint_url: Option<String>,
    pub interval_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

impl Config {
    pub fn load(store: &Store) -> Result<Self> {
        let endpoint_url = store.get(db::ENDPOINT_URL)?.filter(|u| !u.trim().is_empty());
        let interval_minutes = match store.get(db::INTERVAL_MINUTES)? {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Stored interval '{}' is not a number", raw))?,
            None => DEFAULT_INTERVAL_MINUTES,
        };
        Ok(Self {
            endpoint_url,
            interval_minutes,
        })
    }

    pub fn save(&self, store: &Store) -> Result<()> {
        store.set_many(&[
            (db::ENDPOINT_URL, self.endpoint_url.clone()),
            (db::INTERVAL_MINUTES, Some(self.interval_minutes.to_string())),
        ])?;
        Ok(())
    }

    pub fn set_interval(&mut self, minutes: u32) -> Result<(), ConfigError> {
        self.interval_minutes = validate_interval(minutes)?;
        Ok(())
    }

    pub fn set_endpoint(&mut self, url: &str) -> Result<(), ConfigError> {
        self.endpoint_url = Some(validate_endpoint(url)?);
        Ok(())
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}

pub fn validate_interval(minutes: u32) -> Result<u32, ConfigError> {
    if minutes < MIN_INTERVAL_MINUTES {
        return Err(ConfigError::IntervalBelowFloor {
            got: minutes,
            floor: MIN_INTERVAL_MINUTES,
        });
    }
    Ok(minutes)
}

pub fn validate_endpoint(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host().is_some() => Ok(trimmed.to_string()),
        _ => Err(ConfigError::InvalidEndpoint(raw.to_string())),
    }
}
