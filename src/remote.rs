//! Read side of the ingestion endpoint: recent rows, totals, freshness.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_LIMIT: usize = 50;

/// One stored row, keyed by the store's column headers.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredCampaign {
    #[serde(rename = "Timestamp", default, deserialize_with = "lenient_string")]
    pub stored_at: String,
    #[serde(rename = "Campaign ID", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "Game", default, deserialize_with = "lenient_string")]
    pub game: String,
    #[serde(rename = "End Date", default, deserialize_with = "lenient_string")]
    pub end_date: String,
    #[serde(rename = "Status", default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(rename = "Drops Count", default, deserialize_with = "lenient_number")]
    pub drops_count: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_campaigns: i64,
    #[serde(default)]
    pub total_activities: i64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub healthy: bool,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_scrape: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hours_since_last_scrape: Option<f64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
struct CampaignsBody {
    #[serde(default)]
    campaigns: Vec<StoredCampaign>,
}

#[derive(Deserialize)]
struct StatsBody {
    stats: Stats,
}

pub struct RemoteStore {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteStore {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Most recent rows first.
    pub async fn campaigns(&self, limit: usize) -> Result<Vec<StoredCampaign>> {
        let limit = limit.to_string();
        let body: CampaignsBody = self
            .get(&[("action", "getCampaigns"), ("limit", limit.as_str())])
            .await?;
        Ok(body.campaigns)
    }

    pub async fn stats(&self) -> Result<Stats> {
        let body: StatsBody = self.get(&[("action", "getStats")]).await?;
        Ok(body.stats)
    }

    pub async fn health(&self) -> Result<Health> {
        self.get(&[("action", "health")]).await
    }

    async fn get<T: DeserializeOwned>(&self, query: &[(&str, &str)]) -> Result<T> {
        debug!("GET {} {:?}", self.endpoint, query);
        let response = self
            .client
            .get(&self.endpoint)
            .query(query)
            .send()
            .await
            .context("Remote store unreachable")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Remote store returned HTTP {}", status);
        }
        let body: Value = response
            .json()
            .await
            .context("Remote store returned a non-JSON body")?;

        if body.get("success").and_then(Value::as_bool) != Some(true) {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("request not successful");
            return Err(anyhow!("Remote store error: {}", reason));
        }
        Ok(serde_json::from_value(body)?)
    }
}

// Sheet cells come back as whatever type the sheet inferred.

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(d)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
