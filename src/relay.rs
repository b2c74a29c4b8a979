use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::campaign::Campaign;
use crate::error::SessionError;

pub const SOURCE_TAG: &str = "drops_scraper";

/// Batch-level metadata sent alongside the campaigns.
#[derive(Debug, Clone)]
pub struct RelayMeta {
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl RelayMeta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            source: SOURCE_TAG.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    campaigns: &'a [Campaign],
    timestamp: String,
    source: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ack {
    success: bool,
    campaigns_processed: Option<usize>,
    error: Option<String>,
}

/// Hands a finished batch to the ingestion endpoint. One attempt, no retry.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Returns how many campaigns the endpoint reports as stored.
    async fn send(
        &self,
        endpoint: Option<&str>,
        campaigns: &[Campaign],
        meta: &RelayMeta,
    ) -> Result<usize, SessionError>;
}

pub struct HttpRelay {
    client: reqwest::Client,
}

impl HttpRelay {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn send(
        &self,
        endpoint: Option<&str>,
        campaigns: &[Campaign],
        meta: &RelayMeta,
    ) -> Result<usize, SessionError> {
        let endpoint = endpoint.ok_or(SessionError::MissingConfig)?;
        let payload = Payload {
            campaigns,
            timestamp: meta.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            source: &meta.source,
        };

        let response = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Transport(format!("endpoint returned HTTP {}", status)));
        }
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        match serde_json::from_str::<Ack>(&body) {
            Ok(ack) if !ack.success => Err(SessionError::Rejected(
                ack.error.unwrap_or_else(|| "no reason given".to_string()),
            )),
            Ok(ack) => {
                let stored = ack.campaigns_processed.unwrap_or(campaigns.len());
                info!("Relayed {} campaigns ({} stored)", campaigns.len(), stored);
                Ok(stored)
            }
            Err(_) => {
                debug!("Unrecognised acknowledgement body: {:.200}", body);
                Ok(campaigns.len())
            }
        }
    }
}
