// src/submit/client.rs
use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    Client,
};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::campaign::CreateCampaignsBody;
use crate::config::Config;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("expected JSON but received {0:?}")]
    NotJson(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One entry of the response's `tasks` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub campaign_name: String,
    pub status: String,
    pub raw: Value,
}

impl Task {
    fn from_value(raw: Value) -> Self {
        let field = |name: &str| match raw.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "undefined".to_string(),
        };
        let campaign_name = field("campaign_name");
        let status = field("status");
        Task {
            campaign_name,
            status,
            raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateResponse {
    pub status: u16,
    pub tasks: Vec<Task>,
}

/// Thin client for the create-campaigns endpoint.
#[derive(Debug, Clone)]
pub struct CampaignClient {
    http: Client,
    endpoint: Url,
    bypass_name: HeaderName,
    bypass_value: HeaderValue,
}

impl CampaignClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;
        let bypass_name = HeaderName::from_bytes(config.bypass_header.name.as_bytes())
            .with_context(|| format!("invalid header name {:?}", config.bypass_header.name))?;
        let bypass_value = HeaderValue::from_str(&config.bypass_header.value)
            .with_context(|| format!("invalid header value {:?}", config.bypass_header.value))?;

        Ok(Self {
            http,
            endpoint: config.endpoint_url()?,
            bypass_name,
            bypass_value,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST one body. Non-2xx and non-JSON replies come back as errors.
    #[instrument(level = "debug", skip(self, body), fields(campaigns = body.campaigns.len()))]
    pub async fn create_campaigns(
        &self,
        body: &CreateCampaignsBody,
    ) -> Result<CreateResponse, SubmitError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(self.bypass_name.clone(), self.bypass_value.clone())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "campaign endpoint rejected request");
            return Err(SubmitError::Status(status.as_u16()));
        }

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let text = resp.text().await?;
        if !is_json {
            return Err(SubmitError::NotJson(text));
        }

        let value: Value = serde_json::from_str(&text)?;
        let tasks = value
            .get("tasks")
            .and_then(Value::as_array)
            .map(|tasks| tasks.iter().cloned().map(Task::from_value).collect())
            .unwrap_or_default();

        Ok(CreateResponse {
            status: status.as_u16(),
            tasks,
        })
    }
}
