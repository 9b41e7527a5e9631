//! Topology-generation service client

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use topogen::{TopologyError, TopologyPayload, TopologyRequestor, TopologyServiceConfig};

use crate::http_client;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    description: &'a str,
}

/// Client for the topology service's generate endpoint
#[derive(Clone)]
pub struct TopologyServiceClient {
    base_url: String,
    generate_url: String,
    client: Client,
}

impl TopologyServiceClient {
    pub fn from_config(config: &TopologyServiceConfig) -> Result<Self, TopologyError> {
        let client = http_client(config.timeout_secs)
            .map_err(|e| TopologyError::ConfigError(e.to_string()))?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let path = config.generate_path.trim_start_matches('/');

        Ok(Self {
            generate_url: format!("{}/{}", base_url, path),
            base_url,
            client,
        })
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }
}

#[async_trait]
impl TopologyRequestor for TopologyServiceClient {
    async fn request_topology(&self, description: &str) -> Result<TopologyPayload, TopologyError> {
        tracing::debug!("Requesting topology from {}", self.generate_url);

        let resp = self
            .client
            .post(&self.generate_url)
            .json(&GenerateRequest { description })
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("Topology request failed: {}", e);
                TopologyError::NotReachable(self.base_url.clone())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error")
                        .or_else(|| v.get("detail"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(TopologyError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        resp.json()
            .await
            .map_err(|e| TopologyError::ParseError(e.to_string()))
    }
}
