//! OpenAI-compatible structured-generation backend

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use topogen::{
    GenerationBackend, GenerationConfig, GenerationError, GenerationProvider, GenerationRequest,
};

use crate::http_client;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OLLAMA_ENDPOINT: &str = "http://localhost:11434/v1/chat/completions";
const SCHEMA_NAME: &str = "company_profile";

/// Chat-completions backend requesting a `json_schema` response format
pub struct OpenAiCompatibleBackend {
    client: Client,
    provider: GenerationProvider,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: Option<String>,
}

impl OpenAiCompatibleBackend {
    /// Create a backend from configuration, reading the API key from the
    /// environment variable the configuration names
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = http_client(config.timeout_secs)
            .map_err(|e| GenerationError::ConfigError(e.to_string()))?;

        let endpoint = config.endpoint.clone().unwrap_or_else(|| {
            match config.provider {
                GenerationProvider::OpenAI => OPENAI_ENDPOINT,
                GenerationProvider::Ollama => OLLAMA_ENDPOINT,
            }
            .to_string()
        });

        let api_key = match config.provider {
            GenerationProvider::OpenAI => {
                let key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
                if key.is_none() {
                    tracing::warn!(
                        "OpenAI backend created without API key - {} env var not found",
                        config.api_key_env
                    );
                }
                key
            }
            GenerationProvider::Ollama => None,
        };

        tracing::info!(
            "Generation backend: {} model={} endpoint={}",
            config.provider,
            config.model,
            endpoint
        );

        Ok(Self {
            client,
            provider: config.provider,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key,
        })
    }

    /// Replace the API key read from the environment
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn payload(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": request.instructions },
                { "role": "user", "content": request.description }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": SCHEMA_NAME,
                    "schema": request.schema,
                    "strict": false
                }
            }
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &'static str {
        match self.provider {
            GenerationProvider::OpenAI => "OpenAI",
            GenerationProvider::Ollama => "Ollama",
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");

        match (&self.api_key, self.provider) {
            (Some(key), _) => builder = builder.header("Authorization", format!("Bearer {}", key)),
            (None, GenerationProvider::OpenAI) => {
                return Err(GenerationError::ConfigError(
                    "No OpenAI API key configured".to_string(),
                ));
            }
            (None, GenerationProvider::Ollama) => {}
        }

        tracing::debug!(
            "[{}] Sending structured request: model={}, description_len={}",
            self.name(),
            self.model,
            request.description.len()
        );

        let response = builder
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(GenerationError::RateLimited);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;

        parse_content(&json)
    }
}

/// The JSON document carried in `choices[0].message.content`
fn parse_content(json: &Value) -> Result<Value, GenerationError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| GenerationError::ParseError("response has no message content".to_string()))?;

    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| GenerationError::ParseError(format!("message content is not JSON: {}", e)))
}

/// Some local models wrap JSON output in a markdown fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
