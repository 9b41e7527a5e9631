//! Topogen Client - HTTP adapters for the Topogen pipeline
//!
//! - [`OpenAiCompatibleBackend`]: structured profile extraction against OpenAI,
//!   Ollama or any OpenAI-compatible chat-completions endpoint
//! - [`TopologyServiceClient`]: the topology-generation service
//!
//! Both map every transport, status and body failure into the core error
//! types, which the pipeline recovers from with its deterministic fallbacks.

pub mod generation;
pub mod topology;

pub use generation::OpenAiCompatibleBackend;
pub use topology::TopologyServiceClient;

/// Build a reqwest client with a request timeout
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
}
