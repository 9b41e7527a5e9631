//! Scripted backends for unit tests

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    generation::{GenerationBackend, GenerationError, GenerationRequest},
    model::TopologyPayload,
    topology::{TopologyError, TopologyRequestor},
};

/// Generation backend replaying queued responses, then reporting unavailable
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Value, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    pub fn returning(responses: Vec<Result<Value, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::NotAvailable("script exhausted".to_string())))
    }
}

/// Topology requestor replaying queued payloads, optionally after a delay
pub struct ScriptedTopology {
    responses: Mutex<VecDeque<Result<TopologyPayload, TopologyError>>>,
    descriptions: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedTopology {
    pub fn returning(responses: Vec<Result<TopologyPayload, TopologyError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            descriptions: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay_ms(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.descriptions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopologyRequestor for ScriptedTopology {
    async fn request_topology(&self, description: &str) -> Result<TopologyPayload, TopologyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.descriptions.lock().unwrap().push(description.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or(Err(TopologyError::Disabled))
    }
}
