use micro_multipart::MultipartConfig;
use serde::Deserialize;
use std::collections::HashMap;

/// Server side configuration consumed by the filter chain and the body processor.
///
/// Loading it is up to the embedding application; every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub multipart: MultipartConfig,
    /// worker pools that async-wrapped filters can be bound to, by name
    pub executors: HashMap<String, ExecutorConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub worker_threads: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { worker_threads: 4 }
    }
}

impl ServerConfig {
    pub fn with_multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }

    pub fn with_executor(mut self, name: impl Into<String>, config: ExecutorConfig) -> Self {
        self.executors.insert(name.into(), config);
        self
    }
}
