use crate::body::{MultipartBody, RequestBody};
use crate::config::ServerConfig;
use crate::error::ChainBuildError;
use crate::executor::{Executor, Executors};
use crate::filter::{Filter, RequestHandler};
use crate::registry::{FilterRegistration, FilterRegistry};
use crate::{HttpRequest, HttpResponse};
use http::Request;
use http::request::Parts;
use micro_multipart::{ChunkSource, MultipartConfig, StreamingBodyProcessor};
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Installs the global fmt subscriber at `level`.
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
}

#[derive(Debug, Default)]
pub struct ServerBuilder {
    registrations: Vec<FilterRegistration>,
    terminal: Option<Filter>,
    config: ServerConfig,
}

impl ServerBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, registration: impl Into<FilterRegistration>) -> Self {
        self.registrations.push(registration.into());
        self
    }

    pub fn handler(self, handler: impl RequestHandler + 'static) -> Self {
        self.terminal(Filter::terminal(handler))
    }

    /// Sets the terminal filter, replacing any handler set before.
    pub fn terminal(mut self, terminal: Filter) -> Self {
        self.terminal = Some(terminal);
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Server, ChainBuildError> {
        let terminal = self.terminal.ok_or(ChainBuildError::MissingTerminal)?;
        let executors = Executors::start(&self.config.executors)?;
        let registry = FilterRegistry::build(self.registrations, terminal, &executors)?;

        info!(filters = registry.len(), executors = self.config.executors.len(), "server built");
        Ok(Server { registry, multipart: self.config.multipart, executors })
    }
}

/// Dispatches requests handed over by the transport through their filter chain.
///
/// Every outcome is turned into a response; chain failures are logged and mapped to an
/// error status.
#[derive(Debug)]
pub struct Server {
    registry: FilterRegistry,
    multipart: MultipartConfig,
    executors: Executors,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn multipart_config(&self) -> &MultipartConfig {
        &self.multipart
    }

    pub fn executor(&self, name: &str) -> Result<Executor, ChainBuildError> {
        self.executors.get(name)
    }

    pub async fn handle(&self, mut request: HttpRequest) -> HttpResponse {
        let chain = self.registry.chain_for(&request);
        match chain.execute(&mut request).await {
            Ok(response) => response,
            Err(e) => {
                error!(cause = %e, status = %e.status_code(), path = request.uri().path(), "filter chain failed");
                e.into_response()
            }
        }
    }

    /// Handles a request whose multipart body arrives from `source`.
    pub async fn handle_multipart<S>(&self, head: Parts, source: S) -> HttpResponse
    where
        S: ChunkSource + 'static,
    {
        let source: Box<dyn ChunkSource> = Box::new(source);
        let parts: MultipartBody = StreamingBodyProcessor::new(source, self.multipart.clone());
        self.handle(Request::from_parts(head, RequestBody::multipart(parts))).await
    }
}
