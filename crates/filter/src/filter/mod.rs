//! Filter targets and the closed set of filter variants a chain dispatches on.

mod fn_filter;

pub use fn_filter::{FnHandler, FnRequestFilter, FnResponseFilter, handler_fn, request_filter_fn, response_filter_fn};

use crate::chain::Continuation;
use crate::error::{BoxError, FilterError};
use crate::executor::Executor;
use crate::order::FilterOrder;
use crate::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A before filter that runs to completion and may answer the request itself.
#[async_trait]
pub trait RequestFilter: Send + Sync {
    /// Returning `Some(response)` short-circuits the rest of the chain.
    async fn filter_request(&self, req: &mut HttpRequest) -> Result<Option<HttpResponse>, BoxError>;

    fn order(&self) -> i32 {
        0
    }
}

/// A before filter that resumes the chain itself and observes the response.
///
/// The continuation must be invoked exactly once; returning without invoking it is a chain
/// integrity error.
#[async_trait]
pub trait ContinuationFilter: Send + Sync {
    async fn filter(&self, req: &mut HttpRequest, next: Continuation<'_>) -> Result<HttpResponse, FilterError>;

    fn order(&self) -> i32 {
        0
    }
}

/// An after filter, run over whatever response is in hand.
#[async_trait]
pub trait ResponseFilter: Send + Sync {
    async fn filter_response(&self, req: &HttpRequest, resp: &mut HttpResponse) -> Result<(), BoxError>;

    fn order(&self) -> i32 {
        0
    }
}

/// A filter wrapping the rest of the chain.
///
/// Unlike a [`ContinuationFilter`] it may decline to call onward and answer on its own.
#[async_trait]
pub trait HttpFilter: Send + Sync {
    async fn do_filter(&self, req: &mut HttpRequest, chain: Continuation<'_>) -> Result<HttpResponse, FilterError>;

    fn order(&self) -> i32 {
        0
    }

    /// A disabled filter is skipped as if absent.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// The handler producing the actual response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &HttpRequest) -> Result<HttpResponse, BoxError>;
}

#[derive(Clone)]
pub enum BeforeInvoker {
    Plain(Arc<dyn RequestFilter>),
    Continuation(Arc<dyn ContinuationFilter>),
}

/// One member of a filter chain.
///
/// Filters are built once and shared across requests; cloning only bumps reference counts.
#[derive(Clone)]
pub enum Filter {
    Before { invoker: BeforeInvoker, order: FilterOrder },
    After { invoker: Arc<dyn ResponseFilter>, order: FilterOrder },
    AroundLegacy { filter: Arc<dyn HttpFilter>, order: FilterOrder },
    /// runs `inner`, and the rest of the chain below it, on `executor`
    Async { inner: Box<Filter>, executor: Executor },
    Terminal(Arc<dyn RequestHandler>),
    TerminalReactive(ResponseSource),
}

impl Filter {
    pub fn before(filter: impl RequestFilter + 'static, order: impl Into<FilterOrder>) -> Self {
        Self::Before { invoker: BeforeInvoker::Plain(Arc::new(filter)), order: order.into() }
    }

    pub fn before_continuation(filter: impl ContinuationFilter + 'static, order: impl Into<FilterOrder>) -> Self {
        Self::Before { invoker: BeforeInvoker::Continuation(Arc::new(filter)), order: order.into() }
    }

    pub fn after(filter: impl ResponseFilter + 'static, order: impl Into<FilterOrder>) -> Self {
        Self::After { invoker: Arc::new(filter), order: order.into() }
    }

    /// An around filter ordered by its own [`HttpFilter::order`].
    pub fn around(filter: impl HttpFilter + 'static) -> Self {
        Self::AroundLegacy { filter: Arc::new(filter), order: FilterOrder::Dynamic }
    }

    pub fn around_with_order(filter: impl HttpFilter + 'static, order: impl Into<FilterOrder>) -> Self {
        Self::AroundLegacy { filter: Arc::new(filter), order: order.into() }
    }

    pub fn terminal(handler: impl RequestHandler + 'static) -> Self {
        Self::Terminal(Arc::new(handler))
    }

    pub fn terminal_reactive<F>(response: F) -> Self
    where
        F: Future<Output = Result<HttpResponse, BoxError>> + Send + 'static,
    {
        Self::TerminalReactive(ResponseSource::new(response))
    }

    /// Binds this filter to `executor`. The order stays the one of the wrapped filter.
    pub fn on_executor(self, executor: Executor) -> Self {
        Self::Async { inner: Box::new(self), executor }
    }

    /// The resolved order, `None` for terminal filters which are placed structurally.
    pub fn order(&self) -> Option<i32> {
        match self {
            Self::Before { invoker: BeforeInvoker::Plain(f), order } => Some(order.resolve(|| f.order())),
            Self::Before { invoker: BeforeInvoker::Continuation(f), order } => Some(order.resolve(|| f.order())),
            Self::After { invoker, order } => Some(order.resolve(|| invoker.order())),
            Self::AroundLegacy { filter, order } => Some(order.resolve(|| filter.order())),
            Self::Async { inner, .. } => inner.order(),
            Self::Terminal(_) | Self::TerminalReactive(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Terminal(_) | Self::TerminalReactive(_) => true,
            Self::Async { inner, .. } => inner.is_terminal(),
            Self::Before { .. } | Self::After { .. } | Self::AroundLegacy { .. } => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Before { invoker: BeforeInvoker::Plain(_), .. } => "before",
            Self::Before { invoker: BeforeInvoker::Continuation(_), .. } => "before-continuation",
            Self::After { .. } => "after",
            Self::AroundLegacy { .. } => "around",
            Self::Async { .. } => "async",
            Self::Terminal(_) => "terminal",
            Self::TerminalReactive(_) => "terminal-reactive",
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async { inner, executor } => {
                f.debug_struct("Async").field("inner", inner).field("executor", &executor.name()).finish()
            }
            other => f.debug_struct("Filter").field("kind", &other.kind()).field("order", &other.order()).finish(),
        }
    }
}

/// A one-shot response future for reactive terminals.
#[derive(Clone)]
pub struct ResponseSource {
    inner: Arc<Mutex<Option<BoxFuture<'static, Result<HttpResponse, BoxError>>>>>,
}

impl ResponseSource {
    pub fn new<F>(response: F) -> Self
    where
        F: Future<Output = Result<HttpResponse, BoxError>> + Send + 'static,
    {
        Self { inner: Arc::new(Mutex::new(Some(Box::pin(response)))) }
    }

    /// Takes the response future; only the first caller gets it.
    pub async fn take(&self) -> Result<BoxFuture<'static, Result<HttpResponse, BoxError>>, FilterError> {
        self.inner.lock().await.take().ok_or(FilterError::ResponseSourceConsumed)
    }
}

impl fmt::Debug for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSource").finish_non_exhaustive()
    }
}

impl fmt::Debug for BeforeInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("BeforeInvoker::Plain"),
            Self::Continuation(_) => f.write_str("BeforeInvoker::Continuation"),
        }
    }
}
