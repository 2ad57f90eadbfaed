//! The per-request filter pipeline.
//!
//! A chain is a slice of [`Filter`]s sorted by order with the terminal filter last. Executing
//! it walks the slice recursively: every non-terminal filter wraps the rest of the chain, so
//! the first filter to see the request is the last one to see the response.
//!
//! - before filters run and either answer the request or fall through
//! - after filters run the rest of the chain first, then adjust its response
//! - around filters and continuation-declaring before filters get the rest of the chain as
//!   a [`Continuation`]
//! - async-wrapped filters move the request onto their executor, run there, and hand the
//!   request back
//!
//! A failure stops the walk and travels back through the enclosing continuations; after
//! filters don't run on a failed chain.

mod continuation;

pub use continuation::Continuation;

use crate::error::{ChainBuildError, FilterError};
use crate::filter::{BeforeInvoker, Filter};
use crate::order::FilterOrder;
use crate::{HttpRequest, HttpResponse};
use futures::future::{self, BoxFuture};
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, trace, warn};

#[derive(Clone, Debug)]
pub struct FilterChain {
    filters: Arc<[Filter]>,
}

impl FilterChain {
    /// Validates and orders `filters`.
    ///
    /// Exactly one terminal filter is required, declared last. The other filters are sorted
    /// by order; equal orders keep their declaration order.
    pub fn new(mut filters: Vec<Filter>) -> Result<Self, ChainBuildError> {
        match filters.iter().filter(|filter| filter.is_terminal()).count() {
            0 => return Err(ChainBuildError::MissingTerminal),
            1 => {}
            count => return Err(ChainBuildError::MultipleTerminals { count }),
        }

        if !filters.last().is_some_and(Filter::is_terminal) {
            return Err(ChainBuildError::TerminalNotLast);
        }

        let last = filters.len() - 1;
        filters[..last].sort_by_key(|filter| filter.order().unwrap_or(FilterOrder::LOWEST_PRECEDENCE));
        Ok(Self::presorted(filters))
    }

    /// Wraps filters that are already ordered and end with their terminal.
    pub(crate) fn presorted(filters: Vec<Filter>) -> Self {
        Self { filters: filters.into() }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs the chain over one request.
    pub async fn execute(&self, req: &mut HttpRequest) -> Result<HttpResponse, FilterError> {
        debug!(filters = self.filters.len(), method = %req.method(), path = req.uri().path(), "execute filter chain");
        dispatch(&self.filters, 0, req).await
    }
}

fn dispatch<'a>(
    filters: &'a Arc<[Filter]>,
    index: usize,
    req: &'a mut HttpRequest,
) -> BoxFuture<'a, Result<HttpResponse, FilterError>> {
    match filters.get(index) {
        Some(filter) => run_filter(filters, index, filter, req),
        None => Box::pin(future::ready(Err(FilterError::integrity("filter chain ended without a terminal filter")))),
    }
}

fn run_filter<'a>(
    filters: &'a Arc<[Filter]>,
    index: usize,
    filter: &'a Filter,
    req: &'a mut HttpRequest,
) -> BoxFuture<'a, Result<HttpResponse, FilterError>> {
    Box::pin(async move {
        trace!(index, kind = filter.kind(), "run filter");
        match filter {
            Filter::Before { invoker: BeforeInvoker::Plain(before), .. } => {
                if let Some(response) = before.filter_request(req).await.map_err(FilterError::filter)? {
                    debug!(index, "before filter answered the request");
                    return Ok(response);
                }
                dispatch(filters, index + 1, req).await
            }

            Filter::Before { invoker: BeforeInvoker::Continuation(before), .. } => {
                let proceeded = AtomicBool::new(false);
                let result = before.filter(req, Continuation::new(filters, index + 1, &proceeded)).await;
                if result.is_ok() && !proceeded.load(Ordering::Acquire) {
                    return Err(FilterError::integrity(format!("before filter at {index} never invoked its continuation")));
                }
                result
            }

            Filter::After { invoker, .. } => {
                let mut response = dispatch(filters, index + 1, req).await?;
                invoker.filter_response(req, &mut response).await.map_err(FilterError::filter)?;
                Ok(response)
            }

            Filter::AroundLegacy { filter: around, .. } => {
                if !around.is_enabled() {
                    warn!(index, "around filter is disabled, skip it");
                    return dispatch(filters, index + 1, req).await;
                }

                let proceeded = AtomicBool::new(false);
                let result = around.do_filter(req, Continuation::new(filters, index + 1, &proceeded)).await;
                if !proceeded.load(Ordering::Acquire) {
                    debug!(index, "around filter answered the request");
                }
                result
            }

            Filter::Async { inner, executor } => {
                trace!(index, executor = executor.name(), "marshal filter onto executor");
                let task_filters = Arc::clone(filters);
                let task_filter = Filter::clone(inner);
                // handed back if the task never returns the request
                let (method, uri, body) = (req.method().clone(), req.uri().clone(), req.body().clone());
                let mut task_req = mem::take(req);

                let task = executor.spawn(async move {
                    let result = run_filter(&task_filters, index, &task_filter, &mut task_req).await;
                    (task_req, result)
                });

                match task.await {
                    Ok((task_req, result)) => {
                        *req = task_req;
                        result
                    }
                    Err(e) => {
                        *req.method_mut() = method;
                        *req.uri_mut() = uri;
                        *req.body_mut() = body;
                        error!(
                            executor = executor.name(),
                            method = %req.method(),
                            path = req.uri().path(),
                            cause = %e,
                            "filter task failed"
                        );
                        Err(FilterError::executor(executor.name(), e))
                    }
                }
            }

            Filter::Terminal(handler) => handler.invoke(req).await.map_err(FilterError::handler),

            Filter::TerminalReactive(source) => {
                let response = source.take().await?;
                response.await.map_err(FilterError::handler)
            }
        }
    })
}
