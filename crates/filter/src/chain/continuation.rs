use super::dispatch;
use crate::error::FilterError;
use crate::filter::Filter;
use crate::{HttpRequest, HttpResponse};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The rest of a filter chain, handed to the filter that requested it.
///
/// [`proceed`](Self::proceed) consumes the continuation, so it runs the rest of the chain at
/// most once; the chain checks afterwards whether it ran at all.
pub struct Continuation<'a> {
    filters: &'a Arc<[Filter]>,
    next: usize,
    proceeded: &'a AtomicBool,
}

impl<'a> Continuation<'a> {
    pub(crate) fn new(filters: &'a Arc<[Filter]>, next: usize, proceeded: &'a AtomicBool) -> Self {
        Self { filters, next, proceeded }
    }

    /// Runs the rest of the chain and hands back its response, or its failure.
    pub async fn proceed(self, req: &mut HttpRequest) -> Result<HttpResponse, FilterError> {
        self.proceeded.store(true, Ordering::Release);
        dispatch(self.filters, self.next, req).await
    }
}

impl fmt::Debug for Continuation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("next", &self.next)
            .field("remaining", &self.filters.len().saturating_sub(self.next))
            .finish()
    }
}
