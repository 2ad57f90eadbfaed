use crate::HttpRequest;
use crate::chain::FilterChain;
use crate::error::ChainBuildError;
use crate::executor::Executors;
use crate::filter::Filter;
use crate::order::FilterOrder;
use crate::scope::FilterScope;
use crate::scope::matcher::RequestMatcher;
use std::fmt;
use tracing::{debug, trace};

/// One filter as supplied by the registration mechanism, with its scope and executor binding.
pub struct FilterRegistration {
    filter: Filter,
    patterns: Vec<String>,
    matcher: Option<Box<dyn RequestMatcher>>,
    executor: Option<String>,
}

impl FilterRegistration {
    pub fn new(filter: Filter) -> Self {
        Self { filter, patterns: vec![], matcher: None, executor: None }
    }

    /// Restricts the filter to paths matching `pattern`; may be called repeatedly.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn matcher(mut self, matcher: impl RequestMatcher + 'static) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    /// Runs the filter on the named executor.
    pub fn on_executor(mut self, name: impl Into<String>) -> Self {
        self.executor = Some(name.into());
        self
    }
}

impl From<Filter> for FilterRegistration {
    fn from(filter: Filter) -> Self {
        Self::new(filter)
    }
}

impl fmt::Debug for FilterRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistration")
            .field("filter", &self.filter)
            .field("patterns", &self.patterns)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Every registered filter, resolved and ordered once, plus the terminal filter.
#[derive(Debug)]
pub struct FilterRegistry {
    entries: Vec<(FilterScope, Filter)>,
    terminal: Filter,
}

impl FilterRegistry {
    pub fn build(
        registrations: Vec<FilterRegistration>,
        terminal: Filter,
        executors: &Executors,
    ) -> Result<Self, ChainBuildError> {
        if !terminal.is_terminal() {
            return Err(ChainBuildError::MissingTerminal);
        }

        let extra_terminals = registrations.iter().filter(|registration| registration.filter.is_terminal()).count();
        if extra_terminals > 0 {
            return Err(ChainBuildError::MultipleTerminals { count: extra_terminals + 1 });
        }

        let mut entries = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let FilterRegistration { filter, patterns, matcher, executor } = registration;
            let filter = match executor {
                Some(name) => filter.on_executor(executors.get(&name)?),
                None => filter,
            };
            let scope = FilterScope::new(&patterns, matcher)?;
            entries.push((scope, filter));
        }

        entries.sort_by_key(|(_, filter)| filter.order().unwrap_or(FilterOrder::LOWEST_PRECEDENCE));
        debug!(filters = entries.len(), "build filter registry");
        Ok(Self { entries, terminal })
    }

    /// The chain of the filters whose scope matches `req`.
    pub fn chain_for(&self, req: &HttpRequest) -> FilterChain {
        let mut filters = self
            .entries
            .iter()
            .filter(|(scope, _)| scope.matches(req))
            .map(|(_, filter)| filter.clone())
            .collect::<Vec<_>>();
        filters.push(self.terminal.clone());

        trace!(path = req.uri().path(), filters = filters.len(), "resolve filter chain");
        FilterChain::presorted(filters)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{RequestBody, ResponseBody};
    use crate::config::ExecutorConfig;
    use crate::filter::{handler_fn, request_filter_fn};
    use http::{Request, Response};
    use std::collections::HashMap;

    fn terminal() -> Filter {
        Filter::terminal(handler_fn(|_req: &HttpRequest| async { Ok(Response::new(ResponseBody::empty())) }))
    }

    fn noop() -> Filter {
        Filter::before(request_filter_fn(|_req: &mut HttpRequest| Ok(None)), 0)
    }

    fn request(uri: &str) -> HttpRequest {
        Request::builder().uri(uri).body(RequestBody::empty()).unwrap()
    }

    #[test]
    fn chains_only_contain_matching_filters() {
        let registry = FilterRegistry::build(
            vec![
                FilterRegistration::new(noop()).pattern("/hello/{*rest}"),
                FilterRegistration::new(Filter::before(request_filter_fn(|_req: &mut HttpRequest| Ok(None)), -5)),
            ],
            terminal(),
            &Executors::default(),
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let hello = registry.chain_for(&request("/hello/world"));
        assert_eq!(hello.len(), 3);
        // registrations are ordered once, at build time
        assert_eq!(hello.filters()[0].order(), Some(-5));
        assert!(hello.filters()[2].is_terminal());

        assert_eq!(registry.chain_for(&request("/other")).len(), 2);
    }

    #[test]
    fn terminal_is_structural() {
        let executors = Executors::default();

        let error = FilterRegistry::build(vec![], noop(), &executors).unwrap_err();
        assert_eq!(error, ChainBuildError::MissingTerminal);

        let error = FilterRegistry::build(vec![terminal().into()], terminal(), &executors).unwrap_err();
        assert_eq!(error, ChainBuildError::MultipleTerminals { count: 2 });
    }

    #[tokio::test]
    async fn executor_binding_is_resolved_by_name() {
        let configs = HashMap::from([("blocking".to_owned(), ExecutorConfig { worker_threads: 1 })]);
        let executors = Executors::start(&configs).unwrap();

        let registry =
            FilterRegistry::build(vec![FilterRegistration::new(noop()).on_executor("blocking")], terminal(), &executors).unwrap();
        let chain = registry.chain_for(&request("/"));
        assert_eq!(chain.filters()[0].kind(), "async");

        let error =
            FilterRegistry::build(vec![FilterRegistration::new(noop()).on_executor("cpu")], terminal(), &executors).unwrap_err();
        assert_eq!(error, ChainBuildError::UnknownExecutor { name: "cpu".into() });
    }
}
