//! Which requests a registered filter applies to.

pub mod matcher;

use crate::HttpRequest;
use crate::error::ChainBuildError;
use matcher::RequestMatcher;
use std::fmt;
use tracing::trace;

/// Path patterns plus an optional request predicate.
///
/// Patterns use the router syntax (`/users/{id}`, `/hello/{*rest}`). A scope without
/// patterns matches every path; a scope without a matcher accepts every method and header.
pub struct FilterScope {
    patterns: Option<matchit::Router<()>>,
    matcher: Option<Box<dyn RequestMatcher>>,
}

impl FilterScope {
    /// A scope matching every request.
    pub fn any() -> Self {
        Self { patterns: None, matcher: None }
    }

    pub fn new(patterns: &[String], matcher: Option<Box<dyn RequestMatcher>>) -> Result<Self, ChainBuildError> {
        if patterns.is_empty() {
            return Ok(Self { patterns: None, matcher });
        }

        let mut router = matchit::Router::new();
        for pattern in patterns {
            router.insert(pattern.as_str(), ()).map_err(|e| ChainBuildError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(Self { patterns: Some(router), matcher })
    }

    pub fn matches(&self, req: &HttpRequest) -> bool {
        let path = req.uri().path();
        let path_matched = self.patterns.as_ref().is_none_or(|router| router.at(path).is_ok());
        if !path_matched {
            trace!(path, "filter scope doesn't match path");
            return false;
        }

        self.matcher.as_ref().is_none_or(|matcher| matcher.matches(req))
    }
}

impl Default for FilterScope {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Debug for FilterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterScope")
            .field("patterns", &self.patterns.is_some())
            .field("matcher", &self.matcher.is_some())
            .finish()
    }
}
