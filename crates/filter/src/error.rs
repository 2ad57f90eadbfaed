use crate::body::ResponseBody;
use http::{Response, StatusCode};
use micro_multipart::BodyError;
use std::error::Error;
use thiserror::Error;

/// The error type filters and handlers fail with.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors surfaced by executing a filter chain.
#[derive(Error, Debug)]
pub enum FilterError {
    /// a continuation was misused, e.g. never invoked by the filter that requested it
    #[error("filter chain integrity violated: {reason}")]
    Integrity { reason: String },

    #[error("filter failed: {source}")]
    Filter { source: BoxError },

    #[error("request handler failed: {source}")]
    Handler { source: BoxError },

    #[error("executor '{name}' failed: {reason}")]
    Executor { name: String, reason: String },

    #[error(transparent)]
    Body(#[from] BodyError),

    #[error("request body has been consumed")]
    BodyConsumed,

    #[error("response source has been consumed")]
    ResponseSourceConsumed,
}

impl FilterError {
    pub fn integrity<S: ToString>(str: S) -> Self {
        Self::Integrity { reason: str.to_string() }
    }

    /// Wraps an error raised by a filter, keeping chain and body errors as they are.
    pub fn filter(e: BoxError) -> Self {
        Self::classify(e).unwrap_or_else(|source| Self::Filter { source })
    }

    /// Wraps an error raised by the terminal handler, keeping chain and body errors as they are.
    pub fn handler(e: BoxError) -> Self {
        Self::classify(e).unwrap_or_else(|source| Self::Handler { source })
    }

    pub fn executor<N: ToString, S: ToString>(name: N, str: S) -> Self {
        Self::Executor { name: name.to_string(), reason: str.to_string() }
    }

    fn classify(e: BoxError) -> Result<Self, BoxError> {
        let e = match e.downcast::<FilterError>() {
            Ok(filter_error) => return Ok(*filter_error),
            Err(e) => e,
        };

        match e.downcast::<BodyError>() {
            Ok(body_error) => Ok(Self::Body(*body_error)),
            Err(e) => Err(e),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Body(e) => e.status_code(),
            Self::Integrity { .. }
            | Self::Filter { .. }
            | Self::Handler { .. }
            | Self::Executor { .. }
            | Self::BodyConsumed
            | Self::ResponseSourceConsumed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the response sent to the client when this error ends a request.
    ///
    /// Client errors carry their message, server errors only the canonical reason.
    pub fn into_response(self) -> Response<ResponseBody> {
        let status = self.status_code();
        let body = if status.is_client_error() {
            ResponseBody::from(self.to_string())
        } else {
            ResponseBody::from(status.canonical_reason().unwrap_or_default())
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
    }
}

/// Errors detected while assembling a filter chain or a server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainBuildError {
    #[error("filter chain has no terminal filter")]
    MissingTerminal,

    #[error("filter chain has {count} terminal filters, exactly one is allowed")]
    MultipleTerminals { count: usize },

    #[error("terminal filter must be the last filter of the chain")]
    TerminalNotLast,

    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unknown executor '{name}'")]
    UnknownExecutor { name: String },

    #[error("failed to start executor '{name}': {reason}")]
    ExecutorStart { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn filter_errors_keep_body_errors() {
        let e = FilterError::filter(Box::new(BodyError::part_too_large("avatar", 11, 10)));
        assert!(matches!(e, FilterError::Body(BodyError::PartTooLarge { .. })));
        assert_eq!(e.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn handler_errors_keep_chain_errors() {
        let e = FilterError::handler(Box::new(FilterError::BodyConsumed));
        assert!(matches!(e, FilterError::BodyConsumed));

        let e = FilterError::handler("boom".into());
        assert!(matches!(e, FilterError::Handler { .. }));
        assert_eq!(e.to_string(), "request handler failed: boom");
    }

    #[tokio::test]
    async fn server_errors_hide_their_cause() {
        let response = FilterError::integrity("continuation never invoked").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"Internal Server Error");
    }

    #[tokio::test]
    async fn client_errors_explain_themselves() {
        let response = FilterError::from(BodyError::malformed("missing boundary")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"malformed multipart body: missing boundary");
    }
}
