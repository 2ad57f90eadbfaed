use http::StatusCode;
use thiserror::Error;

/// Errors raised while turning upstream chunks into completed parts.
///
/// Every variant terminates exactly one body stream: it is delivered once to the part
/// consumer and the upstream subscription is cancelled right after.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    #[error("part '{name}' exceed the max file size, current: {current_size} exceed the limit {max_size}")]
    PartTooLarge { name: String, current_size: u64, max_size: u64 },

    #[error("request body too large, current: {current_size} exceed the limit {max_size}")]
    RequestTooLarge { current_size: u64, max_size: u64 },

    #[error("part number exceed the limit {max_num}")]
    TooManyParts { max_num: usize },

    #[error("malformed multipart body: {reason}")]
    Malformed { reason: String },

    #[error("upstream body error: {reason}")]
    Upstream { reason: String },

    #[error("body stream cancelled")]
    Cancelled,

    #[error("multipart processing is disabled")]
    Disabled,
}

impl BodyError {
    pub fn part_too_large<S: ToString>(name: S, current_size: u64, max_size: u64) -> Self {
        Self::PartTooLarge { name: name.to_string(), current_size, max_size }
    }

    pub fn request_too_large(current_size: u64, max_size: u64) -> Self {
        Self::RequestTooLarge { current_size, max_size }
    }

    pub fn too_many_parts(max_num: usize) -> Self {
        Self::TooManyParts { max_num }
    }

    pub fn malformed<S: ToString>(str: S) -> Self {
        Self::Malformed { reason: str.to_string() }
    }

    pub fn upstream<S: ToString>(str: S) -> Self {
        Self::Upstream { reason: str.to_string() }
    }

    /// The status a server should answer with when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PartTooLarge { .. } | Self::RequestTooLarge { .. } | Self::TooManyParts { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Malformed { .. } => StatusCode::BAD_REQUEST,
            Self::Disabled => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Upstream { .. } | Self::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_errors_map_to_payload_too_large() {
        assert_eq!(BodyError::part_too_large("avatar", 11, 10).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(BodyError::request_too_large(11, 10).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(BodyError::too_many_parts(2).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn display_mentions_part_name() {
        let message = BodyError::part_too_large("avatar", 11, 10).to_string();
        assert!(message.contains("avatar"));
        assert!(message.contains("11"));
    }
}
