//! Limits applied while demultiplexing a multipart body.
//!
//! The config is usually deserialized as part of the server configuration; every field has
//! a default so an empty table yields a usable config.

use serde::Deserialize;

/// Default limit of a single part, 1 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default limit of the whole body, 10 MiB.
pub const DEFAULT_MAX_REQUEST_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MultipartConfig {
    /// when disabled, the processor refuses the body with [`BodyError::Disabled`](crate::BodyError::Disabled)
    pub enabled: bool,
    /// max accumulated bytes of one part
    pub max_file_size: u64,
    /// max accumulated bytes across all parts of one request
    pub max_request_size: u64,
    /// max number of completed parts, unlimited when `None`
    pub max_parts: Option<usize>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            max_parts: None,
        }
    }
}

impl MultipartConfig {
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: u64) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn with_max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = Some(max_parts);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
