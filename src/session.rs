//! Session parameters: the immutable, caller-supplied description of one upload.

use crate::params::ParamBindings;
use reqwest::Method;
use serde_json::Value;

/// The caller-supplied, immutable description of one upload attempt.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub path: String,
    pub method: Method,
    pub content_type: String,
    pub metadata: Option<Value>,
    pub chunk_size: u64,
    pub param_bindings: ParamBindings,
    pub api_key: Option<String>,
}

impl SessionParams {
    pub fn new(path: impl Into<String>, method: Method, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            content_type: content_type.into(),
            metadata: None,
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            param_bindings: ParamBindings::new(),
            api_key: None,
        }
    }
}
