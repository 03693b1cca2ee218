use std::sync::Arc;

use serde_json::Value;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Request id assigned by the audit middleware, available to handlers
/// through request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Parse a request body as JSON. Bodies are taken as raw bytes so that
/// malformed input gets the same error shape as every other failure.
pub fn parse_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("Request body is empty".into()));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}
