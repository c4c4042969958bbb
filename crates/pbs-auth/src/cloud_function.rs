//! Cloud Function handler adapter.

use serde::{Deserialize, Serialize};

use crate::engine::AuthorizationEngine;
use crate::headers::{AuthRequest, Headers};
use crate::response;

/// Inbound HTTP request as seen by the function: headers only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRequest {
    #[serde(default)]
    pub headers: Headers,
}

impl FunctionRequest {
    pub fn new(headers: Headers) -> Self {
        Self { headers }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub body: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_stage: Option<String>,
}

pub async fn handle(engine: &AuthorizationEngine, request: &FunctionRequest) -> FunctionResponse {
    let request = AuthRequest::with_headers(request.headers.clone());
    let decision = engine.authorize(&request).await;
    let (body, status_code, failure_stage) = response::render(
        &decision,
        engine.kind(),
        engine.options().add_failure_stage_context,
    );

    FunctionResponse {
        body,
        status_code,
        failure_stage,
    }
}
