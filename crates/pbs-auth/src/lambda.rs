//! Lambda handler adapter.
//!
//! The runtime hands over a loosely shaped JSON event. Anything that is not
//! where it should be, or has the wrong type, is read as absent and left for
//! the engine to reject at the matching stage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::AuthorizationEngine;
use crate::headers::{AuthRequest, ContextIdentity, Headers, RequestContext};
use crate::response;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaResponse {
    pub status_code: u16,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_stage: Option<String>,
}

pub async fn handle(engine: &AuthorizationEngine, event: &Value) -> LambdaResponse {
    let request = request_from_event(event);
    let decision = engine.authorize(&request).await;
    let (body, status_code, failure_stage) = response::render(
        &decision,
        engine.kind(),
        engine.options().add_failure_stage_context,
    );

    LambdaResponse {
        status_code,
        body,
        failure_stage,
    }
}

/// Build an [`AuthRequest`] from a raw event.
pub fn request_from_event(event: &Value) -> AuthRequest {
    let request_context = event
        .get("requestContext")
        .filter(|v| v.is_object())
        .map(|ctx| RequestContext {
            identity: ctx
                .get("identity")
                .filter(|v| v.is_object())
                .map(|identity| ContextIdentity {
                    user_arn: identity
                        .get("userArn")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                }),
        });

    let headers = event
        .get("headers")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(name, value)| value.as_str().map(|v| (name.as_str(), v)))
                .collect::<Headers>()
        });

    AuthRequest {
        request_context,
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::engine::HandlerKind;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/demo";

    fn engine(store: MemoryStore, stage_context: bool) -> AuthorizationEngine {
        AuthorizationEngine::new(
            HandlerKind::Lambda,
            Arc::new(store),
            EngineOptions {
                add_failure_stage_context: stage_context,
            },
        )
    }

    #[test]
    fn tolerant_event_reading() {
        assert_eq!(request_from_event(&json!("nope")), AuthRequest::default());
        assert_eq!(
            request_from_event(&json!({"requestContext": 5, "headers": []})),
            AuthRequest::default()
        );

        let request = request_from_event(&json!({
            "requestContext": {"identity": {"userArn": 7}},
            "headers": {"x-gscp-claimed-identity": "a.com", "x-count": 3}
        }));
        assert_eq!(
            request.request_context,
            Some(RequestContext {
                identity: Some(ContextIdentity { user_arn: None })
            })
        );
        assert_eq!(request.claimed_identity(), Some("a.com"));
        assert_eq!(request.headers.map(|h| h.len()), Some(1));
    }

    #[tokio::test]
    async fn authorized_response() {
        let engine = engine(
            MemoryStore::new().with_origin(ROLE_ARN, "my-reported-origin.com"),
            true,
        );
        let event = json!({
            "requestContext": {"identity": {
                "userArn": "arn:aws:sts::123456789012:assumed-role/demo/TestAR"
            }},
            "headers": {"x-gscp-claimed-identity": "my-reported-origin.com"}
        });

        let response = handle(&engine, &event).await;
        assert_eq!(
            response,
            LambdaResponse {
                status_code: 200,
                body: r#"{"authorized_domain": "my-reported-origin.com"}"#.to_string(),
                failure_stage: None,
            }
        );
    }

    #[tokio::test]
    async fn forbidden_response_with_stage() {
        let engine = engine(MemoryStore::new(), true);
        let response = handle(&engine, &json!({"headers": {}})).await;

        assert_eq!(response.status_code, 403);
        assert_eq!(response.body, "\"authorization forbidden\"");
        assert_eq!(response.failure_stage.as_deref(), Some("context"));

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["statusCode"], 403);
        assert_eq!(wire["failureStage"], "context");
    }

    #[tokio::test]
    async fn stage_omitted_when_disabled() {
        let engine = engine(MemoryStore::new(), false);
        let response = handle(&engine, &json!({})).await;
        assert_eq!(response.failure_stage, None);
        assert!(serde_json::to_value(&response)
            .unwrap()
            .get("failureStage")
            .is_none());
    }
}
