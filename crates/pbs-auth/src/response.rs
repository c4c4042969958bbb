//! Wire bodies shared by both handler kinds.

use crate::engine::{Decision, HandlerKind};

/// JSON string literal returned with every forbidden decision.
pub const FORBIDDEN_BODY: &str = "\"authorization forbidden\"";

/// `{"authorized_domain": "<domain>"}` with the domain JSON-escaped.
pub fn authorized_body(domain: &str) -> String {
    let quoted = serde_json::Value::from(domain).to_string();
    format!("{{\"authorized_domain\": {}}}", quoted)
}

/// Body, status and optional stage tag for `decision`.
pub(crate) fn render(
    decision: &Decision,
    kind: HandlerKind,
    with_stage: bool,
) -> (String, u16, Option<String>) {
    match decision {
        Decision::Authorized { domain } => (authorized_body(domain), 200, None),
        Decision::Forbidden { stage, status } => (
            FORBIDDEN_BODY.to_string(),
            *status,
            with_stage.then(|| stage.label(kind).to_string()),
        ),
    }
}
