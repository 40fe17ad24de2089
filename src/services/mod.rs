pub mod category_service;
pub mod product_service;

use serde_json::Value;

use crate::{audit::log_audit, state::AppState};

// Audit rows are best effort; a failed write never fails the request.
async fn record_audit(state: &AppState, action: &str, resource: &str, metadata: Value) {
    if let Err(err) = log_audit(
        &state.pool,
        &state.schema,
        action,
        Some(resource),
        Some(metadata),
    )
    .await
    {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
