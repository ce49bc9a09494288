use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::models::{audit, AuditEntry};
use crate::server::AppState;

/// Handler for `GET /`
pub(crate) async fn index() -> Json<Value> {
    Json(json!({ "message": "welcome to my api" }))
}

/// Handler for `GET /ping`
pub(crate) async fn ping(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let result: String = sqlx::query_scalar("SELECT 'pong'")
        .fetch_one(&state.db_pool)
        .await?;
    Ok(Json(json!({ "result": result })))
}

/// Handler for `GET /history`
pub(crate) async fn history(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AuditEntry>>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(audit::list(&mut db_conn).await?))
}
