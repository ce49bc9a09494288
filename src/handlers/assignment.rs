use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDateTime;
use serde::Deserialize;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::handlers::ValidatedJson;
use crate::models::{assignment, Assignment};
use crate::server::AppState;

/// The body of `POST /userjob`
#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignInput {
    id_user: i64,
    id_job: i64,
}

/// The body of `PUT /userjob`
#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReassignInput {
    id_user: i64,
    id_job: i64,
    start_time: Option<NaiveDateTime>,
    end_time: Option<NaiveDateTime>,
}

/// Handler for `POST /userjob`
pub(crate) async fn assign(
    _auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<AssignInput>,
) -> Result<(StatusCode, Json<Assignment>), ServerError> {
    let mut tx = state.db_pool.begin().await?;
    let created = assignment::assign(&mut tx, input.id_user, input.id_job).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for `PUT /userjob`
pub(crate) async fn reassign(
    _auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<ReassignInput>,
) -> Result<Json<Assignment>, ServerError> {
    let mut tx = state.db_pool.begin().await?;
    let replaced = assignment::reassign(
        &mut tx,
        input.id_user,
        input.id_job,
        input.start_time,
        input.end_time,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(replaced))
}
