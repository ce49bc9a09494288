use axum::{extract::State, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::handlers::{now, Params, ValidatedJson};
use crate::models::job;
use crate::server::AppState;

/// The body of `PUT /jobs/jobStart/:idJob` and `PUT /jobs/jobEnd/:idJob`
#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StampInput {
    date_job: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

/// Handler for `PUT /jobs/jobStart/:idJob`
pub(crate) async fn start_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(id): Params<i64>,
    ValidatedJson(input): ValidatedJson<StampInput>,
) -> Result<Json<MessageResponse>, ServerError> {
    let mut tx = state.db_pool.begin().await?;
    job::start(&mut tx, id, input.date_job).await?;
    tx.commit().await?;

    Ok(Json(MessageResponse {
        message: "Hora de inicio actualizada exitosamente",
    }))
}

/// Handler for `PUT /jobs/jobEnd/:idJob`
pub(crate) async fn end_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Params(id): Params<i64>,
    ValidatedJson(input): ValidatedJson<StampInput>,
) -> Result<Json<MessageResponse>, ServerError> {
    let mut tx = state.db_pool.begin().await?;
    job::end(&mut tx, auth.id, id, input.date_job, now()).await?;
    tx.commit().await?;

    Ok(Json(MessageResponse {
        message: "Hora de fin actualizada exitosamente",
    }))
}
