use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::Validate;

use crate::actions::{JobFields, NewWorkshop, UpdateJob};
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::handlers::{now, Params, ValidatedJson};
use crate::models::{billing, job, workshop, InvoiceLine, Job, JobDetail, Workshop};
use crate::server::AppState;
use crate::utils::parse_date;

/// The body of `PUT /notas/:idJob`
#[derive(Debug, Validate, Deserialize)]
pub(crate) struct NoteInput {
    #[validate(length(min = 1, message = "Note cannot be empty."))]
    note: String,
}

/// Handler for `GET /jobs`
pub(crate) async fn list_jobs(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Job>>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(job::list(&mut db_conn).await?))
}

/// Handler for `GET /jobs/:id`
pub(crate) async fn get_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(id): Params<i64>,
) -> Result<Json<Job>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    job::find(&mut db_conn, id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("Trabajo no encontrado"))
}

/// Handler for `GET /job/:id`
pub(crate) async fn get_job_detail(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(id): Params<i64>,
) -> Result<Json<JobDetail>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(job::detail(&mut db_conn, id).await?))
}

/// Handler for `GET /jobs/fecha/:fecha`
pub(crate) async fn jobs_by_date(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(fecha): Params<String>,
) -> Result<Json<Vec<Job>>, ServerError> {
    let date = parse_date(&fecha)?;
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(job::on_date(&mut db_conn, date).await?))
}

/// Handler for `GET /jobsPendiente`
pub(crate) async fn pending_jobs(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Job>>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(job::pending_overdue(&mut db_conn, now()).await?))
}

/// Handler for `GET /jobs/user/:id`
pub(crate) async fn jobs_for_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(user_id): Params<i64>,
) -> Result<Json<Vec<Job>>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(job::for_user(&mut db_conn, user_id).await?))
}

/// Handler for `GET /jobs/:id/:fecha`
pub(crate) async fn jobs_for_user_on_date(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params((user_id, fecha)): Params<(i64, String)>,
) -> Result<Json<Vec<Job>>, ServerError> {
    let date = parse_date(&fecha)?;
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(job::for_user_on_date(&mut db_conn, user_id, date).await?))
}

/// Handler for `POST /jobs/:userId`
pub(crate) async fn create_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(actor): Params<i64>,
    ValidatedJson(fields): ValidatedJson<JobFields>,
) -> Result<(StatusCode, Json<Job>), ServerError> {
    let mut tx = state.db_pool.begin().await?;
    let created = job::create(&mut tx, actor, &fields, now()).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for `PUT /jobs/:userId`
pub(crate) async fn update_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(actor): Params<i64>,
    ValidatedJson(input): ValidatedJson<UpdateJob>,
) -> Result<Json<Job>, ServerError> {
    let mut tx = state.db_pool.begin().await?;
    let updated = job::update(&mut tx, actor, &input, now()).await?;
    tx.commit().await?;

    Ok(Json(updated))
}

/// Handler for `DELETE /jobs/:id`
///
/// The route carries no actor, so the deletion is recorded against the token's user.
pub(crate) async fn delete_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Params(id): Params<i64>,
) -> Result<StatusCode, ServerError> {
    let mut tx = state.db_pool.begin().await?;
    job::delete(&mut tx, auth.id, id, now()).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `PUT /notas/:idJob`
pub(crate) async fn set_note(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(id): Params<i64>,
    ValidatedJson(input): ValidatedJson<NoteInput>,
) -> Result<Json<Job>, ServerError> {
    let mut tx = state.db_pool.begin().await?;
    job::set_note(&mut tx, id, &input.note).await?;
    let updated = job::find(&mut tx, id)
        .await?
        .ok_or(ServerError::NotFound("Trabajo no encontrado"))?;
    tx.commit().await?;

    Ok(Json(updated))
}

/// Handler for `POST /createTaller`
pub(crate) async fn create_workshop(
    _auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<NewWorkshop>,
) -> Result<(StatusCode, Json<Workshop>), ServerError> {
    let mut tx = state.db_pool.begin().await?;
    let created = workshop::create(&mut tx, &input).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for `GET /finalizados/:fecha_inicio/:fecha_fin`
pub(crate) async fn finished_jobs(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params((fecha_inicio, fecha_fin)): Params<(String, String)>,
) -> Result<Json<Vec<InvoiceLine>>, ServerError> {
    let from = parse_date(&fecha_inicio)?;
    let until = parse_date(&fecha_fin)?;
    if until < from {
        return Err(ServerError::InvalidInput(format!(
            "End date {} is before start date {}",
            until, from
        )));
    }

    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(billing::finished_between(&mut db_conn, from, until).await?))
}
