use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::actions::{NewUser, UpdateUser};
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::handlers::{now, Params, ValidatedJson};
use crate::models::{user, User};
use crate::server::AppState;
use crate::utils::pass;

/// The response of `GET /help`
#[derive(Debug, Serialize)]
pub(crate) struct HelpResponse {
    tlf: Option<String>,
}

/// Handler for `GET /users`
pub(crate) async fn list_users(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(user::list(&mut db_conn).await?))
}

/// Handler for `GET /users/:id`
pub(crate) async fn get_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(id): Params<i64>,
) -> Result<Json<User>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    user::find(&mut db_conn, id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("Usuario no encontrado"))
}

/// Handler for `POST /users/:actorId`
pub(crate) async fn create_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(actor): Params<i64>,
    ValidatedJson(input): ValidatedJson<NewUser>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    let hashed = pass::hash(&input.pass)?;

    let mut tx = state.db_pool.begin().await?;
    let created = user::create(&mut tx, actor, &input, &hashed, now()).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for `PUT /users/:actorId/:idUser`
pub(crate) async fn update_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params((actor, id)): Params<(i64, i64)>,
    ValidatedJson(changes): ValidatedJson<UpdateUser>,
) -> Result<Json<User>, ServerError> {
    let hashed = changes.pass.as_deref().map(pass::hash).transpose()?;

    let mut tx = state.db_pool.begin().await?;
    let updated = user::update(&mut tx, actor, id, &changes, hashed.as_deref(), now()).await?;
    tx.commit().await?;

    Ok(Json(updated))
}

/// Handler for `DELETE /users/:actorId/:idUser`
pub(crate) async fn delete_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params((actor, id)): Params<(i64, i64)>,
) -> Result<StatusCode, ServerError> {
    let mut tx = state.db_pool.begin().await?;
    user::delete(&mut tx, actor, id, now()).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `GET /usersByJob/:idJob`
pub(crate) async fn users_by_job(
    _auth: AuthUser,
    State(state): State<AppState>,
    Params(job_id): Params<i64>,
) -> Result<Json<Vec<User>>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(user::for_job(&mut db_conn, job_id).await?))
}

/// Handler for `GET /help`
pub(crate) async fn help(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<HelpResponse>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;
    let tlf = user::help_contact(&mut db_conn, state.config.support_user_id).await?;
    Ok(Json(HelpResponse { tlf }))
}
