use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::ServerError,
    handlers::ValidatedJson,
    models::{user, Role},
    server::AppState,
    utils::pass::{self, Check},
};

/// The body of a `POST /login` request.
#[derive(Debug, Validate, Deserialize)]
pub(crate) struct LoginForm {
    #[validate(length(min = 1, message = "Name is required."))]
    name: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pass: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginUser {
    id_user: i64,
    username: String,
    rol: Role,
}

/// The response of a `POST /login` request.
///
/// The token is meant to be sent as `Authorization: Bearer <token>` on subsequent requests.
#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    user: LoginUser,
    token: String,
}

/// Handler for `POST /login`
pub(crate) async fn login(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<LoginForm>,
) -> Result<Json<LoginResponse>, ServerError> {
    let mut db_conn = state.db_pool.acquire().await?;

    let creds = user::find_credentials(&mut db_conn, &input.name)
        .await?
        .ok_or(ServerError::NotFound("Usuario no encontrado"))?;

    match pass::check(&creds.pass, &input.pass)? {
        Check::Invalid => {
            tracing::info!(name = %input.name, "rejected login");
            return Err(ServerError::WrongPassword);
        }
        Check::ValidOutdated => {
            // password needs to be updated
            let hashed = pass::hash(&input.pass)?;
            user::set_password(&mut db_conn, creds.id_user, &hashed).await?;
        }
        Check::Valid => {}
    }

    let token = state.jwt.issue(creds.id_user, &creds.name, creds.rol)?;
    tracing::info!(user_id = creds.id_user, "login");

    Ok(Json(LoginResponse {
        user: LoginUser {
            id_user: creds.id_user,
            username: creds.name,
            rol: creds.rol,
        },
        token,
    }))
}
