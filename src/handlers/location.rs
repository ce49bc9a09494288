use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::handlers::{now, ValidatedJson};
use crate::models::{location, Location, RecentLocation};
use crate::server::AppState;

/// The body of `POST /setLocation`
#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_coordinates"))]
pub(crate) struct LocationInput {
    id_user: i64,
    latitude: f64,
    longitude: f64,
    /// When the device took the reading. Logged, but the stored time is the server's.
    time: NaiveDateTime,
}

fn validate_coordinates(input: &LocationInput) -> Result<(), ValidationError> {
    let within = |value: f64, limit: f64| value.is_finite() && value.abs() <= limit;
    if within(input.latitude, 90.0) && within(input.longitude, 180.0) {
        return Ok(());
    }
    let mut err = ValidationError::new("coordinates");
    err.message = Some("Latitude must be within [-90, 90] and longitude within [-180, 180].".into());
    Err(err)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentQuery {
    minutes: Option<i64>,
}

/// Handler for `POST /setLocation`
pub(crate) async fn set_location(
    _auth: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<LocationInput>,
) -> Result<Json<Location>, ServerError> {
    tracing::debug!(user_id = input.id_user, client_time = %input.time, "location report");

    let mut db_conn = state.db_pool.acquire().await?;
    let stored = location::set(
        &mut db_conn,
        input.id_user,
        input.latitude,
        input.longitude,
        now(),
    )
    .await?;
    Ok(Json(stored))
}

/// Handler for `GET /getRecentlyLocation`
pub(crate) async fn recent_locations(
    _auth: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<Vec<RecentLocation>>, ServerError> {
    let Query(query) = query?;
    let minutes = query
        .minutes
        .unwrap_or(state.config.recent_location_minutes);

    let mut db_conn = state.db_pool.acquire().await?;
    Ok(Json(location::recent(&mut db_conn, minutes, now()).await?))
}
