use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::constants::MAX_RECENT_LOCATION_MINUTES;
use crate::error::ServerError;

/// Last reported position of a user. Coordinates are empty until the first report.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id_user: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time: NaiveDateTime,
}

/// A location row with the owner's display name, as served to dispatchers.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentLocation {
    pub id_user: i64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time: NaiveDateTime,
}

pub async fn insert_empty(
    conn: &mut SqliteConnection,
    user_id: i64,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    sqlx::query("INSERT INTO location (id_user, latitude, longitude, time) VALUES (?, NULL, NULL, ?)")
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn find(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<Location>, ServerError> {
    let location = sqlx::query_as::<_, Location>(
        "SELECT id_user, latitude, longitude, time FROM location WHERE id_user = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(location)
}

pub async fn delete(conn: &mut SqliteConnection, user_id: i64) -> Result<(), ServerError> {
    sqlx::query("DELETE FROM location WHERE id_user = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Record a position report. The stored time is `now`, not the client's clock.
pub async fn set(
    conn: &mut SqliteConnection,
    user_id: i64,
    latitude: f64,
    longitude: f64,
    now: NaiveDateTime,
) -> Result<Location, ServerError> {
    let affected = sqlx::query(
        "UPDATE location SET latitude = ?, longitude = ?, time = ? WHERE id_user = ?",
    )
    .bind(latitude)
    .bind(longitude)
    .bind(now)
    .bind(user_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(ServerError::NotFound("Usuario no encontrado"));
    }

    Ok(Location {
        id_user: user_id,
        latitude: Some(latitude),
        longitude: Some(longitude),
        time: now,
    })
}

/// Locations updated within the last `window_minutes` before `now`.
///
/// The window must be between one minute and one year.
pub async fn recent(
    conn: &mut SqliteConnection,
    window_minutes: i64,
    now: NaiveDateTime,
) -> Result<Vec<RecentLocation>, ServerError> {
    if !(1..=MAX_RECENT_LOCATION_MINUTES).contains(&window_minutes) {
        return Err(ServerError::InvalidInput(format!(
            "minutes must be between 1 and {}",
            MAX_RECENT_LOCATION_MINUTES
        )));
    }
    let since = now - Duration::minutes(window_minutes);
    let locations = sqlx::query_as::<_, RecentLocation>(
        "SELECT l.id_user, u.name, l.latitude, l.longitude, l.time
        FROM location l JOIN users u ON u.id_user = l.id_user
        WHERE l.time >= ?
        ORDER BY l.time DESC",
    )
    .bind(since)
    .fetch_all(&mut *conn)
    .await?;
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{at, conn};

    async fn user_with_location(conn: &mut SqliteConnection, name: &str, time: NaiveDateTime) -> i64 {
        let id = sqlx::query("INSERT INTO users (name, pass) VALUES (?, 'x')")
            .bind(name)
            .execute(&mut *conn)
            .await
            .unwrap()
            .last_insert_rowid();
        insert_empty(conn, id, time).await.unwrap();
        id
    }

    #[tokio::test]
    async fn recent_window_is_trailing_from_now() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "12:00:00");

        let stale = user_with_location(&mut conn, "stale", now - Duration::minutes(31)).await;
        let fresh = user_with_location(&mut conn, "fresh", now - Duration::minutes(10)).await;

        let recent = recent(&mut conn, 30, now).await.unwrap();
        let ids: Vec<i64> = recent.iter().map(|l| l.id_user).collect();
        assert_eq!(ids, vec![fresh]);
        assert!(!ids.contains(&stale));
        assert_eq!(recent[0].name, "fresh");
    }

    #[tokio::test]
    async fn recent_is_empty_rather_than_an_error() {
        let mut conn = conn().await;
        assert!(recent(&mut conn, 30, at("2025-03-01", "12:00:00"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn window_outside_bounds_is_invalid() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "12:00:00");
        for minutes in [0, -5, MAX_RECENT_LOCATION_MINUTES + 1, i64::MAX] {
            let err = recent(&mut conn, minutes, now).await.unwrap_err();
            assert!(matches!(err, ServerError::InvalidInput(_)), "minutes = {}", minutes);
        }
        assert!(recent(&mut conn, MAX_RECENT_LOCATION_MINUTES, now).await.is_ok());
    }

    #[tokio::test]
    async fn set_uses_server_time() {
        let mut conn = conn().await;
        let created = at("2025-03-01", "08:00:00");
        let id = user_with_location(&mut conn, "ana", created).await;

        let now = at("2025-03-01", "09:30:00");
        set(&mut conn, id, 40.4168, -3.7038, now).await.unwrap();

        let stored = find(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(stored.latitude, Some(40.4168));
        assert_eq!(stored.longitude, Some(-3.7038));
        assert_eq!(stored.time, now);
    }

    #[tokio::test]
    async fn set_without_row_is_not_found() {
        let mut conn = conn().await;
        let err = set(&mut conn, 42, 0.0, 0.0, at("2025-03-01", "09:30:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }
}
