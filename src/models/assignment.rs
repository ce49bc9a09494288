use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::error::ServerError;
use crate::models::{job, user};

/// Link between a user and a job, with the times work started and ended.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id_user: i64,
    pub id_job: i64,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

async fn check_parties(
    conn: &mut SqliteConnection,
    user_id: i64,
    job_id: i64,
) -> Result<(), ServerError> {
    if !user::exists(conn, user_id).await? {
        return Err(ServerError::NotFound("Usuario no encontrado"));
    }
    if !job::exists(conn, job_id).await? {
        return Err(ServerError::NotFound("Trabajo no encontrado"));
    }
    Ok(())
}

pub async fn for_job(
    conn: &mut SqliteConnection,
    job_id: i64,
) -> Result<Vec<Assignment>, ServerError> {
    let rows = sqlx::query_as::<_, Assignment>(
        "SELECT id_user, id_job, start_time, end_time FROM users_jobs WHERE id_job = ? ORDER BY rowid",
    )
    .bind(job_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Start and end times of the job's current assignment, if it has one.
pub async fn times(
    conn: &mut SqliteConnection,
    job_id: i64,
) -> Result<Option<(Option<NaiveDateTime>, Option<NaiveDateTime>)>, ServerError> {
    let row = sqlx::query_as::<_, (Option<NaiveDateTime>, Option<NaiveDateTime>)>(
        "SELECT start_time, end_time FROM users_jobs WHERE id_job = ? ORDER BY rowid DESC LIMIT 1",
    )
    .bind(job_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Add `user_id` to a job. Adding the same pair twice is a conflict.
pub async fn assign(
    conn: &mut SqliteConnection,
    user_id: i64,
    job_id: i64,
) -> Result<Assignment, ServerError> {
    check_parties(conn, user_id, job_id).await?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users_jobs WHERE id_user = ? AND id_job = ?",
    )
    .bind(user_id)
    .bind(job_id)
    .fetch_one(&mut *conn)
    .await?;
    if existing > 0 {
        return Err(ServerError::Conflict("El usuario ya está asignado a este trabajo"));
    }

    sqlx::query("INSERT INTO users_jobs (id_user, id_job) VALUES (?, ?)")
        .bind(user_id)
        .bind(job_id)
        .execute(&mut *conn)
        .await?;

    Ok(Assignment {
        id_user: user_id,
        id_job: job_id,
        start_time: None,
        end_time: None,
    })
}

/// Make `user_id` the only assignee of a job, replacing whoever held it.
pub async fn reassign(
    conn: &mut SqliteConnection,
    user_id: i64,
    job_id: i64,
    start_time: Option<NaiveDateTime>,
    end_time: Option<NaiveDateTime>,
) -> Result<Assignment, ServerError> {
    check_parties(conn, user_id, job_id).await?;
    clear(conn, job_id).await?;

    sqlx::query("INSERT INTO users_jobs (id_user, id_job, start_time, end_time) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(job_id)
        .bind(start_time)
        .bind(end_time)
        .execute(&mut *conn)
        .await?;

    Ok(Assignment {
        id_user: user_id,
        id_job: job_id,
        start_time,
        end_time,
    })
}

pub async fn clear(conn: &mut SqliteConnection, job_id: i64) -> Result<u64, ServerError> {
    let removed = sqlx::query("DELETE FROM users_jobs WHERE id_job = ?")
        .bind(job_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(removed)
}

pub async fn stamp_start(
    conn: &mut SqliteConnection,
    job_id: i64,
    at: NaiveDateTime,
) -> Result<(), ServerError> {
    stamp(conn, "UPDATE users_jobs SET start_time = ? WHERE id_job = ?", job_id, at).await
}

pub async fn stamp_end(
    conn: &mut SqliteConnection,
    job_id: i64,
    at: NaiveDateTime,
) -> Result<(), ServerError> {
    stamp(conn, "UPDATE users_jobs SET end_time = ? WHERE id_job = ?", job_id, at).await
}

async fn stamp(
    conn: &mut SqliteConnection,
    sql: &'static str,
    job_id: i64,
    at: NaiveDateTime,
) -> Result<(), ServerError> {
    let affected = sqlx::query(sql)
        .bind(at)
        .bind(job_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(ServerError::NotFound("Trabajo no encontrado"));
    }
    Ok(())
}
