use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::error::ServerError;
use crate::models::JobState;
use crate::utils::day_bounds;

/// One invoice line: a finished job and the technician who worked it.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id_job: i64,
    pub job_name: String,
    pub technician: String,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub rate: f64,
}

/// Finished jobs scheduled between `from` and `until`, both days included.
pub async fn finished_between(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<InvoiceLine>, ServerError> {
    let (lower, upper) = day_bounds(from, until);
    let lines = sqlx::query_as::<_, InvoiceLine>(
        "SELECT j.id_job, j.name AS job_name, u.name AS technician,
            uj.start_time, uj.end_time, u.rate
        FROM jobs j
        JOIN users_jobs uj ON j.id_job = uj.id_job
        JOIN users u ON u.id_user = uj.id_user
        WHERE j.state = ? AND j.date_job >= ? AND j.date_job < ?
        ORDER BY j.date_job, j.id_job",
    )
    .bind(JobState::Terminado)
    .bind(lower)
    .bind(upper)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}
