use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::actions::{JobFields, UpdateJob};
use crate::error::ServerError;
use crate::models::{assignment, audit, workshop, Workshop};
use crate::utils::day_bounds;

/// Job states. A job only ever moves forward through them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum JobState {
    #[default]
    Pendiente,
    #[serde(rename = "En Progreso")]
    #[sqlx(rename = "En Progreso")]
    EnProgreso,
    Terminado,
}

/// Job model
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id_job: i64,
    pub date_job: NaiveDateTime,
    pub name: String,
    pub description: String,
    pub address: String,
    pub state: JobState,
    pub tlf: Option<String>,
    pub on_site: bool,
    pub note: Option<String>,
}

/// A job together with its current assignment times and workshop record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub workshop: Option<Workshop>,
}

const JOB_COLUMNS: &str = "j.id_job, j.date_job, j.name, j.description, j.address, j.state, j.tlf, j.on_site, j.note";

const NOT_FOUND: ServerError = ServerError::NotFound("Trabajo no encontrado");

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Job>, ServerError> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs j ORDER BY j.date_job, j.id_job",
        JOB_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(jobs)
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Job>, ServerError> {
    let job = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs j WHERE j.id_job = ?",
        JOB_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(job)
}

pub async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, ServerError> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT id_job FROM jobs WHERE id_job = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .is_some())
}

/// The job, its current assignment's start/end times, and its workshop record.
pub async fn detail(conn: &mut SqliteConnection, id: i64) -> Result<JobDetail, ServerError> {
    let job = find(conn, id).await?.ok_or(NOT_FOUND)?;
    let times = assignment::times(conn, id).await?;
    let workshop = workshop::for_job(conn, id).await?;
    let (start_time, end_time) = times.unwrap_or_default();

    Ok(JobDetail {
        job,
        start_time,
        end_time,
        workshop,
    })
}

/// Jobs scheduled on the given calendar day, whatever the time of day.
pub async fn on_date(conn: &mut SqliteConnection, date: NaiveDate) -> Result<Vec<Job>, ServerError> {
    let (from, until) = day_bounds(date, date);
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs j WHERE j.date_job >= ? AND j.date_job < ? ORDER BY j.date_job",
        JOB_COLUMNS
    ))
    .bind(from)
    .bind(until)
    .fetch_all(&mut *conn)
    .await?;
    Ok(jobs)
}

/// Jobs whose scheduled time has passed without them being finished.
pub async fn pending_overdue(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<Vec<Job>, ServerError> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs j WHERE j.date_job < ? AND j.state IN (?, ?) ORDER BY j.date_job",
        JOB_COLUMNS
    ))
    .bind(now)
    .bind(JobState::Pendiente)
    .bind(JobState::EnProgreso)
    .fetch_all(&mut *conn)
    .await?;
    Ok(jobs)
}

pub async fn for_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Job>, ServerError> {
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs j JOIN users_jobs uj ON j.id_job = uj.id_job
        WHERE uj.id_user = ? ORDER BY j.date_job",
        JOB_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(jobs)
}

pub async fn for_user_on_date(
    conn: &mut SqliteConnection,
    user_id: i64,
    date: NaiveDate,
) -> Result<Vec<Job>, ServerError> {
    let (from, until) = day_bounds(date, date);
    let jobs = sqlx::query_as::<_, Job>(&format!(
        "SELECT {} FROM jobs j JOIN users_jobs uj ON j.id_job = uj.id_job
        WHERE uj.id_user = ? AND j.date_job >= ? AND j.date_job < ? ORDER BY j.date_job",
        JOB_COLUMNS
    ))
    .bind(user_id)
    .bind(from)
    .bind(until)
    .fetch_all(&mut *conn)
    .await?;
    Ok(jobs)
}

pub async fn create(
    conn: &mut SqliteConnection,
    actor: i64,
    fields: &JobFields,
    now: NaiveDateTime,
) -> Result<Job, ServerError> {
    let id = sqlx::query(
        "INSERT INTO jobs (date_job, name, description, address, state, tlf, on_site)
        VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(fields.date_job)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.address)
    .bind(fields.state)
    .bind(&fields.tlf)
    .bind(fields.on_site)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    audit::append(conn, actor, &format!("Trabajo insertado {}", fields.name), now).await?;
    find(conn, id).await?.ok_or(NOT_FOUND)
}

/// Overwrite every writable column. The note is not among them.
pub async fn update(
    conn: &mut SqliteConnection,
    actor: i64,
    input: &UpdateJob,
    now: NaiveDateTime,
) -> Result<Job, ServerError> {
    let fields = &input.fields;
    let affected = sqlx::query(
        "UPDATE jobs SET date_job = ?, name = ?, description = ?, address = ?, state = ?, tlf = ?, on_site = ?
        WHERE id_job = ?",
    )
    .bind(fields.date_job)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.address)
    .bind(fields.state)
    .bind(&fields.tlf)
    .bind(fields.on_site)
    .bind(input.id_job)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(NOT_FOUND);
    }

    audit::append(conn, actor, &format!("Trabajo modificado {}", fields.name), now).await?;
    find(conn, input.id_job).await?.ok_or(NOT_FOUND)
}

/// Delete a job and everything hanging off it.
pub async fn delete(
    conn: &mut SqliteConnection,
    actor: i64,
    id: i64,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    assignment::clear(conn, id).await?;
    sqlx::query("DELETE FROM taller WHERE id_job = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let affected = sqlx::query("DELETE FROM jobs WHERE id_job = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(NOT_FOUND);
    }

    audit::append(conn, actor, &format!("Trabajo eliminado {}", id), now).await?;
    Ok(())
}

/// Set the note of a job. A note can be written once and never replaced.
pub async fn set_note(conn: &mut SqliteConnection, id: i64, note: &str) -> Result<(), ServerError> {
    let current = sqlx::query_scalar::<_, Option<String>>("SELECT note FROM jobs WHERE id_job = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(NOT_FOUND)?;

    if current.map_or(false, |n| !n.is_empty()) {
        return Err(ServerError::Conflict("El trabajo ya tiene una nota"));
    }

    sqlx::query("UPDATE jobs SET note = ? WHERE id_job = ? AND (note IS NULL OR note = '')")
        .bind(note)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn set_state(
    conn: &mut SqliteConnection,
    id: i64,
    state: JobState,
) -> Result<(), ServerError> {
    let affected = sqlx::query("UPDATE jobs SET state = ? WHERE id_job = ?")
        .bind(state)
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(NOT_FOUND);
    }
    Ok(())
}

/// Stamp the assignment's start time and move the job to `En Progreso`.
///
/// No check is made against the job's current state.
pub async fn start(
    conn: &mut SqliteConnection,
    id: i64,
    at: NaiveDateTime,
) -> Result<(), ServerError> {
    assignment::stamp_start(conn, id, at).await?;
    set_state(conn, id, JobState::EnProgreso).await
}

/// Stamp the assignment's end time and move the job to `Terminado`.
pub async fn end(
    conn: &mut SqliteConnection,
    actor: i64,
    id: i64,
    at: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    assignment::stamp_end(conn, id, at).await?;
    set_state(conn, id, JobState::Terminado).await?;
    audit::append(conn, actor, &format!("Trabajo terminado {}", id), now).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{at, conn};

    fn fields(name: &str, date_job: NaiveDateTime, state: JobState) -> JobFields {
        JobFields {
            date_job,
            name: name.into(),
            description: "Revisión".into(),
            address: "Calle Mayor 1".into(),
            state,
            tlf: None,
            on_site: true,
        }
    }

    async fn technician(conn: &mut SqliteConnection, name: &str) -> i64 {
        sqlx::query("INSERT INTO users (name, pass, rate) VALUES (?, 'x', 20.0)")
            .bind(name)
            .execute(&mut *conn)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn create_is_audited_and_readable() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let job = create(&mut conn, 3, &fields("Caldera", at("2025-03-01", "09:00:00"), JobState::Pendiente), now)
            .await
            .unwrap();

        assert_eq!(find(&mut conn, job.id_job).await.unwrap().unwrap(), job);
        let history = audit::list(&mut conn).await.unwrap();
        assert_eq!(history[0].comentario, "Trabajo insertado Caldera");
        assert_eq!(history[0].id_user, 3);
    }

    #[tokio::test]
    async fn date_filter_ignores_time_of_day() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        for (name, when) in [
            ("early", at("2025-03-01", "00:00:00")),
            ("late", at("2025-03-01", "23:59:59")),
            ("next", at("2025-03-02", "00:00:00")),
        ] {
            create(&mut conn, 0, &fields(name, when, JobState::Pendiente), now).await.unwrap();
        }

        let names: Vec<String> = on_date(&mut conn, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.name)
            .collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn overdue_excludes_finished_and_future_jobs() {
        let mut conn = conn().await;
        let now = at("2025-03-10", "12:00:00");
        create(&mut conn, 0, &fields("past-pending", at("2025-03-01", "09:00:00"), JobState::Pendiente), now).await.unwrap();
        create(&mut conn, 0, &fields("past-running", at("2025-03-02", "09:00:00"), JobState::EnProgreso), now).await.unwrap();
        create(&mut conn, 0, &fields("past-done", at("2025-03-03", "09:00:00"), JobState::Terminado), now).await.unwrap();
        create(&mut conn, 0, &fields("future", at("2025-03-11", "09:00:00"), JobState::Pendiente), now).await.unwrap();

        let names: Vec<String> = pending_overdue(&mut conn, now)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.name)
            .collect();
        assert_eq!(names, vec!["past-pending", "past-running"]);
    }

    #[tokio::test]
    async fn note_is_write_once() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let job = create(&mut conn, 0, &fields("Caldera", now, JobState::Pendiente), now).await.unwrap();

        set_note(&mut conn, job.id_job, "A").await.unwrap();
        let err = set_note(&mut conn, job.id_job, "B").await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
        assert_eq!(
            find(&mut conn, job.id_job).await.unwrap().unwrap().note.as_deref(),
            Some("A")
        );

        let err = set_note(&mut conn, 999, "A").await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn lifecycle_moves_state_with_assignment_times() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let job = create(&mut conn, 0, &fields("Caldera", at("2025-03-01", "09:00:00"), JobState::Pendiente), now)
            .await
            .unwrap();
        let tech = technician(&mut conn, "ana").await;
        assignment::assign(&mut conn, tech, job.id_job).await.unwrap();

        start(&mut conn, job.id_job, at("2025-03-01", "09:05:00")).await.unwrap();
        let d = detail(&mut conn, job.id_job).await.unwrap();
        assert_eq!(d.job.state, JobState::EnProgreso);
        assert_eq!(d.start_time, Some(at("2025-03-01", "09:05:00")));
        assert_eq!(d.end_time, None);

        end(&mut conn, tech, job.id_job, at("2025-03-01", "10:00:00"), now).await.unwrap();
        let d = detail(&mut conn, job.id_job).await.unwrap();
        assert_eq!(d.job.state, JobState::Terminado);
        assert_eq!(d.end_time, Some(at("2025-03-01", "10:00:00")));
    }

    #[tokio::test]
    async fn starting_an_unassigned_job_is_not_found() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let job = create(&mut conn, 0, &fields("Caldera", now, JobState::Pendiente), now).await.unwrap();

        let err = start(&mut conn, job.id_job, now).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
        assert_eq!(
            find(&mut conn, job.id_job).await.unwrap().unwrap().state,
            JobState::Pendiente
        );
    }

    #[tokio::test]
    async fn delete_takes_assignments_with_it() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let job = create(&mut conn, 0, &fields("Caldera", now, JobState::Pendiente), now).await.unwrap();
        let tech = technician(&mut conn, "ana").await;
        assignment::assign(&mut conn, tech, job.id_job).await.unwrap();

        delete(&mut conn, tech, job.id_job, now).await.unwrap();
        assert!(find(&mut conn, job.id_job).await.unwrap().is_none());
        assert!(for_user(&mut conn, tech).await.unwrap().is_empty());

        let err = delete(&mut conn, tech, job.id_job, now).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_overwrites_every_field_but_the_note() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let job = create(&mut conn, 0, &fields("Caldera", now, JobState::Pendiente), now).await.unwrap();
        set_note(&mut conn, job.id_job, "Llamar antes").await.unwrap();

        let input = UpdateJob {
            id_job: job.id_job,
            fields: JobFields {
                date_job: at("2025-03-04", "16:30:00"),
                name: "Radiador".into(),
                description: String::new(),
                address: "Plaza Nueva 3".into(),
                state: JobState::EnProgreso,
                tlf: Some("600999888".into()),
                on_site: false,
            },
        };
        let updated = update(&mut conn, 4, &input, now).await.unwrap();

        assert_eq!(updated.date_job, at("2025-03-04", "16:30:00"));
        assert_eq!(updated.name, "Radiador");
        assert_eq!(updated.description, "");
        assert_eq!(updated.address, "Plaza Nueva 3");
        assert_eq!(updated.state, JobState::EnProgreso);
        assert_eq!(updated.tlf.as_deref(), Some("600999888"));
        assert!(!updated.on_site);
        assert_eq!(updated.note.as_deref(), Some("Llamar antes"));
        assert_eq!(find(&mut conn, job.id_job).await.unwrap().unwrap(), updated);

        let history = audit::list(&mut conn).await.unwrap();
        assert_eq!(history[0].comentario, "Trabajo modificado Radiador");
        assert_eq!(history[0].id_user, 4);
    }

    #[tokio::test]
    async fn update_of_missing_job_is_not_found_and_not_audited() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let input = UpdateJob {
            id_job: 999,
            fields: fields("Fantasma", now, JobState::Pendiente),
        };
        let err = update(&mut conn, 0, &input, now).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
        assert!(audit::list(&mut conn).await.unwrap().is_empty());
    }
}
