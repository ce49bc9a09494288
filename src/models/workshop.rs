use serde::Serialize;
use sqlx::SqliteConnection;

use crate::actions::NewWorkshop;
use crate::error::ServerError;
use crate::models::job;

/// Workshop details of a job that is repaired off-site.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub id_taller: i64,
    pub id_job: i64,
    pub client: String,
    pub equipment: String,
    pub fault: String,
    pub incident: String,
}

pub async fn for_job(
    conn: &mut SqliteConnection,
    job_id: i64,
) -> Result<Option<Workshop>, ServerError> {
    let workshop = sqlx::query_as::<_, Workshop>(
        "SELECT id_taller, id_job, client, equipment, fault, incident FROM taller WHERE id_job = ?",
    )
    .bind(job_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(workshop)
}

pub async fn create(
    conn: &mut SqliteConnection,
    input: &NewWorkshop,
) -> Result<Workshop, ServerError> {
    if !job::exists(conn, input.id_job).await? {
        return Err(ServerError::NotFound("Trabajo no encontrado"));
    }
    if for_job(conn, input.id_job).await?.is_some() {
        return Err(ServerError::Conflict("El trabajo ya tiene datos de taller"));
    }

    let id = sqlx::query(
        "INSERT INTO taller (id_job, client, equipment, fault, incident) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(input.id_job)
    .bind(&input.client)
    .bind(&input.equipment)
    .bind(&input.fault)
    .bind(&input.incident)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(Workshop {
        id_taller: id,
        id_job: input.id_job,
        client: input.client.clone(),
        equipment: input.equipment.clone(),
        fault: input.fault.clone(),
        incident: input.incident.clone(),
    })
}
