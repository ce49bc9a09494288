use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::error::ServerError;

/// One row of the append-only audit log.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id_register: i64,
    /// Who performed the action
    pub id_user: i64,
    pub comentario: String,
    pub hora: NaiveDateTime,
}

pub async fn append(
    conn: &mut SqliteConnection,
    actor: i64,
    comment: &str,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    tracing::info!(actor, comment, "audit");
    sqlx::query("INSERT INTO registros (id_user, comentario, hora) VALUES (?, ?, ?)")
        .bind(actor)
        .bind(comment)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// The whole log, newest first.
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<AuditEntry>, ServerError> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        "SELECT id_register, id_user, comentario, hora FROM registros ORDER BY id_register DESC",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(entries)
}
