use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::actions::{NewUser, UpdateUser};
use crate::error::ServerError;
use crate::models::{audit, location};

/// User roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Tecnico,
}

/// User model, as exposed to clients. The stored secret is never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id_user: i64,
    pub name: String,
    pub rol: Role,
    pub tlf: Option<String>,
    pub email: Option<String>,
    pub rate: f64,
}

/// What login needs to check a secret.
#[derive(Debug, sqlx::FromRow)]
pub struct Credentials {
    pub id_user: i64,
    pub name: String,
    pub rol: Role,
    /// The password in hashed PHC form, as represented in the database
    pub pass: String,
}

const USER_COLUMNS: &str = "id_user, name, rol, tlf, email, rate";

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<User>, ServerError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users ORDER BY id_user",
        USER_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, ServerError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id_user = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, ServerError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id_user FROM users WHERE id_user = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

pub async fn count(conn: &mut SqliteConnection) -> Result<i64, ServerError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn find_credentials(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Credentials>, ServerError> {
    let creds = sqlx::query_as::<_, Credentials>(
        "SELECT id_user, name, rol, pass FROM users WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(creds)
}

pub async fn set_password(
    conn: &mut SqliteConnection,
    id: i64,
    hashed_pass: &str,
) -> Result<(), ServerError> {
    sqlx::query("UPDATE users SET pass = ? WHERE id_user = ?")
        .bind(hashed_pass)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn name_taken(
    conn: &mut SqliteConnection,
    name: &str,
    except: Option<i64>,
) -> Result<bool, ServerError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id_user FROM users WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(matches!(found, Some(id) if Some(id) != except))
}

/// Users assigned to a job.
pub async fn for_job(conn: &mut SqliteConnection, job_id: i64) -> Result<Vec<User>, ServerError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT u.id_user, u.name, u.rol, u.tlf, u.email, u.rate
        FROM users u JOIN users_jobs uj ON u.id_user = uj.id_user
        WHERE uj.id_job = ?
        ORDER BY u.id_user",
    )
    .bind(job_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(users)
}

/// Phone number of the reserved support account.
pub async fn help_contact(
    conn: &mut SqliteConnection,
    support_id: i64,
) -> Result<Option<String>, ServerError> {
    let tlf = sqlx::query_scalar::<_, Option<String>>("SELECT tlf FROM users WHERE id_user = ?")
        .bind(support_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(ServerError::NotFound("Usuario de soporte no encontrado"))?;
    Ok(tlf)
}

/// Create a user with an empty location row, recording `actor` in the audit log.
pub async fn create(
    conn: &mut SqliteConnection,
    actor: i64,
    input: &NewUser,
    hashed_pass: &str,
    now: NaiveDateTime,
) -> Result<User, ServerError> {
    if name_taken(conn, &input.name, None).await? {
        return Err(ServerError::Conflict("Ya existe un usuario con ese nombre"));
    }

    let id = sqlx::query(
        "INSERT INTO users (name, pass, rol, tlf, email, rate) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.name)
    .bind(hashed_pass)
    .bind(input.rol)
    .bind(&input.tlf)
    .bind(&input.email)
    .bind(input.rate)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    location::insert_empty(conn, id, now).await?;
    audit::append(conn, actor, &format!("Usuario creado {}", input.name), now).await?;

    find(conn, id)
        .await?
        .ok_or(ServerError::NotFound("Usuario no encontrado"))
}

/// Partial update: every field missing from `changes` keeps its stored value.
pub async fn update(
    conn: &mut SqliteConnection,
    actor: i64,
    id: i64,
    changes: &UpdateUser,
    hashed_pass: Option<&str>,
    now: NaiveDateTime,
) -> Result<User, ServerError> {
    if let Some(name) = &changes.name {
        if name_taken(conn, name, Some(id)).await? {
            return Err(ServerError::Conflict("Ya existe un usuario con ese nombre"));
        }
    }

    let affected = sqlx::query(
        "UPDATE users SET
            name = COALESCE(?, name),
            pass = COALESCE(?, pass),
            rol = COALESCE(?, rol),
            tlf = COALESCE(?, tlf),
            email = COALESCE(?, email),
            rate = COALESCE(?, rate)
        WHERE id_user = ?",
    )
    .bind(&changes.name)
    .bind(hashed_pass)
    .bind(changes.rol)
    .bind(&changes.tlf)
    .bind(&changes.email)
    .bind(changes.rate)
    .bind(id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(ServerError::NotFound("Usuario no encontrado"));
    }

    let user = find(conn, id)
        .await?
        .ok_or(ServerError::NotFound("Usuario no encontrado"))?;
    audit::append(conn, actor, &format!("Usuario modificado {}", user.name), now).await?;
    Ok(user)
}

/// Delete a user along with its location row and its assignments.
///
/// Dependent rows go first so the statements also hold outside a transaction.
pub async fn delete(
    conn: &mut SqliteConnection,
    actor: i64,
    id: i64,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    location::delete(conn, id).await?;
    sqlx::query("DELETE FROM users_jobs WHERE id_user = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let affected = sqlx::query("DELETE FROM users WHERE id_user = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(ServerError::NotFound("Usuario no encontrado"));
    }

    audit::append(conn, actor, &format!("Usuario eliminado {}", id), now).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{at, conn};

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.into(),
            pass: "secret12".into(),
            rol: Role::Tecnico,
            tlf: Some("600123123".into()),
            email: Some(format!("{}@example.com", name)),
            rate: 25.5,
        }
    }

    #[tokio::test]
    async fn create_then_find_reflects_submitted_fields() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let created = create(&mut conn, 0, &new_user("ana"), "hash", now).await.unwrap();

        let found = find(&mut conn, created.id_user).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.name, "ana");
        assert_eq!(found.tlf.as_deref(), Some("600123123"));
        assert_eq!(found.rate, 25.5);

        let loc = location::find(&mut conn, created.id_user).await.unwrap().unwrap();
        assert_eq!(loc.latitude, None);
        assert_eq!(loc.longitude, None);
        assert_eq!(loc.time, now);
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        create(&mut conn, 0, &new_user("ana"), "hash", now).await.unwrap();
        let err = create(&mut conn, 0, &new_user("ana"), "hash", now).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_keeps_omitted_fields() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let created = create(&mut conn, 0, &new_user("ana"), "hash", now).await.unwrap();

        let changes = UpdateUser {
            rate: Some(30.0),
            ..Default::default()
        };
        let updated = update(&mut conn, 0, created.id_user, &changes, None, now)
            .await
            .unwrap();
        assert_eq!(updated.rate, 30.0);
        assert_eq!(updated.name, "ana");
        assert_eq!(updated.email, created.email);

        let creds = find_credentials(&mut conn, "ana").await.unwrap().unwrap();
        assert_eq!(creds.pass, "hash");
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let mut conn = conn().await;
        let err = update(&mut conn, 0, 99, &UpdateUser::default(), None, at("2025-03-01", "08:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_location_and_is_audited() {
        let mut conn = conn().await;
        let now = at("2025-03-01", "08:00:00");
        let created = create(&mut conn, 0, &new_user("ana"), "hash", now).await.unwrap();

        delete(&mut conn, 5, created.id_user, now).await.unwrap();
        assert!(find(&mut conn, created.id_user).await.unwrap().is_none());
        assert!(location::find(&mut conn, created.id_user).await.unwrap().is_none());

        let history = audit::list(&mut conn).await.unwrap();
        assert_eq!(history[0].id_user, 5);
        assert_eq!(history[0].comentario, format!("Usuario eliminado {}", created.id_user));

        let err = delete(&mut conn, 5, created.id_user, now).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn help_contact_requires_the_support_account() {
        let mut conn = conn().await;
        let err = help_contact(&mut conn, 1).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));

        create(&mut conn, 0, &new_user("soporte"), "hash", at("2025-03-01", "08:00:00"))
            .await
            .unwrap();
        assert_eq!(
            help_contact(&mut conn, 1).await.unwrap().as_deref(),
            Some("600123123")
        );
    }
}
