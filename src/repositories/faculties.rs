use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Faculty;

const COLUMNS: &str = "id, name, created_at, updated_at";

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Faculty>, sqlx::Error> {
    sqlx::query_as::<_, Faculty>(&format!("SELECT {COLUMNS} FROM faculties ORDER BY name"))
        .fetch_all(pool)
        .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Faculty>, sqlx::Error> {
    sqlx::query_as::<_, Faculty>(&format!("SELECT {COLUMNS} FROM faculties WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    name: &str,
    now: PrimitiveDateTime,
) -> Result<Faculty, sqlx::Error> {
    sqlx::query_as::<_, Faculty>(&format!(
        "INSERT INTO faculties (id, name, created_at, updated_at) VALUES ($1,$2,$3,$3)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn rename(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    name: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Faculty>, sqlx::Error> {
    sqlx::query_as::<_, Faculty>(&format!(
        "UPDATE faculties SET name = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(name)
    .bind(now)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM faculties WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
