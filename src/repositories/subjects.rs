use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Subject;

const COLUMNS: &str = "id, name, faculty_id, created_at, updated_at";

pub(crate) async fn list(
    pool: &PgPool,
    faculty_id: Option<&str>,
) -> Result<Vec<Subject>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM subjects WHERE 1=1"));
    if let Some(faculty_id) = faculty_id {
        builder.push(" AND faculty_id = ");
        builder.push_bind(faculty_id);
    }
    builder.push(" ORDER BY name, id");

    builder.build_query_as::<Subject>().fetch_all(pool).await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!("SELECT {COLUMNS} FROM subjects WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    name: &str,
    faculty_id: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (id, name, faculty_id, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(faculty_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    name: Option<&str>,
    faculty_id: Option<Option<&str>>,
    now: PrimitiveDateTime,
) -> Result<Option<Subject>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE subjects SET updated_at = ");
    builder.push_bind(now);
    if let Some(name) = name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(faculty_id) = faculty_id {
        builder.push(", faculty_id = ");
        builder.push_bind(faculty_id);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(format!(" RETURNING {COLUMNS}"));

    builder.build_query_as::<Subject>().fetch_optional(executor).await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
