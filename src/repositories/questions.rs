use time::PrimitiveDateTime;

use crate::db::models::Question;

pub(crate) const COLUMNS: &str = "id, quiz_id, text, points, position, created_at, updated_at";

const ORDER: &str = "ORDER BY position, created_at, id";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Questions of a quiz in their defined order.
pub(crate) async fn list_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE quiz_id = $1 {ORDER}"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn next_position(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    quiz_id: &str,
    text: &str,
    points: i32,
    position: i32,
    now: PrimitiveDateTime,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (id, quiz_id, text, points, position, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(quiz_id)
    .bind(text)
    .bind(points)
    .bind(position)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    text: Option<&str>,
    points: Option<i32>,
    position: Option<i32>,
    now: PrimitiveDateTime,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            text = COALESCE($1, text),
            points = COALESCE($2, points),
            position = COALESCE($3, position),
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(text)
    .bind(points)
    .bind(position)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
