use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::AnswerOption;

pub(crate) const COLUMNS: &str =
    "id, question_id, text, is_correct, position, created_at, updated_at";

pub(crate) struct NewOption<'a> {
    pub(crate) id: String,
    pub(crate) text: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) position: i32,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<AnswerOption>, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(&format!("SELECT {COLUMNS} FROM options WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_question(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<Vec<AnswerOption>, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(&format!(
        "SELECT {COLUMNS} FROM options WHERE question_id = $1 ORDER BY position, created_at, id"
    ))
    .bind(question_id)
    .fetch_all(executor)
    .await
}

/// Every option of every question in the quiz, grouped by question in defined order.
pub(crate) async fn list_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<AnswerOption>, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(
        "SELECT o.id, o.question_id, o.text, o.is_correct, o.position, o.created_at, o.updated_at
         FROM options o
         JOIN questions q ON q.id = o.question_id
         WHERE q.quiz_id = $1
         ORDER BY q.position, q.created_at, q.id, o.position, o.created_at, o.id",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn insert_many(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
    options: &[NewOption<'_>],
    now: PrimitiveDateTime,
) -> Result<Vec<AnswerOption>, sqlx::Error> {
    if options.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO options (id, question_id, text, is_correct, position, created_at, updated_at) ",
    );
    builder.push_values(options, |mut row, option| {
        row.push_bind(option.id.as_str())
            .push_bind(question_id)
            .push_bind(option.text)
            .push_bind(option.is_correct)
            .push_bind(option.position)
            .push_bind(now)
            .push_bind(now);
    });
    builder.push(format!(" RETURNING {COLUMNS}"));

    let mut created = builder.build_query_as::<AnswerOption>().fetch_all(executor).await?;
    created.sort_by_key(|option| option.position);
    Ok(created)
}

pub(crate) async fn next_position(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(MAX(position) + 1, 0) FROM options WHERE question_id = $1")
        .bind(question_id)
        .fetch_one(executor)
        .await
}

/// Drops the correct mark from every option of the question except `keep_id`.
pub(crate) async fn clear_correct(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
    keep_id: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE options SET is_correct = FALSE, updated_at = $1
         WHERE question_id = $2 AND is_correct AND ($3::TEXT IS NULL OR id <> $3)",
    )
    .bind(now)
    .bind(question_id)
    .bind(keep_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    text: Option<&str>,
    is_correct: Option<bool>,
    position: Option<i32>,
    now: PrimitiveDateTime,
) -> Result<AnswerOption, sqlx::Error> {
    sqlx::query_as::<_, AnswerOption>(&format!(
        "UPDATE options SET
            text = COALESCE($1, text),
            is_correct = COALESCE($2, is_correct),
            position = COALESCE($3, position),
            updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(text)
    .bind(is_correct)
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
    let result = sqlx::query("DELETE FROM options WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
