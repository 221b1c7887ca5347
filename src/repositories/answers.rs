use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::AnswerRecord;

const COLUMNS: &str =
    "id, attempt_id, question_id, selected_option_id, is_correct, points_awarded, created_at";

pub(crate) struct NewAnswer<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) selected_option_id: Option<&'a str>,
    pub(crate) is_correct: bool,
    pub(crate) points_awarded: i32,
}

/// Writes all answer rows for an attempt in one statement.
pub(crate) async fn insert_many(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    answers: &[NewAnswer<'_>],
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if answers.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO answer_records (
            id, attempt_id, question_id, selected_option_id, is_correct, points_awarded, created_at
        ) ",
    );
    builder.push_values(answers, |mut row, answer| {
        row.push_bind(Uuid::new_v4().to_string())
            .push_bind(attempt_id)
            .push_bind(answer.question_id)
            .push_bind(answer.selected_option_id)
            .push_bind(answer.is_correct)
            .push_bind(answer.points_awarded)
            .push_bind(now);
    });

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<AnswerRecord>, sqlx::Error> {
    sqlx::query_as::<_, AnswerRecord>(&format!(
        "SELECT {COLUMNS} FROM answer_records WHERE attempt_id = $1"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM answer_records WHERE attempt_id = $1")
        .bind(attempt_id)
        .fetch_one(executor)
        .await
}
