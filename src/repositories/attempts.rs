use time::PrimitiveDateTime;

use crate::db::models::AttemptSession;
use crate::db::types::{AttemptStatus, FinishReason};

pub(crate) const COLUMNS: &str = "\
    id, student_id, quiz_id, status, attempt_token, attempt_token_expires_at, started_at, \
    finished_at, score, max_points, passed, finish_reason, created_at, updated_at";

pub(crate) struct FinishAttempt {
    pub(crate) score: i32,
    pub(crate) max_points: i32,
    pub(crate) passed: bool,
    pub(crate) reason: FinishReason,
    pub(crate) finished_at: PrimitiveDateTime,
}

/// Row joined with the student's name for teacher-facing listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AttemptWithStudent {
    #[sqlx(flatten)]
    pub(crate) attempt: AttemptSession,
    pub(crate) student_username: String,
    pub(crate) student_full_name: String,
}

/// Creates the pending row for (student, quiz) unless one exists. Returns whether a row was inserted.
pub(crate) async fn insert_pending(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    student_id: &str,
    quiz_id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempt_sessions (id, student_id, quiz_id, status, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$5)
         ON CONFLICT (student_id, quiz_id) DO NOTHING",
    )
    .bind(id)
    .bind(student_id)
    .bind(quiz_id)
    .bind(AttemptStatus::Pending)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Row-locks the (student, quiz) session until the surrounding transaction ends.
pub(crate) async fn lock_for_student_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    quiz_id: &str,
) -> Result<AttemptSession, sqlx::Error> {
    sqlx::query_as::<_, AttemptSession>(&format!(
        "SELECT {COLUMNS} FROM attempt_sessions
         WHERE student_id = $1 AND quiz_id = $2
         FOR UPDATE"
    ))
    .bind(student_id)
    .bind(quiz_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_for_student_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    quiz_id: &str,
) -> Result<Option<AttemptSession>, sqlx::Error> {
    sqlx::query_as::<_, AttemptSession>(&format!(
        "SELECT {COLUMNS} FROM attempt_sessions WHERE student_id = $1 AND quiz_id = $2"
    ))
    .bind(student_id)
    .bind(quiz_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_token(
    executor: impl sqlx::PgExecutor<'_>,
    token: &str,
) -> Result<Option<AttemptSession>, sqlx::Error> {
    sqlx::query_as::<_, AttemptSession>(&format!(
        "SELECT {COLUMNS} FROM attempt_sessions WHERE attempt_token = $1"
    ))
    .bind(token)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_by_token(
    executor: impl sqlx::PgExecutor<'_>,
    token: &str,
) -> Result<Option<AttemptSession>, sqlx::Error> {
    sqlx::query_as::<_, AttemptSession>(&format!(
        "SELECT {COLUMNS} FROM attempt_sessions WHERE attempt_token = $1 FOR UPDATE"
    ))
    .bind(token)
    .fetch_optional(executor)
    .await
}

/// Moves a pending or expired session to `active` with a fresh token.
pub(crate) async fn activate(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    token: &str,
    started_at: PrimitiveDateTime,
    expires_at: PrimitiveDateTime,
) -> Result<AttemptSession, sqlx::Error> {
    sqlx::query_as::<_, AttemptSession>(&format!(
        "UPDATE attempt_sessions SET
            status = $1,
            attempt_token = $2,
            started_at = $3,
            attempt_token_expires_at = $4,
            updated_at = $3
         WHERE id = $5 AND status <> $6
         RETURNING {COLUMNS}"
    ))
    .bind(AttemptStatus::Active)
    .bind(token)
    .bind(started_at)
    .bind(expires_at)
    .bind(id)
    .bind(AttemptStatus::Finished)
    .fetch_one(executor)
    .await
}

/// Finalizes an active session. Returns `None` when the row was not active.
pub(crate) async fn finish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: FinishAttempt,
) -> Result<Option<AttemptSession>, sqlx::Error> {
    sqlx::query_as::<_, AttemptSession>(&format!(
        "UPDATE attempt_sessions SET
            status = $1,
            finished_at = $2,
            score = $3,
            max_points = $4,
            passed = $5,
            finish_reason = $6,
            updated_at = $2
         WHERE id = $7 AND status = $8
         RETURNING {COLUMNS}"
    ))
    .bind(AttemptStatus::Finished)
    .bind(params.finished_at)
    .bind(params.score)
    .bind(params.max_points)
    .bind(params.passed)
    .bind(params.reason)
    .bind(id)
    .bind(AttemptStatus::Active)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_expired_ids(
    executor: impl sqlx::PgExecutor<'_>,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM attempt_sessions
         WHERE status = $1 AND attempt_token_expires_at < $2
         ORDER BY attempt_token_expires_at
         LIMIT $3",
    )
    .bind(AttemptStatus::Active)
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Locks an expired active session, skipping rows another transaction holds.
pub(crate) async fn lock_expired_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<AttemptSession>, sqlx::Error> {
    sqlx::query_as::<_, AttemptSession>(&format!(
        "SELECT {COLUMNS} FROM attempt_sessions
         WHERE id = $1 AND status = $2 AND attempt_token_expires_at < $3
         FOR UPDATE SKIP LOCKED"
    ))
    .bind(id)
    .bind(AttemptStatus::Active)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn exists_for_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM attempt_sessions WHERE quiz_id = $1)")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<AttemptWithStudent>, sqlx::Error> {
    sqlx::query_as::<_, AttemptWithStudent>(
        "SELECT a.id, a.student_id, a.quiz_id, a.status, a.attempt_token,
                a.attempt_token_expires_at, a.started_at, a.finished_at, a.score, a.max_points,
                a.passed, a.finish_reason, a.created_at, a.updated_at,
                s.username AS student_username, s.full_name AS student_full_name
         FROM attempt_sessions a
         JOIN students s ON s.id = a.student_id
         WHERE a.quiz_id = $1
         ORDER BY s.username",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}
