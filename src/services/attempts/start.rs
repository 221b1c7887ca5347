use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use super::lifecycle::{check_window, decide_start, StartDecision};
use super::{token, AttemptError};
use crate::core::{metrics, security, time::minutes};
use crate::db::models::{AttemptSession, Quiz};
use crate::repositories;

pub(crate) struct StartRequest<'a> {
    pub(crate) student_id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) password: Option<&'a str>,
    pub(crate) token_bytes: usize,
    pub(crate) now: PrimitiveDateTime,
}

#[derive(Debug)]
pub(crate) struct StartedAttempt {
    pub(crate) attempt: AttemptSession,
    pub(crate) quiz: Quiz,
    pub(crate) resumed: bool,
}

/// Issues (or hands back) the attempt token for a student's single attempt at a quiz.
///
/// The pending row is created with `ON CONFLICT DO NOTHING` and then row-locked, so concurrent
/// starts for the same pair serialize on one row and observe each other's token.
pub(crate) async fn start_attempt(
    pool: &PgPool,
    request: StartRequest<'_>,
) -> Result<StartedAttempt, AttemptError> {
    let quiz = repositories::quizzes::find_by_id(pool, request.quiz_id)
        .await?
        .ok_or(AttemptError::QuizNotFound)?;

    if let Some(hash) = quiz.password_hash.as_deref() {
        let supplied = request.password.unwrap_or_default();
        if !security::verify_password(supplied, hash)? {
            return Err(AttemptError::WrongPassword);
        }
    }

    check_window(&quiz, request.now)?;

    let mut tx = pool.begin().await?;

    let attempt_id = Uuid::new_v4().to_string();
    repositories::attempts::insert_pending(
        &mut *tx,
        &attempt_id,
        request.student_id,
        request.quiz_id,
        request.now,
    )
    .await?;

    let session = repositories::attempts::lock_for_student_quiz(
        &mut *tx,
        request.student_id,
        request.quiz_id,
    )
    .await?;

    let (attempt, resumed) = match decide_start(&session, request.now)? {
        StartDecision::Resume => (session, true),
        StartDecision::Issue => {
            let token = token::generate(request.token_bytes);
            let expires_at = request.now + minutes(quiz.time_limit_minutes);
            let activated = repositories::attempts::activate(
                &mut *tx,
                &session.id,
                &token,
                request.now,
                expires_at,
            )
            .await?;
            (activated, false)
        }
    };

    tx.commit().await?;

    metrics::record_attempt_started(if resumed { "resumed" } else { "issued" });
    tracing::info!(
        attempt_id = %attempt.id,
        quiz_id = %attempt.quiz_id,
        student_id = %attempt.student_id,
        resumed,
        "Attempt started"
    );

    Ok(StartedAttempt { attempt, quiz, resumed })
}
