use sqlx::PgPool;
use time::PrimitiveDateTime;

use super::lifecycle::check_token;
use super::AttemptError;
use crate::db::models::{AnswerRecord, AttemptSession, Quiz};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::services::quiz_content::{self, QuestionWithOptions};

pub(crate) async fn validate_token(
    executor: impl sqlx::PgExecutor<'_>,
    token: &str,
    now: PrimitiveDateTime,
) -> Result<AttemptSession, AttemptError> {
    let session = repositories::attempts::find_by_token(executor, token)
        .await?
        .ok_or(AttemptError::InvalidToken)?;
    check_token(&session, now)?;
    Ok(session)
}

/// Questions for an in-progress attempt. The token must be live and belong to this
/// student and quiz.
pub(crate) async fn questions_for_attempt(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
    token: &str,
    now: PrimitiveDateTime,
) -> Result<(AttemptSession, Vec<QuestionWithOptions>), AttemptError> {
    let session = validate_token(pool, token, now).await?;
    if session.quiz_id != quiz_id {
        return Err(AttemptError::InvalidToken);
    }
    if session.student_id != student_id {
        return Err(AttemptError::NotOwner);
    }

    let mut conn = pool.acquire().await?;
    let content = quiz_content::load(&mut *conn, quiz_id).await?;
    Ok((session, content))
}

#[derive(Debug)]
pub(crate) struct Solutions {
    pub(crate) quiz: Quiz,
    pub(crate) attempt: AttemptSession,
    pub(crate) content: Vec<QuestionWithOptions>,
    pub(crate) answers: Vec<AnswerRecord>,
}

pub(crate) async fn reveal_solutions(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
) -> Result<Solutions, AttemptError> {
    let quiz = repositories::quizzes::find_by_id(pool, quiz_id)
        .await?
        .ok_or(AttemptError::QuizNotFound)?;
    let attempt = repositories::attempts::find_for_student_quiz(pool, student_id, quiz_id)
        .await?
        .ok_or(AttemptError::AttemptNotFound)?;

    if attempt.status != AttemptStatus::Finished {
        return Err(AttemptError::NotFinished);
    }

    let mut conn = pool.acquire().await?;
    let content = quiz_content::load(&mut *conn, quiz_id).await?;
    let answers = repositories::answers::list_by_attempt(&mut *conn, &attempt.id).await?;

    Ok(Solutions { quiz, attempt, content, answers })
}
