use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;

use super::lifecycle::check_submit;
use super::AttemptError;
use crate::core::metrics;
use crate::db::models::AttemptSession;
use crate::db::types::FinishReason;
use crate::repositories;
use crate::repositories::answers::NewAnswer;
use crate::repositories::attempts::FinishAttempt;
use crate::services::quiz_content;
use crate::services::scoring::{self, ScoreResult};

#[derive(Debug)]
pub(crate) struct SubmittedAttempt {
    pub(crate) attempt: AttemptSession,
    pub(crate) result: ScoreResult,
}

/// Scores and finalizes the attempt behind `token` in one transaction.
///
/// `answers` maps question id to the selected option id (`None` for an explicit skip).
pub(crate) async fn submit_attempt(
    pool: &PgPool,
    student_id: &str,
    quiz_id: &str,
    token: &str,
    answers: HashMap<String, Option<String>>,
    now: PrimitiveDateTime,
) -> Result<SubmittedAttempt, AttemptError> {
    let mut tx = pool.begin().await?;

    let session = repositories::attempts::lock_by_token(&mut *tx, token)
        .await?
        .ok_or(AttemptError::InvalidToken)?;

    if session.quiz_id != quiz_id {
        return Err(AttemptError::InvalidToken);
    }
    if session.student_id != student_id {
        return Err(AttemptError::NotOwner);
    }
    check_submit(&session, now)?;

    let quiz = repositories::quizzes::find_by_id(&mut *tx, quiz_id)
        .await?
        .ok_or(AttemptError::QuizNotFound)?;
    let content = quiz_content::load(&mut *tx, quiz_id).await?;
    let key = quiz_content::answer_key(&quiz, &content);

    let mut unknown: Vec<&str> = answers
        .keys()
        .filter(|question_id| !key.contains_question(question_id))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(AttemptError::Validation(format!(
            "Questions do not belong to this quiz: {}",
            unknown.join(", ")
        )));
    }

    let result = scoring::score(&key, &answers);

    let rows: Vec<NewAnswer<'_>> = result
        .outcomes
        .iter()
        .map(|outcome| NewAnswer {
            question_id: &outcome.question_id,
            selected_option_id: outcome.selected_option_id.as_deref(),
            is_correct: outcome.is_correct,
            points_awarded: outcome.points_awarded,
        })
        .collect();
    repositories::answers::insert_many(&mut *tx, &session.id, &rows, now).await?;

    let attempt = repositories::attempts::finish(
        &mut *tx,
        &session.id,
        FinishAttempt {
            score: result.total_points,
            max_points: result.max_points,
            passed: result.passed,
            reason: FinishReason::Submitted,
            finished_at: now,
        },
    )
    .await?
    .ok_or(AttemptError::AlreadySubmitted)?;

    tx.commit().await?;

    metrics::record_attempt_submitted(result.passed);
    tracing::info!(
        attempt_id = %attempt.id,
        quiz_id = %attempt.quiz_id,
        student_id = %attempt.student_id,
        score = result.total_points,
        max_points = result.max_points,
        passed = result.passed,
        "Attempt submitted"
    );

    Ok(SubmittedAttempt { attempt, result })
}
