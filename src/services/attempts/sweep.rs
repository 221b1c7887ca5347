use sqlx::PgPool;
use time::PrimitiveDateTime;

use super::AttemptError;
use crate::core::metrics;
use crate::db::types::FinishReason;
use crate::repositories;
use crate::repositories::answers::NewAnswer;
use crate::repositories::attempts::FinishAttempt;
use crate::services::{quiz_content, scoring};

pub(crate) const SWEEP_BATCH_SIZE: i64 = 200;

/// Finalizes active sessions whose token expired before `now` with an empty answer sheet.
///
/// Each session is closed in its own transaction; rows locked by a concurrent submission are
/// skipped and left to that submission.
pub(crate) async fn sweep_expired(
    pool: &PgPool,
    now: PrimitiveDateTime,
    batch_size: i64,
) -> Result<u64, AttemptError> {
    let mut swept = 0u64;

    loop {
        let ids = repositories::attempts::list_expired_ids(pool, now, batch_size).await?;
        if ids.is_empty() {
            break;
        }

        let mut swept_in_batch = 0u64;
        for id in &ids {
            if expire_one(pool, id, now).await? {
                swept_in_batch += 1;
            }
        }
        swept += swept_in_batch;

        if (ids.len() as i64) < batch_size || swept_in_batch == 0 {
            break;
        }
    }

    metrics::record_attempts_expired(swept);
    if swept > 0 {
        tracing::info!(count = swept, "Finalized expired attempts");
    }

    Ok(swept)
}

async fn expire_one(pool: &PgPool, id: &str, now: PrimitiveDateTime) -> Result<bool, AttemptError> {
    let mut tx = pool.begin().await?;

    let Some(session) = repositories::attempts::lock_expired_by_id(&mut *tx, id, now).await? else {
        return Ok(false);
    };

    let quiz = repositories::quizzes::find_by_id(&mut *tx, &session.quiz_id)
        .await?
        .ok_or(AttemptError::QuizNotFound)?;
    let content = quiz_content::load(&mut *tx, &session.quiz_id).await?;
    let result = scoring::score_unanswered(&quiz_content::answer_key(&quiz, &content));

    let rows: Vec<NewAnswer<'_>> = result
        .outcomes
        .iter()
        .map(|outcome| NewAnswer {
            question_id: &outcome.question_id,
            selected_option_id: None,
            is_correct: false,
            points_awarded: 0,
        })
        .collect();
    repositories::answers::insert_many(&mut *tx, &session.id, &rows, now).await?;

    let finished = repositories::attempts::finish(
        &mut *tx,
        &session.id,
        FinishAttempt {
            score: result.total_points,
            max_points: result.max_points,
            passed: result.passed,
            reason: FinishReason::Expired,
            finished_at: now,
        },
    )
    .await?;

    tx.commit().await?;

    if let Some(attempt) = &finished {
        tracing::info!(
            attempt_id = %attempt.id,
            quiz_id = %attempt.quiz_id,
            student_id = %attempt.student_id,
            "Attempt expired without submission"
        );
    }

    Ok(finished.is_some())
}
