use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::services::attempts::{self, SWEEP_BATCH_SIZE};

/// Runs background maintenance until a shutdown signal arrives.
pub(crate) async fn run(state: AppState) -> Result<()> {
    let shutdown = crate::core::shutdown::shutdown_receiver();

    let interval_seconds = state.settings().attempts().sweep_interval_seconds;
    if interval_seconds == 0 {
        tracing::warn!("Expired-attempt sweep disabled; worker idles until shutdown");
        wait_for_shutdown(shutdown).await;
        return Ok(());
    }

    let handle = tokio::spawn(sweep_expired_loop(
        state,
        Duration::from_secs(interval_seconds),
        shutdown,
    ));

    if let Err(err) = handle.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

async fn sweep_expired_loop(state: AppState, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = sweep_once(&state).await {
                    tracing::error!(error = %err, "sweep_expired failed");
                }
            }
        }
    }

    tracing::info!("Expired-attempt sweep stopped");
}

pub(crate) async fn sweep_once(state: &AppState) -> Result<u64> {
    let swept = attempts::sweep_expired(state.db(), primitive_now_utc(), SWEEP_BATCH_SIZE).await?;
    Ok(swept)
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::sweep_once;
    use crate::core::time::primitive_now_utc;
    use crate::db::types::AttemptStatus;
    use crate::repositories;
    use crate::services::attempts::{start_attempt, StartRequest};
    use crate::test_support::{self, QuizFixture};

    #[tokio::test]
    async fn sweep_once_closes_sessions_past_expiry() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let teacher = test_support::insert_teacher(pool, "teacher").await;
        let student = test_support::insert_student(pool, "student").await;
        let subject = test_support::insert_subject(pool, "Algebra").await;
        let quiz = test_support::insert_quiz(pool, QuizFixture::open(&teacher.id, &subject.id)).await;
        test_support::insert_question(pool, &quiz.id, 3, &["right", "wrong"]).await;

        // Thirty minutes ago is inside the fixture window and past the ten minute limit.
        let started = start_attempt(
            pool,
            StartRequest {
                student_id: &student.id,
                quiz_id: &quiz.id,
                password: None,
                token_bytes: 32,
                now: primitive_now_utc() - Duration::minutes(30),
            },
        )
        .await
        .expect("start");

        assert_eq!(sweep_once(&ctx.state).await.expect("sweep"), 1);
        assert_eq!(sweep_once(&ctx.state).await.expect("second sweep"), 0);

        let attempt = repositories::attempts::find_for_student_quiz(pool, &student.id, &quiz.id)
            .await
            .expect("load")
            .expect("attempt");
        assert_eq!(attempt.id, started.attempt.id);
        assert_eq!(attempt.status, AttemptStatus::Finished);
        assert_eq!(attempt.score, Some(0));
    }
}
