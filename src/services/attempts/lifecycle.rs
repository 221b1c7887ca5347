use time::PrimitiveDateTime;

use super::AttemptError;
use crate::db::models::{AttemptSession, Quiz};
use crate::db::types::AttemptStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StartDecision {
    /// The live token is handed back unchanged.
    Resume,
    /// A fresh token and expiry replace whatever the row held.
    Issue,
}

/// Both window bounds are inclusive.
pub(super) fn check_window(quiz: &Quiz, now: PrimitiveDateTime) -> Result<(), AttemptError> {
    if now < quiz.start_time || now > quiz.end_time {
        return Err(AttemptError::OutOfWindow);
    }
    Ok(())
}

pub(super) fn decide_start(
    session: &AttemptSession,
    now: PrimitiveDateTime,
) -> Result<StartDecision, AttemptError> {
    match session.status {
        AttemptStatus::Finished => Err(AttemptError::AlreadyAttempted),
        AttemptStatus::Pending => Ok(StartDecision::Issue),
        AttemptStatus::Active => match (&session.attempt_token, session.attempt_token_expires_at) {
            (Some(_), Some(expires_at)) if now <= expires_at => Ok(StartDecision::Resume),
            _ => Ok(StartDecision::Issue),
        },
    }
}

/// Token checks for serving questions: expiry wins over every other state.
pub(super) fn check_token(
    session: &AttemptSession,
    now: PrimitiveDateTime,
) -> Result<(), AttemptError> {
    let Some(expires_at) = session.attempt_token_expires_at else {
        return Err(AttemptError::InvalidToken);
    };
    if now > expires_at {
        return Err(AttemptError::Expired);
    }
    if session.status != AttemptStatus::Active {
        return Err(AttemptError::InvalidToken);
    }
    Ok(())
}

/// Token checks for submission: a finished session always reports `AlreadySubmitted`.
pub(super) fn check_submit(
    session: &AttemptSession,
    now: PrimitiveDateTime,
) -> Result<(), AttemptError> {
    if session.status == AttemptStatus::Finished {
        return Err(AttemptError::AlreadySubmitted);
    }
    check_token(session, now)
}
