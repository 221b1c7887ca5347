//! Attempt session manager: one timed, token-guarded attempt per student per quiz.

mod lifecycle;
mod start;
mod submit;
mod sweep;
mod token;
mod validate;


use thiserror::Error;

use crate::core::security::SecurityError;

pub(crate) use start::{start_attempt, StartRequest};
pub(crate) use submit::submit_attempt;
pub(crate) use sweep::{sweep_expired, SWEEP_BATCH_SIZE};
pub(crate) use validate::{questions_for_attempt, reveal_solutions, Solutions};

#[cfg(test)]
use validate::validate_token;

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("Quiz not found")]
    QuizNotFound,
    #[error("No attempt found for this quiz")]
    AttemptNotFound,
    #[error("Incorrect quiz password")]
    WrongPassword,
    #[error("This attempt belongs to another student")]
    NotOwner,
    #[error("Quiz is not open for attempts at this time")]
    OutOfWindow,
    #[error("Quiz has already been attempted")]
    AlreadyAttempted,
    #[error("Attempt has already been submitted")]
    AlreadySubmitted,
    #[error("Solutions are available only after the attempt is finished")]
    NotFinished,
    #[error("Attempt token is invalid")]
    InvalidToken,
    #[error("Attempt token has expired")]
    Expired,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Security(#[from] SecurityError),
}
