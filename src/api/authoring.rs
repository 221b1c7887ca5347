use sqlx::{Postgres, Transaction};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::{AnswerOption, Question, Quiz};
use crate::repositories;
use crate::repositories::options::NewOption;
use crate::schemas::quiz::{QuestionCreate, QuestionResponse, QuizSummary, TeacherQuizResponse};
use crate::services::access_policy::{self, Identity};
use crate::services::quiz_content;

/// Loads a quiz and checks that the caller authored it.
pub(super) async fn load_owned_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    identity: &Identity,
    quiz_id: &str,
) -> Result<Quiz, ApiError> {
    let quiz = repositories::quizzes::find_by_id(executor, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;
    access_policy::ensure_quiz_owner(identity, &quiz.teacher_id)?;
    Ok(quiz)
}

pub(super) async fn load_owned_question(
    tx: &mut Transaction<'_, Postgres>,
    identity: &Identity,
    question_id: &str,
) -> Result<(Quiz, Question), ApiError> {
    let question = repositories::questions::find_by_id(&mut **tx, question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    let quiz = load_owned_quiz(&mut **tx, identity, &question.quiz_id).await?;
    Ok((quiz, question))
}

pub(super) async fn load_owned_option(
    tx: &mut Transaction<'_, Postgres>,
    identity: &Identity,
    option_id: &str,
) -> Result<(Question, AnswerOption), ApiError> {
    let option = repositories::options::find_by_id(&mut **tx, option_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load option"))?
        .ok_or_else(|| ApiError::NotFound("Option not found".to_string()))?;
    let (_, question) = load_owned_question(tx, identity, &option.question_id).await?;
    Ok((question, option))
}

/// Questions and options stay fixed once any student has opened the quiz.
pub(super) async fn ensure_no_attempts(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<(), ApiError> {
    let attempted = repositories::attempts::exists_for_quiz(executor, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check quiz attempts"))?;
    if attempted {
        return Err(ApiError::Conflict(
            "Quiz already has attempts; its questions and options can no longer be removed"
                .to_string(),
        ));
    }
    Ok(())
}

pub(super) async fn ensure_subject_exists(
    executor: impl sqlx::PgExecutor<'_>,
    subject_id: &str,
) -> Result<(), ApiError> {
    repositories::subjects::find_by_id(executor, subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .map(|_| ())
        .ok_or_else(|| ApiError::Unprocessable(format!("Subject {subject_id} does not exist")))
}

pub(super) fn check_window(start: PrimitiveDateTime, end: PrimitiveDateTime) -> Result<(), ApiError> {
    if end > start {
        Ok(())
    } else {
        Err(ApiError::Unprocessable("end_time must be after start_time".to_string()))
    }
}

/// Inserts a question and its options. The payload must already carry exactly one correct option.
pub(super) async fn insert_question(
    tx: &mut Transaction<'_, Postgres>,
    quiz_id: &str,
    payload: &QuestionCreate,
    position: i32,
    now: PrimitiveDateTime,
) -> Result<QuestionResponse, ApiError> {
    let question = repositories::questions::create(
        &mut **tx,
        &Uuid::new_v4().to_string(),
        quiz_id,
        &payload.text,
        payload.points,
        position,
        now,
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to create question", "Question conflicts"))?;

    let options: Vec<NewOption<'_>> = payload
        .options
        .iter()
        .enumerate()
        .map(|(index, option)| NewOption {
            id: Uuid::new_v4().to_string(),
            text: &option.text,
            is_correct: option.is_correct,
            position: index as i32,
        })
        .collect();

    let options = repositories::options::insert_many(&mut **tx, &question.id, &options, now)
        .await
        .map_err(|e| ApiError::write_failure(e, "Failed to create options", "Option conflicts"))?;

    Ok(QuestionResponse::new(question, options))
}

pub(super) async fn teacher_view(
    state: &AppState,
    quiz: &Quiz,
) -> Result<TeacherQuizResponse, ApiError> {
    let mut conn =
        state.db().acquire().await.map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;
    let content = quiz_content::load(&mut *conn, &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz content"))?;

    Ok(TeacherQuizResponse {
        quiz: QuizSummary::from(quiz),
        max_points: content.iter().map(|item| item.question.points).sum(),
        questions: content.into_iter().map(QuestionResponse::from).collect(),
    })
}
