use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::{format_primitive, remaining_seconds};
use crate::db::models::{AnswerRecord, AttemptSession};
use crate::db::types::{AttemptStatus, FinishReason};
use crate::repositories::attempts::AttemptWithStudent;
use crate::schemas::quiz::OptionResponse;
use crate::services::attempts::Solutions;
use crate::services::quiz_content::QuestionWithOptions;
use crate::services::scoring::ScoreResult;

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct StartAttemptRequest {
    #[serde(default)]
    pub(crate) password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptTokenResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) attempt_token: String,
    pub(crate) started_at: Option<String>,
    pub(crate) expires_at: Option<String>,
    pub(crate) remaining_seconds: i64,
    pub(crate) resumed: bool,
}

impl AttemptTokenResponse {
    pub(crate) fn new(attempt: AttemptSession, resumed: bool, now: PrimitiveDateTime) -> Self {
        Self {
            remaining_seconds: attempt
                .attempt_token_expires_at
                .map(|deadline| remaining_seconds(deadline, now))
                .unwrap_or(0),
            started_at: attempt.started_at.map(format_primitive),
            expires_at: attempt.attempt_token_expires_at.map(format_primitive),
            attempt_token: attempt.attempt_token.unwrap_or_default(),
            attempt_id: attempt.id,
            quiz_id: attempt.quiz_id,
            resumed,
        }
    }
}

/// Option as shown while the attempt is running: no correctness flag.
#[derive(Debug, Serialize)]
pub(crate) struct StudentOption {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) position: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) points: i32,
    pub(crate) position: i32,
    pub(crate) options: Vec<StudentOption>,
}

impl From<QuestionWithOptions> for StudentQuestion {
    fn from(item: QuestionWithOptions) -> Self {
        Self {
            id: item.question.id,
            text: item.question.text,
            points: item.question.points,
            position: item.question.position,
            options: item
                .options
                .into_iter()
                .map(|option| StudentOption {
                    id: option.id,
                    text: option.text,
                    position: option.position,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionsResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) remaining_seconds: i64,
    pub(crate) questions: Vec<StudentQuestion>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerEntry {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    #[serde(default, alias = "optionId", alias = "selected_option_id")]
    pub(crate) option_id: Option<String>,
}

/// Answers arrive either as a list of entries or as a `question_id -> option_id` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SubmittedAnswers {
    List(Vec<AnswerEntry>),
    Map(HashMap<String, Option<String>>),
}

impl Default for SubmittedAnswers {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl SubmittedAnswers {
    pub(crate) fn into_map(self) -> Result<HashMap<String, Option<String>>, String> {
        match self {
            Self::Map(map) => Ok(map),
            Self::List(entries) => {
                let mut map = HashMap::with_capacity(entries.len());
                for entry in entries {
                    if map.insert(entry.question_id.clone(), entry.option_id).is_some() {
                        return Err(format!("question {} answered more than once", entry.question_id));
                    }
                }
                Ok(map)
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) answers: SubmittedAnswers,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResult {
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) points_awarded: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) total_points: i32,
    pub(crate) max_points: i32,
    pub(crate) passed: bool,
    pub(crate) finished_at: Option<String>,
    pub(crate) results: Vec<QuestionResult>,
}

impl ScoreResponse {
    pub(crate) fn new(attempt: AttemptSession, result: ScoreResult) -> Self {
        Self {
            attempt_id: attempt.id,
            quiz_id: attempt.quiz_id,
            total_points: result.total_points,
            max_points: result.max_points,
            passed: result.passed,
            finished_at: attempt.finished_at.map(format_primitive),
            results: result
                .outcomes
                .into_iter()
                .map(|outcome| QuestionResult {
                    question_id: outcome.question_id,
                    selected_option_id: outcome.selected_option_id,
                    is_correct: outcome.is_correct,
                    points_awarded: outcome.points_awarded,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SolutionQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) points: i32,
    pub(crate) correct_option_id: Option<String>,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) points_awarded: i32,
    pub(crate) options: Vec<OptionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SolutionsResponse {
    pub(crate) quiz_id: String,
    pub(crate) attempt_id: String,
    pub(crate) score: Option<i32>,
    pub(crate) max_points: Option<i32>,
    pub(crate) passing_score: i32,
    pub(crate) passed: Option<bool>,
    pub(crate) finish_reason: Option<FinishReason>,
    pub(crate) finished_at: Option<String>,
    pub(crate) questions: Vec<SolutionQuestion>,
}

impl From<Solutions> for SolutionsResponse {
    fn from(solutions: Solutions) -> Self {
        let mut answers: HashMap<String, AnswerRecord> = solutions
            .answers
            .into_iter()
            .map(|answer| (answer.question_id.clone(), answer))
            .collect();

        let questions = solutions
            .content
            .into_iter()
            .map(|item| {
                let answer = answers.remove(&item.question.id);
                SolutionQuestion {
                    correct_option_id: item
                        .options
                        .iter()
                        .find(|option| option.is_correct)
                        .map(|option| option.id.clone()),
                    selected_option_id: answer
                        .as_ref()
                        .and_then(|answer| answer.selected_option_id.clone()),
                    is_correct: answer.as_ref().is_some_and(|answer| answer.is_correct),
                    points_awarded: answer.as_ref().map_or(0, |answer| answer.points_awarded),
                    id: item.question.id,
                    text: item.question.text,
                    points: item.question.points,
                    options: item.options.into_iter().map(OptionResponse::from).collect(),
                }
            })
            .collect();

        Self {
            quiz_id: solutions.quiz.id,
            attempt_id: solutions.attempt.id,
            score: solutions.attempt.score,
            max_points: solutions.attempt.max_points,
            passing_score: solutions.quiz.passing_score,
            passed: solutions.attempt.passed,
            finish_reason: solutions.attempt.finish_reason,
            finished_at: solutions.attempt.finished_at.map(format_primitive),
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuizAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) student_username: String,
    pub(crate) student_full_name: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: Option<String>,
    pub(crate) expires_at: Option<String>,
    pub(crate) finished_at: Option<String>,
    pub(crate) score: Option<i32>,
    pub(crate) max_points: Option<i32>,
    pub(crate) passed: Option<bool>,
    pub(crate) finish_reason: Option<FinishReason>,
}

impl From<AttemptWithStudent> for QuizAttemptResponse {
    fn from(row: AttemptWithStudent) -> Self {
        let attempt = row.attempt;
        Self {
            attempt_id: attempt.id,
            student_id: attempt.student_id,
            student_username: row.student_username,
            student_full_name: row.student_full_name,
            status: attempt.status,
            started_at: attempt.started_at.map(format_primitive),
            expires_at: attempt.attempt_token_expires_at.map(format_primitive),
            finished_at: attempt.finished_at.map(format_primitive),
            score: attempt.score,
            max_points: attempt.max_points,
            passed: attempt.passed,
            finish_reason: attempt.finish_reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SweepResponse {
    pub(crate) swept: u64,
}
