use std::collections::HashMap;

use sqlx::PgConnection;

use crate::db::models::{AnswerOption, Question, Quiz};
use crate::repositories;
use crate::services::scoring::{AnswerKey, KeyedOption, KeyedQuestion};

#[derive(Debug, Clone)]
pub(crate) struct QuestionWithOptions {
    pub(crate) question: Question,
    pub(crate) options: Vec<AnswerOption>,
}

/// Loads questions in defined order, each with its options in defined order.
pub(crate) async fn load(
    conn: &mut PgConnection,
    quiz_id: &str,
) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
    let questions = repositories::questions::list_by_quiz(&mut *conn, quiz_id).await?;
    let options = repositories::options::list_by_quiz(&mut *conn, quiz_id).await?;
    Ok(group(questions, options))
}

pub(crate) fn group(
    questions: Vec<Question>,
    options: Vec<AnswerOption>,
) -> Vec<QuestionWithOptions> {
    let mut by_question: HashMap<String, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id.clone()).or_default().push(option);
    }

    questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions { question, options }
        })
        .collect()
}

pub(crate) fn answer_key(quiz: &Quiz, content: &[QuestionWithOptions]) -> AnswerKey {
    AnswerKey {
        passing_score: quiz.passing_score,
        questions: content
            .iter()
            .map(|item| KeyedQuestion {
                question_id: item.question.id.clone(),
                points: item.question.points,
                options: item
                    .options
                    .iter()
                    .map(|option| KeyedOption {
                        id: option.id.clone(),
                        is_correct: option.is_correct,
                    })
                    .collect(),
            })
            .collect(),
    }
}
