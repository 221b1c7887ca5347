//! Pure scoring of a submitted answer sheet against a quiz's answer key.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub(crate) struct KeyedOption {
    pub(crate) id: String,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct KeyedQuestion {
    pub(crate) question_id: String,
    pub(crate) points: i32,
    pub(crate) options: Vec<KeyedOption>,
}

/// Questions in their defined order together with the pass threshold.
#[derive(Debug, Clone)]
pub(crate) struct AnswerKey {
    pub(crate) passing_score: i32,
    pub(crate) questions: Vec<KeyedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestionOutcome {
    pub(crate) question_id: String,
    /// `None` when unanswered or when the selection is not one of the question's options.
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) points_awarded: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreResult {
    pub(crate) outcomes: Vec<QuestionOutcome>,
    pub(crate) total_points: i32,
    pub(crate) max_points: i32,
    pub(crate) passed: bool,
}

impl AnswerKey {
    pub(crate) fn contains_question(&self, question_id: &str) -> bool {
        self.questions.iter().any(|question| question.question_id == question_id)
    }
}

/// Scores `answers` (question id to selected option id) against `key`.
/// Questions missing from `answers` count as unanswered.
pub(crate) fn score(key: &AnswerKey, answers: &HashMap<String, Option<String>>) -> ScoreResult {
    let mut outcomes = Vec::with_capacity(key.questions.len());
    let mut total_points = 0;
    let mut max_points = 0;

    for question in &key.questions {
        max_points += question.points;

        let selected = answers
            .get(&question.question_id)
            .and_then(|selection| selection.as_deref())
            .and_then(|option_id| question.options.iter().find(|option| option.id == option_id));

        let is_correct = selected.is_some_and(|option| option.is_correct);
        let points_awarded = if is_correct { question.points } else { 0 };
        total_points += points_awarded;

        outcomes.push(QuestionOutcome {
            question_id: question.question_id.clone(),
            selected_option_id: selected.map(|option| option.id.clone()),
            is_correct,
            points_awarded,
        });
    }

    ScoreResult { outcomes, total_points, max_points, passed: total_points >= key.passing_score }
}

/// Result for a session that ran out of time: nothing answered.
pub(crate) fn score_unanswered(key: &AnswerKey) -> ScoreResult {
    score(key, &HashMap::new())
}
