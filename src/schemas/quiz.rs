use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::{format_primitive, to_primitive_utc};
use crate::db::models::{AnswerOption, Question, Quiz};
use crate::services::quiz_content::QuestionWithOptions;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct OptionCreate {
    #[validate(length(min = 1, message = "option text must not be empty"))]
    pub(crate) text: String,
    #[serde(default, alias = "isCorrect")]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: String,
    #[validate(range(min = 1, message = "points must be positive"))]
    pub(crate) points: i32,
    #[validate(length(min = 1, message = "a question needs at least one option"), nested)]
    pub(crate) options: Vec<OptionCreate>,
}

impl QuestionCreate {
    /// Single-answer model: exactly one option is marked correct.
    pub(crate) fn check_single_correct(&self) -> Result<(), String> {
        match self.options.iter().filter(|option| option.is_correct).count() {
            1 => Ok(()),
            0 => Err(format!("question '{}' has no correct option", self.text)),
            _ => Err(format!("question '{}' has more than one correct option", self.text)),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizCreate {
    #[validate(length(min = 1, max = 300, message = "title must be 1-300 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: String,
    #[serde(alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: i32,
    #[serde(alias = "passingScore")]
    #[validate(range(min = 0, message = "passing_score must be non-negative"))]
    pub(crate) passing_score: i32,
    #[serde(alias = "startTime", deserialize_with = "deserialize_utc_datetime")]
    pub(crate) start_time: PrimitiveDateTime,
    #[serde(alias = "endTime", deserialize_with = "deserialize_utc_datetime")]
    pub(crate) end_time: PrimitiveDateTime,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

/// Partial update. An empty `password` string removes the password.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 300, message = "title must be 1-300 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
    #[serde(default, alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    #[serde(default, alias = "timeLimitMinutes")]
    #[validate(range(min = 1, message = "time_limit_minutes must be positive"))]
    pub(crate) time_limit_minutes: Option<i32>,
    #[serde(default, alias = "passingScore")]
    #[validate(range(min = 0, message = "passing_score must be non-negative"))]
    pub(crate) passing_score: Option<i32>,
    #[serde(default, alias = "startTime", deserialize_with = "deserialize_option_utc_datetime")]
    pub(crate) start_time: Option<PrimitiveDateTime>,
    #[serde(default, alias = "endTime", deserialize_with = "deserialize_option_utc_datetime")]
    pub(crate) end_time: Option<PrimitiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizListQuery {
    #[serde(default, alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    #[serde(default, alias = "teacherId")]
    pub(crate) teacher_id: Option<String>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionAdd {
    #[serde(alias = "quizId")]
    pub(crate) quiz_id: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) question: QuestionCreate,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "question text must not be empty"))]
    pub(crate) text: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "points must be positive"))]
    pub(crate) points: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0, message = "position must be non-negative"))]
    pub(crate) position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OptionAdd {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    #[validate(length(min = 1, message = "option text must not be empty"))]
    pub(crate) text: String,
    #[serde(default, alias = "isCorrect")]
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OptionUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "option text must not be empty"))]
    pub(crate) text: Option<String>,
    #[serde(default, alias = "isCorrect")]
    pub(crate) is_correct: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 0, message = "position must be non-negative"))]
    pub(crate) position: Option<i32>,
}

/// Public view of a quiz. Never carries the password hash or answer key.
#[derive(Debug, Serialize)]
pub(crate) struct QuizSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) teacher_id: String,
    pub(crate) subject_id: String,
    pub(crate) has_password: bool,
    pub(crate) time_limit_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            teacher_id: quiz.teacher_id.clone(),
            subject_id: quiz.subject_id.clone(),
            has_password: quiz.password_hash.is_some(),
            time_limit_minutes: quiz.time_limit_minutes,
            passing_score: quiz.passing_score,
            start_time: format_primitive(quiz.start_time),
            end_time: format_primitive(quiz.end_time),
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PublicQuizResponse {
    #[serde(flatten)]
    pub(crate) quiz: QuizSummary,
    pub(crate) question_count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) position: i32,
}

impl From<AnswerOption> for OptionResponse {
    fn from(option: AnswerOption) -> Self {
        Self {
            id: option.id,
            question_id: option.question_id,
            text: option.text,
            is_correct: option.is_correct,
            position: option.position,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) text: String,
    pub(crate) points: i32,
    pub(crate) position: i32,
    pub(crate) options: Vec<OptionResponse>,
}

impl QuestionResponse {
    pub(crate) fn new(question: Question, options: Vec<AnswerOption>) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            text: question.text,
            points: question.points,
            position: question.position,
            options: options.into_iter().map(OptionResponse::from).collect(),
        }
    }
}

impl From<QuestionWithOptions> for QuestionResponse {
    fn from(item: QuestionWithOptions) -> Self {
        Self::new(item.question, item.options)
    }
}

/// Author's view, including the answer key.
#[derive(Debug, Serialize)]
pub(crate) struct TeacherQuizResponse {
    #[serde(flatten)]
    pub(crate) quiz: QuizSummary,
    pub(crate) max_points: i32,
    pub(crate) questions: Vec<QuestionResponse>,
}

fn parse_utc_datetime_flexible(raw: &str) -> Option<PrimitiveDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(to_primitive_utc(value));
    }

    // Browser datetime-local inputs carry no offset; treat them as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value);
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value);
    }

    None
}

fn deserialize_utc_datetime<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc_datetime_flexible(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn deserialize_option_utc_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<PrimitiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_utc_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn datetimes_accept_offsets_and_local_forms() {
        assert_eq!(
            parse_utc_datetime_flexible("2026-03-01T12:00:00+03:00"),
            Some(datetime!(2026-03-01 09:00:00))
        );
        assert_eq!(parse_utc_datetime_flexible("2026-03-01T12:00"), Some(datetime!(2026-03-01 12:00)));
        assert_eq!(
            parse_utc_datetime_flexible("2026-03-01T12:00:30"),
            Some(datetime!(2026-03-01 12:00:30))
        );
        assert_eq!(parse_utc_datetime_flexible("yesterday"), None);
    }

    #[test]
    fn single_correct_option_is_required() {
        let question: QuestionCreate = serde_json::from_value(serde_json::json!({
            "text": "2+2",
            "points": 1,
            "options": [{"text": "4", "is_correct": true}, {"text": "5", "isCorrect": true}]
        }))
        .unwrap();
        assert!(question.check_single_correct().is_err());

        let question: QuestionCreate = serde_json::from_value(serde_json::json!({
            "text": "2+2",
            "points": 1,
            "options": [{"text": "4"}, {"text": "5"}]
        }))
        .unwrap();
        assert!(question.check_single_correct().is_err());
    }

    #[test]
    fn question_without_options_fails_validation() {
        let question: QuestionCreate = serde_json::from_value(serde_json::json!({
            "text": "2+2",
            "points": 1,
            "options": []
        }))
        .unwrap();
        let errors = question.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("options"), "{errors:?}");

        let question: QuestionCreate = serde_json::from_value(serde_json::json!({
            "text": "2+2",
            "points": 1,
            "options": [{"text": "", "is_correct": true}]
        }))
        .unwrap();
        assert!(question.validate().is_err());
    }

    #[test]
    fn summary_hides_password_hash() {
        let now = datetime!(2026-01-01 00:00);
        let quiz = Quiz {
            id: "q".into(),
            title: "Quiz".into(),
            description: None,
            password_hash: Some("$argon2id$secret".into()),
            teacher_id: "t".into(),
            subject_id: "s".into(),
            time_limit_minutes: 10,
            passing_score: 5,
            start_time: now,
            end_time: now + time::Duration::hours(1),
            created_at: now,
            updated_at: now,
        };
        let body = serde_json::to_value(QuizSummary::from(&quiz)).unwrap();
        assert_eq!(body["has_password"], true);
        assert!(!body.to_string().contains("argon2"));
    }
}
