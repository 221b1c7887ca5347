use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, FinishReason};

/// Row shape shared by the admin, teacher and student tables.
/// `faculty_id` is always `None` outside the student store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Account {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) faculty_id: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Faculty {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) faculty_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Quiz {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) password_hash: Option<String>,
    pub(crate) teacher_id: String,
    pub(crate) subject_id: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) text: String,
    pub(crate) points: i32,
    pub(crate) position: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerOption {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) position: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptSession {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) quiz_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) attempt_token: Option<String>,
    pub(crate) attempt_token_expires_at: Option<PrimitiveDateTime>,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
    pub(crate) score: Option<i32>,
    pub(crate) max_points: Option<i32>,
    pub(crate) passed: Option<bool>,
    pub(crate) finish_reason: Option<FinishReason>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AnswerRecord {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) points_awarded: i32,
    pub(crate) created_at: PrimitiveDateTime,
}
