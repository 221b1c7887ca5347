use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Lifecycle of an attempt session. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attemptstatus", rename_all = "lowercase")]
pub(crate) enum AttemptStatus {
    Pending,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "finishreason", rename_all = "lowercase")]
pub(crate) enum FinishReason {
    Submitted,
    Expired,
}

/// Account kind. Each role is backed by its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}
