use thiserror::Error;

use crate::db::types::Role;

/// Authenticated caller, tagged by the credential store it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Identity {
    Admin(String),
    Teacher(String),
    Student(String),
}

impl Identity {
    pub(crate) fn new(role: Role, id: String) -> Self {
        match role {
            Role::Admin => Self::Admin(id),
            Role::Teacher => Self::Teacher(id),
            Role::Student => Self::Student(id),
        }
    }

    pub(crate) fn role(&self) -> Role {
        match self {
            Self::Admin(_) => Role::Admin,
            Self::Teacher(_) => Role::Teacher,
            Self::Student(_) => Role::Student,
        }
    }

    pub(crate) fn id(&self) -> &str {
        match self {
            Self::Admin(id) | Self::Teacher(id) | Self::Student(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    ViewProfile,
    ManageFaculties,
    ManageSubjects,
    ManageStudents,
    ManageTeachers,
    SweepAttempts,
    AuthorQuizzes,
    ViewQuizAttempts,
    TakeQuiz,
}

const POLICY: &[(Operation, &[Role])] = &[
    (Operation::ViewProfile, &[Role::Admin, Role::Teacher, Role::Student]),
    (Operation::ManageFaculties, &[Role::Admin]),
    (Operation::ManageSubjects, &[Role::Admin]),
    (Operation::ManageStudents, &[Role::Admin]),
    (Operation::ManageTeachers, &[Role::Admin]),
    (Operation::SweepAttempts, &[Role::Admin]),
    (Operation::AuthorQuizzes, &[Role::Teacher]),
    (Operation::ViewQuizAttempts, &[Role::Teacher]),
    (Operation::TakeQuiz, &[Role::Student]),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum PolicyError {
    #[error("{role} accounts may not perform this operation")]
    RoleDenied { role: &'static str },
    #[error("Only the quiz author can modify this quiz")]
    NotOwner,
}

pub(crate) fn authorize(role: Role, operation: Operation) -> bool {
    POLICY
        .iter()
        .find(|(op, _)| *op == operation)
        .is_some_and(|(_, roles)| roles.contains(&role))
}

pub(crate) fn ensure_allowed(identity: &Identity, operation: Operation) -> Result<(), PolicyError> {
    if authorize(identity.role(), operation) {
        Ok(())
    } else {
        Err(PolicyError::RoleDenied { role: identity.role().as_str() })
    }
}

/// A teacher may only change quizzes they authored.
pub(crate) fn ensure_quiz_owner(identity: &Identity, quiz_teacher_id: &str) -> Result<(), PolicyError> {
    match identity {
        Identity::Teacher(id) if id == quiz_teacher_id => Ok(()),
        _ => Err(PolicyError::NotOwner),
    }
}
