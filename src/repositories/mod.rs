pub(crate) mod accounts;
pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod faculties;
pub(crate) mod health;
pub(crate) mod options;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod subjects;
