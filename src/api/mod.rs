pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod authoring;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod options;
pub(crate) mod pagination;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod router;
pub(crate) mod student;
pub(crate) mod validation;
