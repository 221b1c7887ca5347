use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Faculty, Subject};
use crate::schemas::deserialize_double_option;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FacultyPayload {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct FacultyResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Faculty> for FacultyResponse {
    fn from(faculty: Faculty) -> Self {
        Self {
            id: faculty.id,
            name: faculty.name,
            created_at: format_primitive(faculty.created_at),
            updated_at: format_primitive(faculty.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectCreate {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: String,
    #[serde(default, alias = "facultyId")]
    pub(crate) faculty_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default, alias = "facultyId", deserialize_with = "deserialize_double_option")]
    pub(crate) faculty_id: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubjectListQuery {
    #[serde(default, alias = "facultyId")]
    pub(crate) faculty_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) faculty_id: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
            faculty_id: subject.faculty_id,
            created_at: format_primitive(subject.created_at),
            updated_at: format_primitive(subject.updated_at),
        }
    }
}
