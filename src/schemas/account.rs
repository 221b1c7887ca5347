use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Account;
use crate::db::types::Role;
use crate::schemas::deserialize_double_option;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AccountCreate {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    pub(crate) username: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    pub(crate) password: String,
    #[serde(default, alias = "facultyId")]
    pub(crate) faculty_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AccountUpdate {
    #[serde(default, alias = "fullName")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default, alias = "facultyId", deserialize_with = "deserialize_double_option")]
    pub(crate) faculty_id: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccountResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) faculty_id: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AccountResponse {
    pub(crate) fn from_account(account: Account, role: Role) -> Self {
        Self {
            id: account.id,
            username: account.username,
            full_name: account.full_name,
            role,
            faculty_id: account.faculty_id,
            is_active: account.is_active,
            created_at: format_primitive(account.created_at),
            updated_at: format_primitive(account.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faculty_update_tells_null_from_absent() {
        let absent: AccountUpdate = serde_json::from_str(r#"{"full_name":"A"}"#).unwrap();
        assert_eq!(absent.faculty_id, None);

        let cleared: AccountUpdate = serde_json::from_str(r#"{"faculty_id":null}"#).unwrap();
        assert_eq!(cleared.faculty_id, Some(None));

        let set: AccountUpdate = serde_json::from_str(r#"{"facultyId":"f-1"}"#).unwrap();
        assert_eq!(set.faculty_id, Some(Some("f-1".to_string())));
    }
}
