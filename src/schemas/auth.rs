use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::Role;
use crate::schemas::account::AccountResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(length(min = 1, max = 64, message = "username must not be empty"))]
    pub(crate) username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) role: Role,
    pub(crate) account: AccountResponse,
}
