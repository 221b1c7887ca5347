use serde::Deserialize;

use crate::api::errors::ApiError;

pub(crate) const MAX_LIMIT: i64 = 1000;

pub(crate) const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

impl PageQuery {
    pub(crate) fn checked(&self) -> Result<(i64, i64), ApiError> {
        if self.skip < 0 {
            return Err(ApiError::BadRequest("skip must be non-negative".to_string()));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(ApiError::BadRequest(format!("limit must be between 1 and {MAX_LIMIT}")));
        }
        Ok((self.skip, self.limit))
    }
}
