//! Administrator surfaces: taxonomy, teacher/student accounts and the manual expiry sweep.

mod accounts;
mod attempts;
mod taxonomy;


use axum::Router;

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().merge(taxonomy::router()).merge(accounts::router()).merge(attempts::router())
}
