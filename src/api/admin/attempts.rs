use axum::{extract::State, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{authorize, Authenticated};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::attempt::SweepResponse;
use crate::services::access_policy::Operation;
use crate::services::attempts::{self, SWEEP_BATCH_SIZE};

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/admin/attempts/sweep-expired", post(sweep_expired))
}

async fn sweep_expired(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> Result<Json<SweepResponse>, ApiError> {
    let admin_id = authorize(&identity, Operation::SweepAttempts)?;
    let swept =
        attempts::sweep_expired(state.db(), primitive_now_utc(), SWEEP_BATCH_SIZE).await?;
    tracing::info!(admin_id, swept, "Manual expired-attempt sweep");
    Ok(Json(SweepResponse { swept }))
}
