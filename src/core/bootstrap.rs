use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::accounts::{self, AccountStore, CreateAccount};

/// Makes sure the configured first admin exists, is active and uses the configured password.
pub(crate) async fn ensure_first_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin bootstrap");
        return Ok(());
    }

    let username = &admin.first_admin_username;
    let now = primitive_now_utc();
    let existing = accounts::find_by_username(state.db(), AccountStore::Admins, username).await?;

    if let Some(account) = existing {
        let verified =
            security::verify_password(&admin.first_admin_password, &account.hashed_password)
                .unwrap_or(false);

        if verified && account.is_active {
            tracing::info!(username = %username, "First admin already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            account.hashed_password.clone()
        } else {
            security::hash_password(&admin.first_admin_password)?
        };

        accounts::reset_credentials(
            state.db(),
            AccountStore::Admins,
            &account.id,
            &hashed_password,
            true,
            now,
        )
        .await?;

        tracing::info!(username = %username, "Updated first admin credentials");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_admin_password)?;
    accounts::create(
        state.db(),
        AccountStore::Admins,
        CreateAccount {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password: &hashed_password,
            full_name: "Administrator",
            faculty_id: None,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(username = %username, "Created first admin");
    Ok(())
}
