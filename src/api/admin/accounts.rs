use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::taxonomy::ensure_faculty_exists;
use crate::api::errors::ApiError;
use crate::api::guards::{authorize, Authenticated};
use crate::api::pagination::PageQuery;
use crate::api::validation::{validate_password_len, ValidJson};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::accounts::{self, AccountStore, CreateAccount, UpdateAccount};
use crate::schemas::account::{AccountCreate, AccountListQuery, AccountResponse, AccountUpdate};
use crate::services::access_policy::{Identity, Operation};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/:account_id",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/teachers", get(list_teachers).post(create_teacher))
        .route(
            "/teachers/:account_id",
            get(get_teacher).put(update_teacher).delete(delete_teacher),
        )
}

fn operation_for(store: AccountStore) -> Operation {
    match store {
        AccountStore::Teachers => Operation::ManageTeachers,
        AccountStore::Students | AccountStore::Admins => Operation::ManageStudents,
    }
}

async fn list_students(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Query(params): Query<AccountListQuery>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    list_accounts(&state, &identity, AccountStore::Students, params).await
}

async fn list_teachers(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Query(params): Query<AccountListQuery>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    list_accounts(&state, &identity, AccountStore::Teachers, params).await
}

async fn get_student(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    get_account(&state, &identity, AccountStore::Students, &account_id).await
}

async fn get_teacher(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    get_account(&state, &identity, AccountStore::Teachers, &account_id).await
}

async fn create_student(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ValidJson(payload): ValidJson<AccountCreate>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    create_account(&state, &identity, AccountStore::Students, payload).await
}

async fn create_teacher(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ValidJson(payload): ValidJson<AccountCreate>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    create_account(&state, &identity, AccountStore::Teachers, payload).await
}

async fn update_student(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(account_id): Path<String>,
    ValidJson(payload): ValidJson<AccountUpdate>,
) -> Result<Json<AccountResponse>, ApiError> {
    update_account(&state, &identity, AccountStore::Students, &account_id, payload).await
}

async fn update_teacher(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(account_id): Path<String>,
    ValidJson(payload): ValidJson<AccountUpdate>,
) -> Result<Json<AccountResponse>, ApiError> {
    update_account(&state, &identity, AccountStore::Teachers, &account_id, payload).await
}

async fn delete_student(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(account_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_account(&state, &identity, AccountStore::Students, &account_id).await
}

async fn delete_teacher(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(account_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete_account(&state, &identity, AccountStore::Teachers, &account_id).await
}

async fn list_accounts(
    state: &AppState,
    identity: &Identity,
    store: AccountStore,
    params: AccountListQuery,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    authorize(identity, operation_for(store))?;
    let (skip, limit) = PageQuery { skip: params.skip, limit: params.limit }.checked()?;

    let rows = accounts::list(
        state.db(),
        store,
        params.search.as_deref().map(str::trim).filter(|value| !value.is_empty()),
        skip,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list accounts"))?;

    Ok(Json(
        rows.into_iter()
            .map(|account| AccountResponse::from_account(account, store.role()))
            .collect(),
    ))
}

async fn get_account(
    state: &AppState,
    identity: &Identity,
    store: AccountStore,
    account_id: &str,
) -> Result<Json<AccountResponse>, ApiError> {
    authorize(identity, operation_for(store))?;
    accounts::find_by_id(state.db(), store, account_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load account"))?
        .map(|account| Json(AccountResponse::from_account(account, store.role())))
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
}

async fn create_account(
    state: &AppState,
    identity: &Identity,
    store: AccountStore,
    payload: AccountCreate,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    authorize(identity, operation_for(store))?;
    validate_password_len(&payload.password)?;

    let faculty_id = match store {
        AccountStore::Students => payload.faculty_id.as_deref(),
        AccountStore::Teachers | AccountStore::Admins => None,
    };
    if let Some(faculty_id) = faculty_id {
        ensure_faculty_exists(state, faculty_id).await?;
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let account = accounts::create(
        state.db(),
        store,
        CreateAccount {
            id: &Uuid::new_v4().to_string(),
            username: payload.username.trim(),
            hashed_password: &hashed_password,
            full_name: payload.full_name.trim(),
            faculty_id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to create account", "Username already taken"))?;

    tracing::info!(
        role = store.role().as_str(),
        account_id = %account.id,
        username = %account.username,
        "Account created"
    );

    Ok((StatusCode::CREATED, Json(AccountResponse::from_account(account, store.role()))))
}

async fn update_account(
    state: &AppState,
    identity: &Identity,
    store: AccountStore,
    account_id: &str,
    payload: AccountUpdate,
) -> Result<Json<AccountResponse>, ApiError> {
    authorize(identity, operation_for(store))?;

    let hashed_password = match payload.password.as_deref() {
        Some(password) => {
            validate_password_len(password)?;
            Some(
                security::hash_password(password)
                    .map_err(|e| ApiError::internal(e, "Failed to hash password"))?,
            )
        }
        None => None,
    };

    if let Some(Some(faculty_id)) = payload.faculty_id.as_ref() {
        ensure_faculty_exists(state, faculty_id).await?;
    }

    accounts::update(
        state.db(),
        store,
        account_id,
        UpdateAccount {
            full_name: payload.full_name.map(|name| name.trim().to_string()),
            hashed_password,
            is_active: payload.is_active,
            faculty_id: payload.faculty_id,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to update account", "Account conflicts"))?
    .map(|account| Json(AccountResponse::from_account(account, store.role())))
    .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
}

async fn delete_account(
    state: &AppState,
    identity: &Identity,
    store: AccountStore,
    account_id: &str,
) -> Result<StatusCode, ApiError> {
    authorize(identity, operation_for(store))?;
    let deleted = accounts::delete(state.db(), store, account_id)
        .await
        .map_err(|e| {
            ApiError::write_failure(e, "Failed to delete account", "Account still owns quizzes")
        })?;

    if deleted {
        tracing::info!(role = store.role().as_str(), account_id, "Account deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Account not found".to_string()))
    }
}
