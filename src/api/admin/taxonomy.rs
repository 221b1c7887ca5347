use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{authorize, Authenticated};
use crate::api::validation::ValidJson;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::taxonomy::{
    FacultyPayload, FacultyResponse, SubjectCreate, SubjectListQuery, SubjectResponse, SubjectUpdate,
};
use crate::services::access_policy::Operation;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/faculties", get(list_faculties).post(create_faculty))
        .route(
            "/faculties/:faculty_id",
            get(get_faculty).put(rename_faculty).delete(delete_faculty),
        )
        .route("/subjects", get(list_subjects).post(create_subject))
        .route(
            "/subjects/:subject_id",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
}

pub(super) async fn ensure_faculty_exists(
    state: &AppState,
    faculty_id: &str,
) -> Result<(), ApiError> {
    repositories::faculties::find_by_id(state.db(), faculty_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load faculty"))?
        .map(|_| ())
        .ok_or_else(|| ApiError::Unprocessable(format!("Faculty {faculty_id} does not exist")))
}

async fn list_faculties(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> Result<Json<Vec<FacultyResponse>>, ApiError> {
    authorize(&identity, Operation::ManageFaculties)?;
    let faculties = repositories::faculties::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list faculties"))?;
    Ok(Json(faculties.into_iter().map(FacultyResponse::from).collect()))
}

async fn get_faculty(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(faculty_id): Path<String>,
) -> Result<Json<FacultyResponse>, ApiError> {
    authorize(&identity, Operation::ManageFaculties)?;
    repositories::faculties::find_by_id(state.db(), &faculty_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load faculty"))?
        .map(|faculty| Json(faculty.into()))
        .ok_or_else(|| ApiError::NotFound("Faculty not found".to_string()))
}

async fn create_faculty(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ValidJson(payload): ValidJson<FacultyPayload>,
) -> Result<(StatusCode, Json<FacultyResponse>), ApiError> {
    authorize(&identity, Operation::ManageFaculties)?;
    let faculty = repositories::faculties::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        payload.name.trim(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to create faculty", "Faculty already exists"))?;

    Ok((StatusCode::CREATED, Json(faculty.into())))
}

async fn rename_faculty(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(faculty_id): Path<String>,
    ValidJson(payload): ValidJson<FacultyPayload>,
) -> Result<Json<FacultyResponse>, ApiError> {
    authorize(&identity, Operation::ManageFaculties)?;
    repositories::faculties::rename(state.db(), &faculty_id, payload.name.trim(), primitive_now_utc())
        .await
        .map_err(|e| {
            ApiError::write_failure(e, "Failed to rename faculty", "Faculty already exists")
        })?
        .map(|faculty| Json(faculty.into()))
        .ok_or_else(|| ApiError::NotFound("Faculty not found".to_string()))
}

async fn delete_faculty(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(faculty_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&identity, Operation::ManageFaculties)?;
    let deleted = repositories::faculties::delete(state.db(), &faculty_id)
        .await
        .map_err(|e| ApiError::write_failure(e, "Failed to delete faculty", "Faculty is in use"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Faculty not found".to_string()))
    }
}

async fn list_subjects(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Query(params): Query<SubjectListQuery>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    authorize(&identity, Operation::ManageSubjects)?;
    let subjects = repositories::subjects::list(state.db(), params.faculty_id.as_deref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;
    Ok(Json(subjects.into_iter().map(SubjectResponse::from).collect()))
}

async fn get_subject(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(subject_id): Path<String>,
) -> Result<Json<SubjectResponse>, ApiError> {
    authorize(&identity, Operation::ManageSubjects)?;
    repositories::subjects::find_by_id(state.db(), &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .map(|subject| Json(subject.into()))
        .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
}

async fn create_subject(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    ValidJson(payload): ValidJson<SubjectCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    authorize(&identity, Operation::ManageSubjects)?;
    if let Some(faculty_id) = payload.faculty_id.as_deref() {
        ensure_faculty_exists(&state, faculty_id).await?;
    }

    let subject = repositories::subjects::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        payload.name.trim(),
        payload.faculty_id.as_deref(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to create subject", "Subject already exists"))?;

    Ok((StatusCode::CREATED, Json(subject.into())))
}

async fn update_subject(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(subject_id): Path<String>,
    ValidJson(payload): ValidJson<SubjectUpdate>,
) -> Result<Json<SubjectResponse>, ApiError> {
    authorize(&identity, Operation::ManageSubjects)?;
    if let Some(Some(faculty_id)) = payload.faculty_id.as_ref() {
        ensure_faculty_exists(&state, faculty_id).await?;
    }

    repositories::subjects::update(
        state.db(),
        &subject_id,
        payload.name.as_deref().map(str::trim),
        payload.faculty_id.as_ref().map(|faculty_id| faculty_id.as_deref()),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::write_failure(e, "Failed to update subject", "Subject already exists"))?
    .map(|subject| Json(subject.into()))
    .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))
}

async fn delete_subject(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    Path(subject_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&identity, Operation::ManageSubjects)?;
    let deleted = repositories::subjects::delete(state.db(), &subject_id)
        .await
        .map_err(|e| {
            ApiError::write_failure(e, "Failed to delete subject", "Subject still has quizzes")
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Subject not found".to_string()))
    }
}
