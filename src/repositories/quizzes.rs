use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Quiz;

pub(crate) const COLUMNS: &str = "\
    id, title, description, password_hash, teacher_id, subject_id, time_limit_minutes, \
    passing_score, start_time, end_time, created_at, updated_at";

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) password_hash: Option<String>,
    pub(crate) teacher_id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) time_limit_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Full replacement of the editable quiz fields. `password_hash` is written as given.
pub(crate) struct UpdateQuiz {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) password_hash: Option<String>,
    pub(crate) subject_id: String,
    pub(crate) time_limit_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) struct ListFilter<'a> {
    pub(crate) teacher_id: Option<&'a str>,
    pub(crate) subject_id: Option<&'a str>,
    pub(crate) search: Option<&'a str>,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: ListFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Quiz>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM quizzes WHERE 1=1"));

    if let Some(teacher_id) = filter.teacher_id {
        builder.push(" AND teacher_id = ");
        builder.push_bind(teacher_id);
    }
    if let Some(subject_id) = filter.subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id);
    }
    if let Some(search) = filter.search {
        builder.push(" AND title ILIKE ");
        builder.push_bind(format!("%{search}%"));
    }

    builder.push(" ORDER BY start_time DESC, id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Quiz>().fetch_all(pool).await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuiz<'_>,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, title, description, password_hash, teacher_id, subject_id,
            time_limit_minutes, passing_score, start_time, end_time, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.password_hash)
    .bind(params.teacher_id)
    .bind(params.subject_id)
    .bind(params.time_limit_minutes)
    .bind(params.passing_score)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdateQuiz,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET
            title = $1,
            description = $2,
            password_hash = $3,
            subject_id = $4,
            time_limit_minutes = $5,
            passing_score = $6,
            start_time = $7,
            end_time = $8,
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.password_hash)
    .bind(params.subject_id)
    .bind(params.time_limit_minutes)
    .bind(params.passing_score)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn question_count(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}
