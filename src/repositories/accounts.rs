use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Account;
use crate::db::types::Role;

/// One of the three credential stores. Admins and teachers have no faculty column;
/// their rows select a typed NULL so every store maps onto [`Account`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccountStore {
    Admins,
    Teachers,
    Students,
}

impl AccountStore {
    pub(crate) fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admins,
            Role::Teacher => Self::Teachers,
            Role::Student => Self::Students,
        }
    }

    pub(crate) fn role(self) -> Role {
        match self {
            Self::Admins => Role::Admin,
            Self::Teachers => Role::Teacher,
            Self::Students => Role::Student,
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::Admins => "admins",
            Self::Teachers => "teachers",
            Self::Students => "students",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            Self::Students => {
                "id, username, hashed_password, full_name, faculty_id, is_active, created_at, updated_at"
            }
            Self::Admins | Self::Teachers => {
                "id, username, hashed_password, full_name, NULL::TEXT AS faculty_id, is_active, \
                 created_at, updated_at"
            }
        }
    }
}

pub(crate) struct CreateAccount<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) hashed_password: &'a str,
    pub(crate) full_name: &'a str,
    pub(crate) faculty_id: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct UpdateAccount {
    pub(crate) full_name: Option<String>,
    pub(crate) hashed_password: Option<String>,
    pub(crate) is_active: Option<bool>,
    /// `Some(None)` clears the faculty. Ignored outside the student store.
    pub(crate) faculty_id: Option<Option<String>>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    store: AccountStore,
    id: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM {} WHERE id = $1",
        store.columns(),
        store.table()
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_username(
    executor: impl sqlx::PgExecutor<'_>,
    store: AccountStore,
    username: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM {} WHERE username = $1",
        store.columns(),
        store.table()
    ))
    .bind(username)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    store: AccountStore,
    search: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Account>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM {} WHERE 1=1",
        store.columns(),
        store.table()
    ));

    if let Some(search) = search {
        let pattern = format!("%{search}%");
        builder.push(" AND (username ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR full_name ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(" ORDER BY username OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Account>().fetch_all(pool).await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    store: AccountStore,
    params: CreateAccount<'_>,
) -> Result<Account, sqlx::Error> {
    let sql = match store {
        AccountStore::Students => format!(
            "INSERT INTO students (
                id, username, hashed_password, full_name, faculty_id, is_active, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,TRUE,$6,$6)
            RETURNING {}",
            store.columns()
        ),
        AccountStore::Admins | AccountStore::Teachers => format!(
            "INSERT INTO {} (
                id, username, hashed_password, full_name, is_active, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,TRUE,$5,$5)
            RETURNING {}",
            store.table(),
            store.columns()
        ),
    };

    let mut query = sqlx::query_as::<_, Account>(&sql)
        .bind(params.id)
        .bind(params.username)
        .bind(params.hashed_password)
        .bind(params.full_name);
    if store == AccountStore::Students {
        query = query.bind(params.faculty_id);
    }

    query.bind(params.created_at).fetch_one(executor).await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    store: AccountStore,
    id: &str,
    params: UpdateAccount,
) -> Result<Option<Account>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", store.table()));
    let mut fields = builder.separated(", ");

    if let Some(full_name) = params.full_name {
        fields.push("full_name = ").push_bind_unseparated(full_name);
    }
    if let Some(hashed_password) = params.hashed_password {
        fields.push("hashed_password = ").push_bind_unseparated(hashed_password);
    }
    if let Some(is_active) = params.is_active {
        fields.push("is_active = ").push_bind_unseparated(is_active);
    }
    if let (AccountStore::Students, Some(faculty_id)) = (store, params.faculty_id) {
        fields.push("faculty_id = ").push_bind_unseparated(faculty_id);
    }
    fields.push("updated_at = ").push_bind_unseparated(params.updated_at);

    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(format!(" RETURNING {}", store.columns()));

    builder.build_query_as::<Account>().fetch_optional(executor).await
}

pub(crate) async fn reset_credentials(
    executor: impl sqlx::PgExecutor<'_>,
    store: AccountStore,
    id: &str,
    hashed_password: &str,
    is_active: bool,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "UPDATE {} SET hashed_password = $1, is_active = $2, updated_at = $3 WHERE id = $4",
        store.table()
    ))
    .bind(hashed_password)
    .bind(is_active)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    store: AccountStore,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", store.table()))
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
