use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_AVATAR: &str = "default-avatar.png";

/// Single role field on the user record; admins are the same storage shape
/// as customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

/// User record in the database. The password hash never leaves this type
/// unserialized; response DTOs do not carry it at all.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub username: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub profile_img: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const COLUMNS: &str = "id, firstname, lastname, username, email, phone, password_hash, \
                       profile_img, role, is_active, created_at, updated_at";

pub struct NewUser<'a> {
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub username: Option<&'a str>,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub profile_img: &'a str,
    pub role: Role,
}

/// Field patch for updates. `None` leaves a column untouched; `clear_phone`
/// handles the empty-string-means-unset convention for phone.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub clear_phone: bool,
    pub password_hash: Option<String>,
    pub profile_img: Option<String>,
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn email_taken(db: &PgPool, email: &str, exclude: Option<Uuid>) -> anyhow::Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(db)
    .await?;
    Ok(taken)
}

pub async fn username_taken(
    db: &PgPool,
    username: &str,
    exclude: Option<Uuid>,
) -> anyhow::Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(username)
    .bind(exclude)
    .fetch_one(db)
    .await?;
    Ok(taken)
}

/// Returns the raw sqlx error so the caller can translate a unique-index
/// race into a validation message.
pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (firstname, lastname, username, email, phone, password_hash, profile_img, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(new.firstname)
    .bind(new.lastname)
    .bind(new.username)
    .bind(new.email)
    .bind(new.phone)
    .bind(new.password_hash)
    .bind(new.profile_img)
    .bind(new.role)
    .fetch_one(db)
    .await
}

pub async fn update(db: &PgPool, id: Uuid, patch: UserPatch) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            firstname = COALESCE($2, firstname),
            lastname = COALESCE($3, lastname),
            username = COALESCE($4, username),
            email = COALESCE($5, email),
            phone = CASE WHEN $6 THEN NULL ELSE COALESCE($7, phone) END,
            password_hash = COALESCE($8, password_hash),
            profile_img = COALESCE($9, profile_img),
            updated_at = now()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.firstname)
    .bind(patch.lastname)
    .bind(patch.username)
    .bind(patch.email)
    .bind(patch.clear_phone)
    .bind(patch.phone)
    .bind(patch.password_hash)
    .bind(patch.profile_img)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Uuid>> {
    let deleted: Option<Uuid> = sqlx::query_scalar("DELETE FROM users WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(deleted)
}

pub async fn set_profile_img(db: &PgPool, id: Uuid, img: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET profile_img = $2, updated_at = now() WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(img)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

// ---- admin-scoped queries ----

pub async fn find_admin_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE email = $1 AND role = 'admin'"
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_admin_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE id = $1 AND role = 'admin'"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn list_admins(db: &PgPool) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE role = 'admin' ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn deactivate_admin(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET is_active = FALSE, updated_at = now()
        WHERE id = $1 AND role = 'admin'
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn count_by_role(db: &PgPool, role: Role) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(role)
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Reduced projection for the dashboard's recent-signups panel.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecentCustomer {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn recent_customers(db: &PgPool, limit: i64) -> anyhow::Result<Vec<RecentCustomer>> {
    let rows = sqlx::query_as::<_, RecentCustomer>(
        r#"
        SELECT id, firstname, lastname, email, created_at
        FROM users
        WHERE role = 'customer'
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
