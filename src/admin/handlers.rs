use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    admin::dto::{
        AdminEnvelope, AdminListResponse, AdminLoginRequest, AdminLoginResponse,
        DashboardResponse, DashboardStats, RegisterAdminRequest, UpdateAdminRequest,
    },
    auth::{
        jwt::{AdminUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    error::{is_unique_violation, ApiError},
    extract::Json,
    state::AppState,
    users::{
        dto::is_valid_email,
        repo::{self, NewUser, Role, UserPatch},
    },
};

const DEFAULT_ADMIN_AVATAR: &str = "default-profile.png";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_admin))
        .route("/login", post(login_admin))
        .route("/", get(list_admins))
        .route("/current", get(current_admin))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/:id", get(get_admin).put(update_admin).delete(delete_admin))
}

#[instrument(skip(state, payload))]
pub async fn register_admin(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAdminRequest>,
) -> Result<(StatusCode, Json<AdminEnvelope>), ApiError> {
    let (Some(firstname), Some(lastname), Some(email), Some(password)) = (
        payload.firstname,
        payload.lastname,
        payload.email,
        payload.password,
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };

    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if repo::email_taken(&state.db, &email, None).await? {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let hash = hash_password(&password)?;
    let profile_img = payload
        .profile_img
        .unwrap_or_else(|| DEFAULT_ADMIN_AVATAR.to_string());

    let admin = repo::create(
        &state.db,
        NewUser {
            firstname: &firstname,
            lastname: &lastname,
            username: None,
            email: &email,
            phone: None,
            password_hash: &hash,
            profile_img: &profile_img,
            role: Role::Admin,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("Email already exists".into())
        } else {
            ApiError::from(e)
        }
    })?;

    info!(admin_id = %admin.id, "admin registered");
    Ok((
        StatusCode::CREATED,
        Json(AdminEnvelope {
            success: true,
            message: Some("Admin created successfully".into()),
            admin: admin.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login_admin(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::validation("Email and password required"));
    };

    let admin = repo::find_admin_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&password, &admin.password_hash)? {
        warn!(admin_id = %admin.id, "admin login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(admin.id, Role::Admin)?;

    info!(admin_id = %admin.id, "admin logged in");
    Ok(Json(AdminLoginResponse {
        success: true,
        message: "Login successful".into(),
        token,
        admin: admin.into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_admins(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<AdminListResponse>, ApiError> {
    let admins = repo::list_admins(&state.db).await?;
    Ok(Json(AdminListResponse {
        success: true,
        count: admins.len(),
        admins: admins.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn current_admin(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
) -> Result<Json<AdminEnvelope>, ApiError> {
    let admin = repo::find_admin_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;
    Ok(Json(AdminEnvelope {
        success: true,
        message: None,
        admin: admin.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_admin(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminEnvelope>, ApiError> {
    let admin = repo::find_admin_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;
    Ok(Json(AdminEnvelope {
        success: true,
        message: None,
        admin: admin.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_admin(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdminRequest>,
) -> Result<Json<AdminEnvelope>, ApiError> {
    // Admins may only edit their own profile.
    if claims.sub != id {
        return Err(ApiError::Forbidden(
            "Access denied. You can only update your own profile.".into(),
        ));
    }

    if let Some(email) = payload.email.as_deref() {
        if repo::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::Conflict("Email already taken".into()));
        }
    }

    let patch = UserPatch {
        firstname: payload.firstname,
        lastname: payload.lastname,
        email: payload.email,
        profile_img: payload.profile_img,
        ..Default::default()
    };

    let admin = repo::update(&state.db, id, patch)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Email already taken".into())
            } else {
                ApiError::from(e)
            }
        })?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    Ok(Json(AdminEnvelope {
        success: true,
        message: Some("Admin profile updated successfully".into()),
        admin: admin.into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_admin(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminEnvelope>, ApiError> {
    if claims.sub == id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    // Soft delete: admins are deactivated, never removed.
    let admin = repo::deactivate_admin(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    info!(admin_id = %id, "admin deactivated");
    Ok(Json(AdminEnvelope {
        success: true,
        message: Some("Admin account deactivated successfully".into()),
        admin: admin.into(),
    }))
}

#[instrument(skip(state))]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let total_users = repo::count_by_role(&state.db, Role::Customer).await?;
    let total_admins = repo::count_by_role(&state.db, Role::Admin).await?;
    let recent_users = repo::recent_customers(&state.db, 5).await?;

    Ok(Json(DashboardResponse {
        success: true,
        stats: DashboardStats {
            total_users,
            total_admins,
            recent_users,
        },
    }))
}
