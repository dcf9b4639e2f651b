use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::password::{hash_password, verify_password},
    error::{is_unique_violation, ApiError},
    extract::Json,
    state::AppState,
    users::{
        dto::{
            is_valid_email, CreateUserRequest, DeleteUserResponse, LoginRequest, LoginResponse,
            ProfileImageResponse, PublicUser, UpdateUserRequest, UpdateUserResponse,
        },
        repo::{self, NewUser, Role, UserPatch, DEFAULT_AVATAR},
    },
};

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/login", post(login_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route(
            "/:id/image",
            post(upload_profile_image)
                .delete(remove_profile_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = repo::list(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let (Some(email), Some(password), Some(firstname), Some(lastname), Some(username)) = (
        payload.email,
        payload.password,
        payload.firstname,
        payload.lastname,
        payload.username,
    ) else {
        return Err(ApiError::validation(
            "All required fields must be provided",
        ));
    };

    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if repo::email_taken(&state.db, &email, None).await? {
        warn!(%email, "email already registered");
        return Err(ApiError::validation("User with this email already exists"));
    }
    if repo::username_taken(&state.db, &username, None).await? {
        warn!(%username, "username already taken");
        return Err(ApiError::validation("Username already taken"));
    }

    let hash = hash_password(&password)?;
    let phone = payload.phone.filter(|p| !p.is_empty());
    let profile_img = payload
        .profile_img
        .unwrap_or_else(|| DEFAULT_AVATAR.to_string());

    let user = repo::create(
        &state.db,
        NewUser {
            firstname: &firstname,
            lastname: &lastname,
            username: Some(&username),
            email: &email,
            phone: phone.as_deref(),
            password_hash: &hash,
            profile_img: &profile_img,
            role: Role::Customer,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::validation("Username or email already exists")
        } else {
            e.into()
        }
    })?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // Not-found and wrong-password deliberately share one message.
    let user = repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::validation("Invalid email or password"))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::validation("Invalid email or password"));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>, ApiError> {
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(username) = payload.username.as_deref() {
        if existing.username.as_deref() != Some(username)
            && repo::username_taken(&state.db, username, Some(id)).await?
        {
            return Err(ApiError::validation("Username already taken"));
        }
    }
    if let Some(email) = payload.email.as_deref() {
        if email != existing.email && repo::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::validation("Email already taken"));
        }
    }

    let password_hash = match payload.password.as_deref() {
        Some(p) => Some(hash_password(p)?),
        None => None,
    };
    // Empty-string phone means "unset".
    let clear_phone = payload.phone.as_deref() == Some("");

    let patch = UserPatch {
        firstname: payload.firstname,
        lastname: payload.lastname,
        username: payload.username,
        email: payload.email,
        phone: payload.phone.filter(|p| !p.is_empty()),
        clear_phone,
        password_hash,
        profile_img: payload.profile_img,
    };

    let user = repo::update(&state.db, id, patch)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::validation("Username or email already exists")
            } else {
                ApiError::from(e)
            }
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UpdateUserResponse {
        message: "Profile updated successfully".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    let deleted = repo::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %deleted, "user deleted");
    Ok(Json(DeleteUserResponse {
        message: "User account deleted successfully".into(),
        deleted_user_id: deleted,
    }))
}

#[instrument(skip(state, mp))]
pub async fn upload_profile_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<ProfileImageResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut upload: Option<(bytes::Bytes, String)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("profile_img") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(e.to_string()))?;
            upload = Some((data, content_type));
            break;
        }
    }

    let Some((data, content_type)) = upload else {
        return Err(ApiError::validation("No image file provided"));
    };
    if !content_type.starts_with("image/") {
        return Err(ApiError::validation("Only image files are allowed"));
    }

    let ext = ext_from_mime(&content_type).unwrap_or("bin");
    let key = format!("profiles/{}-{}.{}", user.id, Uuid::new_v4(), ext);
    state.storage.put_object(&key, data, &content_type).await?;

    let updated = repo::set_profile_img(&state.db, id, &key)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %id, %key, "profile image uploaded");
    Ok(Json(ProfileImageResponse {
        message: "Profile image uploaded successfully".into(),
        profile_img: key,
        user: updated.into(),
    }))
}

#[instrument(skip(state))]
pub async fn remove_profile_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileImageResponse>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Uploaded objects live under profiles/; the stock avatar has no object.
    if user.profile_img.starts_with("profiles/") {
        if let Err(e) = state.storage.delete_object(&user.profile_img).await {
            warn!(error = %e, key = %user.profile_img, "delete old profile image failed");
        }
    }

    let updated = repo::set_profile_img(&state.db, id, DEFAULT_AVATAR)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileImageResponse {
        message: "Profile image removed successfully".into(),
        profile_img: DEFAULT_AVATAR.into(),
        user: updated.into(),
    }))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
