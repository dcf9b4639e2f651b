use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    addresses::{
        dto::{
            AddressEnvelope, AddressListResponse, CreateAddressRequest, ListAddressesQuery,
            OwnerRequest, UpdateAddressRequest,
        },
        repo::{self, AddressKind, AddressPatch, NewAddress},
    },
    error::ApiError,
    extract::Json,
    state::AppState,
};

const DEFAULT_COUNTRY: &str = "Kenya";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/:id", patch(update_address).delete(delete_address))
        .route("/:id/default", patch(set_default_address))
}

#[instrument(skip(state))]
pub async fn list_addresses(
    State(state): State<AppState>,
    Query(q): Query<ListAddressesQuery>,
) -> Result<Json<AddressListResponse>, ApiError> {
    let user_id = q.user_id.ok_or_else(|| {
        ApiError::validation("User ID is required in query parameters")
    })?;

    let addresses = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(AddressListResponse {
        success: true,
        addresses: addresses.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_address(
    State(state): State<AppState>,
    Json(payload): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<AddressEnvelope>), ApiError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::validation("User ID is required"))?;
    let (Some(address_line_1), Some(city), Some(postal_code)) =
        (payload.address_line_1, payload.city, payload.postal_code)
    else {
        return Err(ApiError::validation(
            "Address line 1, city, and postal code are required",
        ));
    };

    let address = repo::create(
        &state.db,
        NewAddress {
            user_id,
            address_line_1: &address_line_1,
            address_line_2: payload.address_line_2.as_deref(),
            city: &city,
            state_region: payload.state_region.as_deref(),
            postal_code: &postal_code,
            country: payload.country.as_deref().unwrap_or(DEFAULT_COUNTRY),
            kind: payload.kind.unwrap_or(AddressKind::Home),
        },
    )
    .await?;

    info!(address_id = %address.id, %user_id, "address created");
    Ok((
        StatusCode::CREATED,
        Json(AddressEnvelope {
            success: true,
            address: address.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAddressRequest>,
) -> Result<Json<AddressEnvelope>, ApiError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::validation("User ID is required"))?;

    let patch = AddressPatch {
        address_line_1: payload.address_line_1,
        address_line_2: payload.address_line_2,
        city: payload.city,
        state_region: payload.state_region,
        postal_code: payload.postal_code,
        country: payload.country,
        kind: payload.kind,
    };

    let address = repo::update(&state.db, id, user_id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Address not found"))?;

    Ok(Json(AddressEnvelope {
        success: true,
        address: address.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn set_default_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OwnerRequest>,
) -> Result<Json<AddressEnvelope>, ApiError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::validation("User ID is required"))?;

    let address = repo::set_default(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Address not found"))?;

    info!(address_id = %id, %user_id, "default address set");
    Ok(Json(AddressEnvelope {
        success: true,
        address: address.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn delete_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OwnerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::validation("User ID is required"))?;

    if !repo::delete(&state.db, id, user_id).await? {
        return Err(ApiError::not_found("Address not found"));
    }

    info!(address_id = %id, %user_id, "address deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Address deleted successfully"
    })))
}
