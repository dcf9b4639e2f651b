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
    error::ApiError,
    extract::Json,
    payment_methods::{
        dto::{
            CreatePaymentMethodRequest, ListPaymentMethodsQuery, OwnerRequest,
            PaymentMethodEnvelope, PaymentMethodResponse,
        },
        repo::{self, NewPaymentMethod},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payment_methods).post(create_payment_method))
        .route("/:id", axum::routing::delete(delete_payment_method))
        .route("/:id/default", patch(set_default_payment_method))
}

#[instrument(skip(state))]
pub async fn list_payment_methods(
    State(state): State<AppState>,
    Query(q): Query<ListPaymentMethodsQuery>,
) -> Result<Json<Vec<PaymentMethodResponse>>, ApiError> {
    let user_id = q.user_id.ok_or_else(|| {
        ApiError::validation("User ID is required in query parameters")
    })?;

    let methods = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(methods.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_payment_method(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentMethodRequest>,
) -> Result<(StatusCode, Json<PaymentMethodResponse>), ApiError> {
    let user_id = payload
        .user
        .ok_or_else(|| ApiError::validation("User ID is required"))?;
    let kind = payload
        .kind
        .ok_or_else(|| ApiError::validation("Payment method type is required"))?;

    let method = repo::create(
        &state.db,
        NewPaymentMethod {
            user_id,
            kind,
            phone_number: payload.phone_number.as_deref(),
            card_holder: payload.card_holder.as_deref(),
            last_four: payload.last_four.as_deref(),
            card_token: payload.card_token.as_deref(),
            expiry: payload.expiry.as_deref(),
            paypal_email: payload.paypal_email.as_deref(),
            make_default: payload.is_default,
        },
    )
    .await?;

    info!(method_id = %method.id, %user_id, "payment method created");
    Ok((StatusCode::CREATED, Json(method.into())))
}

#[instrument(skip(state, payload))]
pub async fn set_default_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OwnerRequest>,
) -> Result<Json<PaymentMethodEnvelope>, ApiError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::validation("User ID is required"))?;

    let method = repo::set_default(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Payment method not found"))?;

    info!(method_id = %id, %user_id, "default payment method set");
    Ok(Json(PaymentMethodEnvelope {
        success: true,
        payment_method: method.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn delete_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OwnerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::validation("User ID is required"))?;

    if !repo::delete(&state.db, id, user_id).await? {
        return Err(ApiError::not_found("Payment method not found"));
    }

    info!(method_id = %id, %user_id, "payment method deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Payment method deleted successfully"
    })))
}
