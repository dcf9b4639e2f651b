use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::ApiError,
    extract::Json,
    products::{
        dto::{CreateProductRequest, ProductResponse, UpdateProductRequest},
        repo,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = repo::list(&state.db).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(product.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let data = payload.into_data().map_err(ApiError::Validation)?;
    let product = repo::create(&state.db, data).await?;
    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let data = payload.merge_into(existing).map_err(ApiError::Validation)?;
    let product = repo::update(&state.db, id, data)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(product.into()))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    repo::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    info!(product_id = %id, "product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
