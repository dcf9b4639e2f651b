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
    orders::{
        dto::{
            CreateOrderRequest, OrderDetails, OrderResponse, UpdateOrderRequest, UserOrderSummary,
        },
        repo::{self, NewOrder, NewOrderItem, Order, OrderPatch, OrderStatus},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
        .route("/user/:user_id", get(list_user_orders))
}

#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    let orders = repo::list(&state.db).await?;
    Ok(Json(expand_orders(&state, orders).await?))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    let mut expanded = expand_orders(&state, vec![order]).await?;
    Ok(Json(expanded.remove(0)))
}

#[instrument(skip(state))]
pub async fn list_user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserOrderSummary>>, ApiError> {
    let orders = repo::list_by_user(&state.db, user_id).await?;
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items = repo::items_for_orders(&state.db, &order_ids).await?;

    let user_ids: Vec<Uuid> = vec![user_id];
    let product_ids: Vec<Uuid> = items
        .values()
        .flatten()
        .map(|i| i.product_id)
        .collect();

    let users = repo::users_by_ids(&state.db, &user_ids).await?;
    let products = repo::products_by_ids(&state.db, &product_ids).await?;

    let summaries = orders
        .into_iter()
        .map(|order| {
            let order_items = items.remove(&order.id).unwrap_or_default();
            UserOrderSummary::assemble(order, order_items, &users, &products)
        })
        .collect();
    Ok(Json(summaries))
}

/// The order payload is stored verbatim: items, per-item prices and the
/// total come from the caller and are not reconciled against current
/// product pricing or stock. See DESIGN.md before tightening that.
#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = payload
        .user
        .ok_or_else(|| ApiError::validation("user is required"))?;
    let total_amount = payload
        .total_amount
        .ok_or_else(|| ApiError::validation("total_amount is required"))?;
    let shipping_address = payload
        .shipping_address
        .ok_or_else(|| ApiError::validation("shipping_address is required"))?;
    let payment_details = payload
        .payment_details
        .ok_or_else(|| ApiError::validation("payment_details is required"))?;

    let (order, items) = repo::create(
        &state.db,
        NewOrder {
            user_id,
            total_amount,
            shipping_address,
            payment_details,
            status: payload.status.unwrap_or(OrderStatus::Pending),
            items: payload
                .items
                .into_iter()
                .map(|i| NewOrderItem {
                    product_id: i.product,
                    quantity: i.quantity,
                    price_at_purchase: i.price_at_purchase,
                })
                .collect(),
        },
    )
    .await?;

    info!(order_id = %order.id, %user_id, "order created");
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::from_parts(order, items)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let patch = OrderPatch {
        status: payload.status,
        total_amount: payload.total_amount,
        shipping_address: payload.shipping_address,
        payment_details: payload.payment_details,
    };

    let order = repo::update(&state.db, id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    let mut items = repo::items_for_orders(&state.db, &[order.id]).await?;
    let order_items = items.remove(&order.id).unwrap_or_default();
    Ok(Json(OrderResponse::from_parts(order, order_items)))
}

#[instrument(skip(state))]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    repo::delete(&state.db, id).await?;
    info!(order_id = %id, "order deleted");
    Ok(Json(json!({ "message": "Order deleted" })))
}

async fn expand_orders(
    state: &AppState,
    orders: Vec<Order>,
) -> Result<Vec<OrderDetails>, ApiError> {
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items = repo::items_for_orders(&state.db, &order_ids).await?;

    let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
    let address_ids: Vec<Uuid> = orders.iter().map(|o| o.shipping_address).collect();
    let method_ids: Vec<Uuid> = orders.iter().map(|o| o.payment_details).collect();
    let product_ids: Vec<Uuid> = items
        .values()
        .flatten()
        .map(|i| i.product_id)
        .collect();

    let users = repo::users_by_ids(&state.db, &user_ids).await?;
    let products = repo::products_by_ids(&state.db, &product_ids).await?;
    let addresses = repo::addresses_by_ids(&state.db, &address_ids).await?;
    let methods = repo::payment_methods_by_ids(&state.db, &method_ids).await?;

    Ok(orders
        .into_iter()
        .map(|order| {
            let order_items = items.remove(&order.id).unwrap_or_default();
            OrderDetails::assemble(order, order_items, &users, &products, &addresses, &methods)
        })
        .collect())
}
