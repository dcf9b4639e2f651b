use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::addresses::repo::Address;
use crate::payment_methods::repo::PaymentMethod;
use crate::products::repo::Product;
use crate::users::repo::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "PascalCase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub shipping_address: Uuid,
    pub payment_details: Uuid,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

pub struct NewOrder {
    pub user_id: Uuid,
    pub total_amount: Decimal,
    pub shipping_address: Uuid,
    pub payment_details: Uuid,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub total_amount: Option<Decimal>,
    pub shipping_address: Option<Uuid>,
    pub payment_details: Option<Uuid>,
}

const ORDER_COLUMNS: &str =
    "id, user_id, total_amount, shipping_address, payment_details, status, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_at_purchase";

/// Order header and items are written in one transaction. Totals and
/// per-item prices come from the caller untouched; see the module docs for
/// the trust boundary this implies.
pub async fn create(db: &PgPool, new: NewOrder) -> anyhow::Result<(Order, Vec<OrderItem>)> {
    let mut tx = db.begin().await?;

    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        INSERT INTO orders (user_id, total_amount, shipping_address, payment_details, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.total_amount)
    .bind(new.shipping_address)
    .bind(new.payment_details)
    .bind(new.status)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(new.items.len());
    for item in new.items {
        let row = sqlx::query_as::<_, OrderItem>(&format!(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price_at_purchase)
        .fetch_one(&mut *tx)
        .await?;
        items.push(row);
    }

    tx.commit().await?;
    Ok((order, items))
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(order)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Items for a set of orders, grouped by order id.
pub async fn items_for_orders(
    db: &PgPool,
    order_ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, Vec<OrderItem>>> {
    let rows = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1)"
    ))
    .bind(order_ids)
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row);
    }
    Ok(grouped)
}

pub async fn update(db: &PgPool, id: Uuid, patch: OrderPatch) -> anyhow::Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders SET
            status = COALESCE($2, status),
            total_amount = COALESCE($3, total_amount),
            shipping_address = COALESCE($4, shipping_address),
            payment_details = COALESCE($5, payment_details),
            updated_at = now()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.status)
    .bind(patch.total_amount)
    .bind(patch.shipping_address)
    .bind(patch.payment_details)
    .fetch_optional(db)
    .await?;
    Ok(order)
}

/// Unconditional delete; items cascade.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

// ---- batch lookups for response expansion ----

pub async fn users_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, User>> {
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT id, firstname, lastname, username, email, phone, password_hash,
               profile_img, role, is_active, created_at, updated_at
        FROM users WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|u| (u.id, u)).collect())
}

pub async fn products_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Product>> {
    let rows = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, description, price, discount_percentage, brand, category, qty,
               product_image_url, rating, features, specifications, color, warranty,
               deal_tag, is_new, date_created
        FROM products WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|p| (p.id, p)).collect())
}

pub async fn addresses_by_ids(
    db: &PgPool,
    ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, Address>> {
    let rows = sqlx::query_as::<_, Address>(
        r#"
        SELECT id, user_id, address_line_1, address_line_2, city, state_region,
               postal_code, country, kind, is_default, created_at, updated_at
        FROM addresses WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|a| (a.id, a)).collect())
}

pub async fn payment_methods_by_ids(
    db: &PgPool,
    ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, PaymentMethod>> {
    let rows = sqlx::query_as::<_, PaymentMethod>(
        r#"
        SELECT id, user_id, kind, phone_number, card_holder, last_four, card_token,
               expiry, paypal_email, is_default, created_at, updated_at
        FROM payment_methods WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|m| (m.id, m)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_order(items: Vec<NewOrderItem>) -> NewOrder {
        NewOrder {
            user_id: Uuid::new_v4(),
            total_amount: Decimal::from_str("59.97").unwrap(),
            shipping_address: Uuid::new_v4(),
            payment_details: Uuid::new_v4(),
            status: OrderStatus::Pending,
            items,
        }
    }

    #[sqlx::test]
    async fn create_stores_header_and_items_together(db: PgPool) {
        let new = sample_order(vec![
            NewOrderItem {
                product_id: Uuid::new_v4(),
                quantity: 2,
                price_at_purchase: Decimal::from_str("19.99").unwrap(),
            },
            NewOrderItem {
                product_id: Uuid::new_v4(),
                quantity: 1,
                price_at_purchase: Decimal::from_str("19.99").unwrap(),
            },
        ]);

        let (order, items) = create(&db, new).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(order.total_amount, Decimal::from_str("59.97").unwrap());

        let grouped = items_for_orders(&db, &[order.id]).await.unwrap();
        assert_eq!(grouped[&order.id].len(), 2);
    }

    #[sqlx::test]
    async fn create_accepts_an_empty_item_list(db: PgPool) {
        let (order, items) = create(&db, sample_order(vec![])).await.unwrap();
        assert!(items.is_empty());

        let stored = find_by_id(&db, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }
}
