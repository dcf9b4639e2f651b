use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_category", rename_all = "PascalCase")]
pub enum Category {
    Shoes,
    Clothes,
    Food,
    Electronics,
    Accessories,
    Furniture,
    Home,
    #[sqlx(rename = "Sports & Outdoors")]
    #[serde(rename = "Sports & Outdoors")]
    SportsOutdoors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "deal_tag", rename_all = "PascalCase")]
pub enum DealTag {
    Flash,
    Clearance,
    Deal,
    Bundle,
}

/// Product record. Price and rating stay `Decimal` here; they become plain
/// JSON numbers only in the response DTO.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_percentage: i32,
    pub brand: String,
    pub category: Category,
    pub qty: i32,
    pub product_image_url: Option<String>,
    pub rating: Decimal,
    pub features: Vec<String>,
    pub specifications: serde_json::Value,
    pub color: Vec<String>,
    pub warranty: serde_json::Value,
    pub deal_tag: Option<DealTag>,
    pub is_new: bool,
    pub date_created: OffsetDateTime,
}

/// All writable fields; used for create and for update (merged over the
/// stored record, then re-validated).
#[derive(Debug, Clone)]
pub struct ProductData {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_percentage: i32,
    pub brand: String,
    pub category: Category,
    pub qty: i32,
    pub product_image_url: Option<String>,
    pub rating: Decimal,
    pub features: Vec<String>,
    pub specifications: serde_json::Value,
    pub color: Vec<String>,
    pub warranty: serde_json::Value,
    pub deal_tag: Option<DealTag>,
    pub is_new: bool,
}

const COLUMNS: &str = "id, name, description, price, discount_percentage, brand, category, qty, \
                       product_image_url, rating, features, specifications, color, warranty, \
                       deal_tag, is_new, date_created";

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products ORDER BY date_created DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let product =
        sqlx::query_as::<_, Product>(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(product)
}

pub async fn create(db: &PgPool, data: ProductData) -> anyhow::Result<Product> {
    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products
            (name, description, price, discount_percentage, brand, category, qty,
             product_image_url, rating, features, specifications, color, warranty,
             deal_tag, is_new)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.discount_percentage)
    .bind(data.brand)
    .bind(data.category)
    .bind(data.qty)
    .bind(data.product_image_url)
    .bind(data.rating)
    .bind(data.features)
    .bind(data.specifications)
    .bind(data.color)
    .bind(data.warranty)
    .bind(data.deal_tag)
    .bind(data.is_new)
    .fetch_one(db)
    .await?;
    Ok(product)
}

pub async fn update(db: &PgPool, id: Uuid, data: ProductData) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products SET
            name = $2, description = $3, price = $4, discount_percentage = $5,
            brand = $6, category = $7, qty = $8, product_image_url = $9, rating = $10,
            features = $11, specifications = $12, color = $13, warranty = $14,
            deal_tag = $15, is_new = $16
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.discount_percentage)
    .bind(data.brand)
    .bind(data.category)
    .bind(data.qty)
    .bind(data.product_image_url)
    .bind(data.rating)
    .bind(data.features)
    .bind(data.specifications)
    .bind(data.color)
    .bind(data.warranty)
    .bind(data.deal_tag)
    .bind(data.is_new)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Uuid>> {
    let deleted: Option<Uuid> =
        sqlx::query_scalar("DELETE FROM products WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(deleted)
}
