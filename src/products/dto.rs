use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo::{Category, DealTag, Product, ProductData};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub discount_percentage: i32,
    pub brand: Option<String>,
    pub category: Option<Category>,
    #[serde(default)]
    pub qty: i32,
    pub product_image_url: Option<String>,
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "empty_map")]
    pub specifications: serde_json::Value,
    #[serde(default)]
    pub color: Vec<String>,
    #[serde(default = "empty_map")]
    pub warranty: serde_json::Value,
    pub deal_tag: Option<DealTag>,
    #[serde(default)]
    pub is_new: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub discount_percentage: Option<i32>,
    pub brand: Option<String>,
    pub category: Option<Category>,
    pub qty: Option<i32>,
    pub product_image_url: Option<String>,
    pub rating: Option<Decimal>,
    pub features: Option<Vec<String>>,
    pub specifications: Option<serde_json::Value>,
    pub color: Option<Vec<String>>,
    pub warranty: Option<serde_json::Value>,
    pub deal_tag: Option<DealTag>,
    pub is_new: Option<bool>,
}

fn empty_map() -> serde_json::Value {
    serde_json::json!({})
}

impl CreateProductRequest {
    /// Resolves required fields and applies the schema's constraints.
    pub fn into_data(self) -> Result<ProductData, String> {
        let name = self.name.ok_or("name is required")?;
        let description = self.description.ok_or("description is required")?;
        let price = self.price.ok_or("price is required")?;
        let brand = self.brand.ok_or("brand is required")?;
        let category = self.category.ok_or("category is required")?;

        let data = ProductData {
            name,
            description,
            price,
            discount_percentage: self.discount_percentage,
            brand,
            category,
            qty: self.qty,
            product_image_url: self.product_image_url,
            rating: self.rating,
            features: self.features,
            specifications: self.specifications,
            color: self.color,
            warranty: self.warranty,
            deal_tag: self.deal_tag,
            is_new: self.is_new,
        };
        validate(&data)?;
        Ok(data)
    }
}

impl UpdateProductRequest {
    /// Merges the patch over the stored record and re-validates the result.
    pub fn merge_into(self, existing: Product) -> Result<ProductData, String> {
        let data = ProductData {
            name: self.name.unwrap_or(existing.name),
            description: self.description.unwrap_or(existing.description),
            price: self.price.unwrap_or(existing.price),
            discount_percentage: self
                .discount_percentage
                .unwrap_or(existing.discount_percentage),
            brand: self.brand.unwrap_or(existing.brand),
            category: self.category.unwrap_or(existing.category),
            qty: self.qty.unwrap_or(existing.qty),
            product_image_url: self.product_image_url.or(existing.product_image_url),
            rating: self.rating.unwrap_or(existing.rating),
            features: self.features.unwrap_or(existing.features),
            specifications: self.specifications.unwrap_or(existing.specifications),
            color: self.color.unwrap_or(existing.color),
            warranty: self.warranty.unwrap_or(existing.warranty),
            deal_tag: self.deal_tag.or(existing.deal_tag),
            is_new: self.is_new.unwrap_or(existing.is_new),
        };
        validate(&data)?;
        Ok(data)
    }
}

// Limits are in characters, not bytes.
fn validate(data: &ProductData) -> Result<(), String> {
    if !(10..=256).contains(&data.name.chars().count()) {
        return Err("name must be between 10 and 256 characters".into());
    }
    if !(30..=256).contains(&data.description.chars().count()) {
        return Err("description must be between 30 and 256 characters".into());
    }
    if !(1..=100).contains(&data.brand.chars().count()) {
        return Err("brand must be between 1 and 100 characters".into());
    }
    if !(0..=100).contains(&data.discount_percentage) {
        return Err("discount_percentage must be between 0 and 100".into());
    }
    if data.price < Decimal::ZERO {
        return Err("price must not be negative".into());
    }
    if data.rating < Decimal::ZERO || data.rating > Decimal::from(5) {
        return Err("rating must be between 0 and 5".into());
    }
    if let Some(url) = &data.product_image_url {
        if url.chars().count() > 256 {
            return Err("product_image_url must be at most 256 characters".into());
        }
    }
    Ok(())
}

/// Product as returned to callers: decimal columns rendered as plain numbers.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub discount_percentage: i32,
    pub brand: String,
    pub category: Category,
    pub qty: i32,
    pub product_image_url: Option<String>,
    pub rating: f64,
    pub features: Vec<String>,
    pub specifications: serde_json::Value,
    pub color: Vec<String>,
    pub warranty: serde_json::Value,
    pub deal_tag: Option<DealTag>,
    pub is_new: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price.to_f64().unwrap_or(0.0),
            discount_percentage: p.discount_percentage,
            brand: p.brand,
            category: p.category,
            qty: p.qty,
            product_image_url: p.product_image_url,
            rating: p.rating.to_f64().unwrap_or(0.0),
            features: p.features,
            specifications: p.specifications,
            color: p.color,
            warranty: p.warranty,
            deal_tag: p.deal_tag,
            is_new: p.is_new,
            date_created: p.date_created,
        }
    }
}
