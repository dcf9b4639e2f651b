use std::collections::HashMap;

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::addresses::{dto::AddressResponse, repo::Address};
use crate::orders::repo::{Order, OrderItem, OrderStatus};
use crate::payment_methods::{dto::PaymentMethodResponse, repo::PaymentMethod};
use crate::products::{dto::ProductResponse, repo::Product};
use crate::users::{dto::PublicUser, repo::User};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    pub total_amount: Option<Decimal>,
    pub shipping_address: Option<Uuid>,
    pub payment_details: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product: Uuid,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub total_amount: Option<Decimal>,
    pub shipping_address: Option<Uuid>,
    pub payment_details: Option<Uuid>,
}

/// Unexpanded order, returned from create and update.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: f64,
    pub shipping_address: Uuid,
    pub payment_details: Uuid,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product: Uuid,
    pub quantity: i32,
    pub price_at_purchase: f64,
}

impl OrderResponse {
    pub fn from_parts(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            user: order.user_id,
            items: items
                .into_iter()
                .map(|i| OrderItemResponse {
                    product: i.product_id,
                    quantity: i.quantity,
                    price_at_purchase: i.price_at_purchase.to_f64().unwrap_or(0.0),
                })
                .collect(),
            total_amount: order.total_amount.to_f64().unwrap_or(0.0),
            shipping_address: order.shipping_address,
            payment_details: order.payment_details,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Fully expanded order for list/get. A reference whose target no longer
/// exists expands to null rather than failing the whole response.
#[derive(Debug, Serialize)]
pub struct OrderDetails {
    pub id: Uuid,
    pub user: Option<PublicUser>,
    pub items: Vec<ExpandedItem>,
    pub total_amount: f64,
    pub shipping_address: Option<AddressResponse>,
    pub payment_details: Option<PaymentMethodResponse>,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ExpandedItem {
    pub product: Option<ProductResponse>,
    pub quantity: i32,
    pub price_at_purchase: f64,
}

impl OrderDetails {
    pub fn assemble(
        order: Order,
        items: Vec<OrderItem>,
        users: &HashMap<Uuid, User>,
        products: &HashMap<Uuid, Product>,
        addresses: &HashMap<Uuid, Address>,
        methods: &HashMap<Uuid, PaymentMethod>,
    ) -> Self {
        Self {
            id: order.id,
            user: users.get(&order.user_id).cloned().map(PublicUser::from),
            items: items
                .into_iter()
                .map(|i| ExpandedItem {
                    product: products
                        .get(&i.product_id)
                        .cloned()
                        .map(ProductResponse::from),
                    quantity: i.quantity,
                    price_at_purchase: i.price_at_purchase.to_f64().unwrap_or(0.0),
                })
                .collect(),
            total_amount: order.total_amount.to_f64().unwrap_or(0.0),
            shipping_address: addresses
                .get(&order.shipping_address)
                .cloned()
                .map(AddressResponse::from),
            payment_details: methods
                .get(&order.payment_details)
                .cloned()
                .map(PaymentMethodResponse::from),
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Reduced projection for the per-user listing.
#[derive(Debug, Serialize)]
pub struct UserBrief {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ProductBrief {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub product_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserOrderSummary {
    pub id: Uuid,
    pub user: Option<UserBrief>,
    pub items: Vec<UserOrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct UserOrderItem {
    pub product: Option<ProductBrief>,
    pub quantity: i32,
    pub price_at_purchase: f64,
}

impl UserOrderSummary {
    pub fn assemble(
        order: Order,
        items: Vec<OrderItem>,
        users: &HashMap<Uuid, User>,
        products: &HashMap<Uuid, Product>,
    ) -> Self {
        Self {
            id: order.id,
            user: users.get(&order.user_id).map(|u| UserBrief {
                id: u.id,
                firstname: u.firstname.clone(),
                lastname: u.lastname.clone(),
                email: u.email.clone(),
            }),
            items: items
                .into_iter()
                .map(|i| UserOrderItem {
                    product: products.get(&i.product_id).map(|p| ProductBrief {
                        id: p.id,
                        name: p.name.clone(),
                        price: p.price.to_f64().unwrap_or(0.0),
                        product_image_url: p.product_image_url.clone(),
                    }),
                    quantity: i.quantity,
                    price_at_purchase: i.price_at_purchase.to_f64().unwrap_or(0.0),
                })
                .collect(),
            total_amount: order.total_amount.to_f64().unwrap_or(0.0),
            status: order.status,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addresses::repo::AddressKind;
    use crate::payment_methods::repo::PaymentKind;
    use crate::products::repo::Category;
    use crate::users::repo::Role;
    use std::str::FromStr;

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sample_order(user_id: Uuid, address_id: Uuid, method_id: Uuid) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id,
            total_amount: Decimal::from_str("59.97").unwrap(),
            shipping_address: address_id,
            payment_details: method_id,
            status: OrderStatus::Pending,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn sample_item(order_id: Uuid, product_id: Uuid) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity: 3,
            price_at_purchase: Decimal::from_str("19.99").unwrap(),
        }
    }

    fn sample_user(id: Uuid) -> User {
        User {
            id,
            firstname: "Atieno".into(),
            lastname: "Odhiambo".into(),
            username: Some("atieno".into()),
            email: "atieno@example.com".into(),
            phone: None,
            password_hash: "$argon2id$hash".into(),
            profile_img: "default-avatar.png".into(),
            role: Role::Customer,
            is_active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn sample_product(id: Uuid) -> Product {
        Product {
            id,
            name: "Safari Boot Mark II".into(),
            description: "Rugged leather boot built for long days on rough terrain.".into(),
            price: Decimal::from_str("19.99").unwrap(),
            discount_percentage: 0,
            brand: "Bata".into(),
            category: Category::Shoes,
            qty: 10,
            product_image_url: None,
            rating: Decimal::ZERO,
            features: vec![],
            specifications: serde_json::json!({}),
            color: vec![],
            warranty: serde_json::json!({}),
            deal_tag: None,
            is_new: false,
            date_created: now(),
        }
    }

    fn sample_address(id: Uuid, user_id: Uuid) -> Address {
        Address {
            id,
            user_id,
            address_line_1: "Moi Avenue 12".into(),
            address_line_2: None,
            city: "Nairobi".into(),
            state_region: None,
            postal_code: "00100".into(),
            country: "Kenya".into(),
            kind: AddressKind::Home,
            is_default: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn sample_method(id: Uuid, user_id: Uuid) -> PaymentMethod {
        PaymentMethod {
            id,
            user_id,
            kind: PaymentKind::Mpesa,
            phone_number: Some("+254700000000".into()),
            card_holder: None,
            last_four: None,
            card_token: None,
            expiry: None,
            paypal_email: None,
            is_default: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn assemble_expands_all_references() {
        let (user_id, product_id, address_id, method_id) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let order = sample_order(user_id, address_id, method_id);
        let items = vec![sample_item(order.id, product_id)];

        let users = HashMap::from([(user_id, sample_user(user_id))]);
        let products = HashMap::from([(product_id, sample_product(product_id))]);
        let addresses = HashMap::from([(address_id, sample_address(address_id, user_id))]);
        let methods = HashMap::from([(method_id, sample_method(method_id, user_id))]);

        let details = OrderDetails::assemble(order, items, &users, &products, &addresses, &methods);
        let json = serde_json::to_value(&details).unwrap();

        // Embedded objects, not bare identifiers.
        assert_eq!(json["user"]["email"], serde_json::json!("atieno@example.com"));
        assert_eq!(
            json["items"][0]["product"]["name"],
            serde_json::json!("Safari Boot Mark II")
        );
        assert_eq!(json["shipping_address"]["city"], serde_json::json!("Nairobi"));
        assert_eq!(json["payment_details"]["type"], serde_json::json!("mpesa"));
        // Decimals render as plain numbers.
        assert_eq!(json["total_amount"], serde_json::json!(59.97));
        assert_eq!(
            json["items"][0]["price_at_purchase"],
            serde_json::json!(19.99)
        );
    }

    #[test]
    fn assemble_turns_dangling_references_into_null() {
        let order = sample_order(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let items = vec![sample_item(order.id, Uuid::new_v4())];

        let details = OrderDetails::assemble(
            order,
            items,
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
        );
        let json = serde_json::to_value(&details).unwrap();

        assert!(json["user"].is_null());
        assert!(json["items"][0]["product"].is_null());
        assert!(json["shipping_address"].is_null());
        assert!(json["payment_details"].is_null());
    }

    #[test]
    fn user_summary_projects_reduced_fields() {
        let (user_id, product_id) = (Uuid::new_v4(), Uuid::new_v4());
        let order = sample_order(user_id, Uuid::new_v4(), Uuid::new_v4());
        let items = vec![sample_item(order.id, product_id)];
        let users = HashMap::from([(user_id, sample_user(user_id))]);
        let products = HashMap::from([(product_id, sample_product(product_id))]);

        let summary = UserOrderSummary::assemble(order, items, &users, &products);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["user"]["firstname"], serde_json::json!("Atieno"));
        assert!(json["user"].get("profile_img").is_none());
        assert_eq!(json["items"][0]["product"]["price"], serde_json::json!(19.99));
        assert!(json["items"][0]["product"].get("description").is_none());
    }

    #[test]
    fn status_defaults_to_pending_when_absent() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "user": Uuid::new_v4(),
            "items": [],
            "total_amount": "0.00",
            "shipping_address": Uuid::new_v4(),
            "payment_details": Uuid::new_v4()
        }))
        .unwrap();
        assert!(req.status.is_none());
        assert_eq!(req.status.unwrap_or(OrderStatus::Pending), OrderStatus::Pending);
    }
}
