use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::payment_methods::repo::{PaymentKind, PaymentMethod};

#[derive(Debug, Deserialize)]
pub struct ListPaymentMethodsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentMethodRequest {
    pub user: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<PaymentKind>,
    pub phone_number: Option<String>,
    pub card_holder: Option<String>,
    pub last_four: Option<String>,
    pub card_token: Option<String>,
    pub expiry: Option<String>,
    pub paypal_email: Option<String>,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct OwnerRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodResponse {
    pub id: Uuid,
    pub user: Uuid,
    #[serde(rename = "type")]
    pub kind: PaymentKind,
    pub phone_number: Option<String>,
    pub card_holder: Option<String>,
    pub last_four: Option<String>,
    pub card_token: Option<String>,
    pub expiry: Option<String>,
    pub paypal_email: Option<String>,
    #[serde(rename = "isDefault")]
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<PaymentMethod> for PaymentMethodResponse {
    fn from(m: PaymentMethod) -> Self {
        Self {
            id: m.id,
            user: m.user_id,
            kind: m.kind,
            phone_number: m.phone_number,
            card_holder: m.card_holder,
            last_four: m.last_four,
            card_token: m.card_token,
            expiry: m.expiry,
            paypal_email: m.paypal_email,
            is_default: m.is_default,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodEnvelope {
    pub success: bool,
    pub payment_method: PaymentMethodResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_lowercase_wire_values() {
        for (wire, kind) in [
            ("mpesa", PaymentKind::Mpesa),
            ("card", PaymentKind::Card),
            ("paypal", PaymentKind::Paypal),
        ] {
            let parsed: PaymentKind = serde_json::from_str(&format!("\"{wire}\"")).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn is_default_defaults_to_false() {
        let req: CreatePaymentMethodRequest = serde_json::from_value(serde_json::json!({
            "user": Uuid::new_v4(),
            "type": "mpesa",
            "phone_number": "+254700000000"
        }))
        .unwrap();
        assert!(!req.is_default);
    }
}
