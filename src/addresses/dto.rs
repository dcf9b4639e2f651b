use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::addresses::repo::{Address, AddressKind};

#[derive(Debug, Deserialize)]
pub struct ListAddressesQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAddressRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AddressKind>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAddressRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AddressKind>,
}

/// Body carrying only the owner, used by set-default and delete.
#[derive(Debug, Deserialize)]
pub struct OwnerRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state_region: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(rename = "type")]
    pub kind: AddressKind,
    #[serde(rename = "isDefault")]
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        Self {
            id: a.id,
            user: a.user_id,
            address_line_1: a.address_line_1,
            address_line_2: a.address_line_2,
            city: a.city,
            state_region: a.state_region,
            postal_code: a.postal_code,
            country: a.country,
            kind: a.kind,
            is_default: a.is_default,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddressListResponse {
    pub success: bool,
    pub addresses: Vec<AddressResponse>,
}

#[derive(Debug, Serialize)]
pub struct AddressEnvelope {
    pub success: bool,
    pub address: AddressResponse,
}
