use serde::{Deserialize, Serialize};

use crate::users::{dto::PublicUser, repo::RecentCustomer};

#[derive(Debug, Deserialize)]
pub struct RegisterAdminRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile_img: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdminRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub profile_img: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub admin: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub admin: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub success: bool,
    pub count: usize,
    pub admins: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_admins: i64,
    pub recent_users: Vec<RecentCustomer>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardStats,
}
