use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserCreate {
    #[validate(length(min = 3, max = 64))]
    pub(crate) username: String,
    #[validate(email)]
    pub(crate) email: String,
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, max = 128))]
    pub(crate) full_name: String,
    #[validate(length(min = 8, max = 128))]
    pub(crate) password: String,
    #[serde(default)]
    #[serde(alias = "registrationNumber")]
    pub(crate) registration_number: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) registration_number: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) created_at: String,
    pub(crate) last_login: Option<String>,
}

impl UserResponse {
    pub(crate) fn from_db(user: crate::db::models::User) -> Self {
        use crate::core::time::format_primitive;
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            registration_number: user.registration_number,
            phone: user.phone,
            created_at: format_primitive(user.created_at),
            last_login: user.last_login.map(format_primitive),
        }
    }
}
