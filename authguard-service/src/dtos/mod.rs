//! Request/response shapes for the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Role;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub actor_id: Uuid,
    pub organization_id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub organization_id: Option<Uuid>,

    #[validate(length(max = 128, message = "Name too long"))]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub actor_id: Uuid,
    pub organization_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PermissionCheckRequest {
    pub actor_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub required_role: Role,
    pub resource_type: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
    pub reason: String,
    pub is_admin: bool,
    pub required_role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevalidateRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub valid: bool,
}
