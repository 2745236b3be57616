use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i32,
    pub user_id: i32,
    pub firstname: String,
    pub lastname: String,
    pub role: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public account shape: user row joined with its profile, password hash never
/// included.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub role: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_parts(user: &User, profile: &Profile) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            firstname: profile.firstname.clone(),
            lastname: profile.lastname.clone(),
            role: profile.role.clone(),
            avatar: profile.avatar.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session: SessionToken,
    pub user: UserResponse,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: i32,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Wire error envelope: `{"error": "..."}`, with per-field details for form
/// validation failures.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            error: message.into(),
            details: Some(details),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> i32 {
        self.sub.parse().unwrap_or(0)
    }
}
