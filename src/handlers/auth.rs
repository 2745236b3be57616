use crate::handlers::internal_error;
use crate::middleware::rate_limit::strict_rate_limit_middleware;
use crate::models::auth::*;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post, Router},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify", get(verify_token))
        .layer(axum::middleware::from_fn(strict_rate_limit_middleware))
}

fn validate_signup(payload: &SignupRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        errors.push(FieldError {
            field: "email".to_string(),
            message: "A valid email address is required".to_string(),
        });
    }
    if payload.password.len() < 6 {
        errors.push(FieldError {
            field: "password".to_string(),
            message: "Password must be at least 6 characters long".to_string(),
        });
    }
    errors
}

async fn signup(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), (StatusCode, Json<ApiError>)> {
    let errors = validate_signup(&payload);
    if !errors.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_details("Validation failed", errors)),
        ));
    }

    let existing = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error checking existing user: {}", e);
            internal_error()
        })?;

    if existing.is_some() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("A user with this email already exists")),
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Error hashing password: {}", e);
        internal_error()
    })?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, is_active, is_superuser, created_at, updated_at)
         VALUES ($1, $2, true, false, NOW(), NOW())
         RETURNING id, email, password_hash, is_active, is_superuser, created_at, updated_at",
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error creating user: {}", e);
        internal_error()
    })?;

    let role = payload.role.as_deref().unwrap_or("user");
    let profile = sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (user_id, firstname, lastname, role, avatar, created_at)
         VALUES ($1, $2, $3, $4, $5, NOW())
         RETURNING id, user_id, firstname, lastname, role, avatar, created_at",
    )
    .bind(user.id)
    .bind(&payload.firstname)
    .bind(&payload.lastname)
    .bind(role)
    .bind(&payload.avatar)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error creating profile for user {}: {}", user.id, e);
        internal_error()
    })?;

    tracing::info!("Registered new user {} ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
            user: UserResponse::from_parts(&user, &profile),
        }),
    ))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ApiError>)> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Email and password are required")),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, is_active, is_superuser, created_at, updated_at
         FROM users WHERE email = $1 AND is_active = true",
    )
    .bind(&payload.email)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error finding user: {}", e);
        internal_error()
    })?
    .ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("Invalid email or password")),
        )
    })?;

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Invalid email or password")),
            ));
        }
        Err(e) => {
            tracing::error!("Error verifying password: {}", e);
            return Err(internal_error());
        }
    }

    let profile = fetch_profile(&state, &user).await?;
    let (access_token, expires_at) = generate_jwt_token(&user, &profile.role)?;

    Ok(Json(LoginResponse {
        session: SessionToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_at,
        },
        user: UserResponse::from_parts(&user, &profile),
        message: "Login successful".to_string(),
    }))
}

async fn verify_token(
    Extension(state): Extension<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Missing Authorization header")),
            )
        })?;

    let claims = verify_jwt_token(token).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("Invalid or expired token")),
        )
    })?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, is_active, is_superuser, created_at, updated_at
         FROM users WHERE id = $1 AND is_active = true",
    )
    .bind(claims.user_id())
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error finding user: {}", e);
        internal_error()
    })?
    .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(ApiError::new("User not found"))))?;

    let profile = fetch_profile(&state, &user).await?;

    Ok(Json(serde_json::json!({
        "user": UserResponse::from_parts(&user, &profile)
    })))
}

async fn fetch_profile(
    state: &Arc<AppState>,
    user: &User,
) -> Result<Profile, (StatusCode, Json<ApiError>)> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id, user_id, firstname, lastname, role, avatar, created_at
         FROM profiles WHERE user_id = $1",
    )
    .bind(user.id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error loading profile for user {}: {}", user.id, e);
        internal_error()
    })?;

    // Accounts created before profiles existed get an empty one.
    Ok(profile.unwrap_or(Profile {
        id: 0,
        user_id: user.id,
        firstname: String::new(),
        lastname: String::new(),
        role: "user".to_string(),
        avatar: None,
        created_at: user.created_at,
    }))
}

fn generate_jwt_token(
    user: &User,
    role: &str,
) -> Result<(String, i64), (StatusCode, Json<ApiError>)> {
    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "default_secret".to_string());

    let expires_at = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .map(|t| t.timestamp())
        .unwrap_or_else(|| Utc::now().timestamp());

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: role.to_string(),
        exp: expires_at as usize,
        iat: Utc::now().timestamp() as usize,
    };

    match encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    ) {
        Ok(token) => Ok((token, expires_at)),
        Err(e) => {
            tracing::error!("Error generating JWT token: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("Failed to generate authentication token")),
            ))
        }
    }
}

pub fn verify_jwt_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "default_secret".to_string());

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
