use crate::handlers::auth::verify_jwt_token;
use crate::models::auth::ApiError;
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

/// Bearer-token gate for the authenticated API surface. Verified claims are
/// inserted into request extensions for handlers to read.
pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let auth_header = match headers.get("Authorization") {
        Some(header) => header,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Missing Authorization header")),
            ));
        }
    };

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(_) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Invalid Authorization header format")),
            ));
        }
    };

    let token = match auth_str.strip_prefix("Bearer ") {
        Some(token) => token,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new(
                    "Invalid Authorization header format. Expected 'Bearer <token>'",
                )),
            ));
        }
    };

    let claims = match verify_jwt_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Invalid or expired token")),
            ));
        }
    };

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
