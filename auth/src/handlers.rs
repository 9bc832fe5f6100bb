//! HTTP endpoints for the local identity provider.
//!
//! # Routes
//!
//! - `POST /register` - create an account, returns `{user, token}`
//! - `POST /login` - exchange credentials for a token
//! - `GET /me` - the user behind the bearer token
//! - `POST /logout` - revoke the bearer token

use crate::error::AuthError;
use crate::identity::{IdentityProvider, Registration, SignedIn};
use crate::state::PublicUser;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Json, Router,
};
use hotel_booking_web::{AppError, ValidatedJson};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Shared identity provider handle
pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

/// Registration body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    /// Email address
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Password
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

/// Login body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Password
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Raw bearer token from the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Self(token.to_string()))
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))
    }
}

/// The signed-in user, resolved through the identity provider.
///
/// Any state that can hand out a [`SharedIdentityProvider`] can use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub PublicUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    SharedIdentityProvider: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let provider = SharedIdentityProvider::from_ref(state);
        let user = provider.authenticate(&token).await?;
        Ok(Self(user))
    }
}

/// Build the `/api/auth` router.
pub fn auth_router(provider: SharedIdentityProvider) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .with_state(provider)
}

async fn register(
    State(provider): State<SharedIdentityProvider>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<SignedIn>), AppError> {
    let signed_in = provider
        .register(Registration {
            name: request.name,
            email: request.email,
            password: request.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(signed_in)))
}

async fn login(
    State(provider): State<SharedIdentityProvider>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<SignedIn>, AppError> {
    let signed_in = provider.login(&request.email, &request.password).await?;
    Ok(Json(signed_in))
}

async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<PublicUser> {
    Json(user)
}

async fn logout(
    State(provider): State<SharedIdentityProvider>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, AppError> {
    provider.logout(&token).await.map_err(|err: AuthError| {
        tracing::warn!(error = %err, "Logout failed");
        AppError::from(err)
    })?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::LocalIdentityProvider;
    use crate::mocks::{MockSessionStore, MockUserStore};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use hotel_booking_testing::FixedClock;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let provider = LocalIdentityProvider::new(
            Arc::new(MockUserStore::new()),
            Arc::new(MockSessionStore::new()),
            Arc::new(FixedClock::default()),
        );
        auth_router(Arc::new(provider))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn ada() -> Value {
        json!({"name": "Ada", "email": "ada@example.com", "password": "s3cret-password"})
    }

    #[tokio::test]
    async fn test_register_returns_user_and_token() {
        let app = app();
        let (status, body) = send(&app, post_json("/register", &ada())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert_eq!(body["user"]["name"], "Ada");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn test_register_validates_fields() {
        let app = app();
        let (status, body) = send(
            &app,
            post_json("/register", &json!({"name": "", "email": "nope", "password": "short"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        let paths: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["email", "name", "password"]);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let app = app();
        send(&app, post_json("/register", &ada())).await;
        let (status, body) = send(&app, post_json("/register", &ada())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["message"], "User already exists");
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let app = app();
        send(&app, post_json("/register", &ada())).await;

        let (status, body) = send(
            &app,
            post_json("/login", &json!({"email": "ada@example.com", "password": "wrong-password"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_me_and_logout_with_bearer_token() {
        let app = app();
        let (_, registered) = send(&app, post_json("/register", &ada())).await;
        let token = registered["token"].as_str().unwrap().to_string();

        let me = Request::get("/me")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "ada@example.com");

        let logout = Request::post("/logout")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, logout).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let me_again = Request::get("/me")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, me_again).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_without_token_is_unauthorized() {
        let app = app();
        let (status, body) = send(&app, Request::get("/me").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}
