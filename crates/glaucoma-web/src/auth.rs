//! 医生注册、登录与令牌认证

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use glaucoma_core::utils::{is_valid_email, require_non_blank, validate_password};
use glaucoma_core::{GlaucomaError, Result, User};
use glaucoma_database::NewUser;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::credentials::{hash_password, verify_password};
use crate::extract::ApiJson;
use crate::state::AppState;

/// 注册请求
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub hospital: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
}

impl RegisterRequest {
    fn validate(&self) -> Result<()> {
        require_non_blank("name", &self.name)?;
        if !is_valid_email(&self.email) {
            return Err(GlaucomaError::Validation("value is not a valid email address".to_string()));
        }
        validate_password(&self.password)
    }
}

/// 登录请求，字段缺失按认证失败处理
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// 医生信息（不包含敏感数据）
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub hospital: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            hospital: user.hospital,
            specialization: user.specialization,
            experience_years: user.experience_years,
        }
    }
}

/// 登录响应
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/ping", get(ping))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "msg": "auth ok" }))
}

/// 注册处理器
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    request.validate()?;
    info!("Registration attempt for: {}", request.email);

    let queries = state.queries();
    if queries.count_users_by_email(&request.email).await? > 0 {
        warn!("Registration rejected, email already registered: {}", request.email);
        return Err(GlaucomaError::Conflict("Email already registered".to_string()));
    }

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| GlaucomaError::Internal(format!("hashing task failed: {}", e)))??;

    let user = queries
        .create_user(&NewUser {
            name: request.name,
            email: request.email,
            password_hash,
            hospital: request.hospital,
            specialization: request.specialization,
            experience_years: request.experience_years,
        })
        .await?;

    info!("Registered doctor {} ({})", user.id, user.email);
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// 登录处理器
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let (Some(email), Some(password)) = (request.email, request.password) else {
        warn!("Login attempt with missing credentials");
        return Err(invalid_credentials());
    };

    let Some(user) = state.queries().get_user_by_email(&email).await? else {
        warn!("Login failed, unknown email: {}", email);
        return Err(invalid_credentials());
    };

    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| GlaucomaError::Internal(format!("verification task failed: {}", e)))?;

    if !verified {
        warn!("Login failed, wrong password for: {}", email);
        return Err(invalid_credentials());
    }

    let access_token = state.tokens.issue(&user.email)?;
    info!("Doctor logged in: {}", user.email);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

fn invalid_credentials() -> GlaucomaError {
    GlaucomaError::Unauthorized("Invalid credentials".to_string())
}

/// 认证中间件：校验 Bearer 令牌并把当前医生放入请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| GlaucomaError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state.tokens.verify(token)?;

    let user = state
        .queries()
        .get_user_by_email(&claims.sub)
        .await?
        .ok_or_else(|| GlaucomaError::Unauthorized("Account no longer exists".to_string()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{send_json, test_app};
    use axum::http::Method;
    use serde_json::Value;

    fn registration(email: &str) -> Value {
        json!({
            "name": "Dr Test",
            "email": email,
            "password": "Pass123",
            "hospital": "City Hospital",
            "specialization": "Glaucoma",
            "experience_years": 5
        })
    }

    #[tokio::test]
    async fn test_register_then_duplicate_is_rejected() {
        let app = test_app().await;

        let (status, body) =
            send_json(&app.router, Method::POST, "/api/auth/register", registration("dup@example.com")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "dup@example.com");
        assert_eq!(body["experience_years"], 5);
        assert!(body.get("password").is_none());

        let (status, body) =
            send_json(&app.router, Method::POST, "/api/auth/register", registration("dup@example.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already registered");

        let count = app.state.queries().count_users_by_email("dup@example.com").await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let app = test_app().await;

        let (status, _) =
            send_json(&app.router, Method::POST, "/api/auth/register", registration("not-an-email")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(
            &app.router,
            Method::POST,
            "/api/auth/register",
            json!({ "email": "x@example.com", "password": "p" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_token_subject_matches_email() {
        let app = test_app().await;
        send_json(&app.router, Method::POST, "/api/auth/register", registration("drtest@example.com")).await;

        let (status, body) = send_json(
            &app.router,
            Method::POST,
            "/api/auth/login",
            json!({ "email": "drtest@example.com", "password": "Pass123" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");

        let token = body["access_token"].as_str().unwrap();
        let claims = app.state.tokens.verify(token).unwrap();
        assert_eq!(claims.sub, "drtest@example.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_unauthorized() {
        let app = test_app().await;
        send_json(&app.router, Method::POST, "/api/auth/register", registration("drtest@example.com")).await;

        for body in [
            json!({ "email": "drtest@example.com", "password": "wrong" }),
            json!({ "email": "nobody@example.com", "password": "Pass123" }),
            json!({ "email": "drtest@example.com" }),
        ] {
            let (status, response) = send_json(&app.router, Method::POST, "/api/auth/login", body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(response["detail"], "Invalid credentials");
        }
    }
}
