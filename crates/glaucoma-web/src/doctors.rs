//! 医生路由

use axum::{
    middleware::from_fn_with_state, response::IntoResponse, routing::get, Extension, Json, Router,
};
use glaucoma_core::User;
use serde_json::json;

use crate::auth::{auth_middleware, UserResponse};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/doctors/me", get(current_doctor))
        .route_layer(from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/api/doctors/ping", get(ping))
        .merge(protected)
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "msg": "doctors router ok" }))
}

/// 当前登录医生
pub async fn current_doctor(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(user.into())
}
