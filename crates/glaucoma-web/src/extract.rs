//! 统一错误格式的请求提取器
//!
//! axum 默认对 JSON 解析失败返回 422 和纯文本，这里统一转换为 400 + JSON 错误体。

use axum::extract::{FromRequest, FromRequestParts};
use glaucoma_core::GlaucomaError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(GlaucomaError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(GlaucomaError))]
pub struct ApiPath<T>(pub T);
