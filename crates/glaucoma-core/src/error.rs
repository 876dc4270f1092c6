//! 错误定义模块

use thiserror::Error;

/// 系统统一错误类型
#[derive(Error, Debug)]
pub enum GlaucomaError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("{0}")]
    Validation(String),

    /// 唯一性冲突（如重复邮箱），对外表现为 400
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnsupportedMedia(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("无法解码图像: {0}")]
    InvalidImage(String),

    #[error("模型不可用: {0}")]
    ModelUnavailable(String),

    #[error("推理失败: {0}")]
    Inference(String),

    #[error("报告生成失败: {0}")]
    Report(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// 系统统一结果类型
pub type Result<T> = std::result::Result<T, GlaucomaError>;

#[cfg(feature = "database")]
impl From<sqlx::Error> for GlaucomaError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => GlaucomaError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                GlaucomaError::Conflict("Record already exists".to_string())
            }
            other => GlaucomaError::Database(other.to_string()),
        }
    }
}

#[cfg(feature = "web")]
mod http {
    use super::GlaucomaError;
    use axum::{
        extract::multipart::{MultipartError, MultipartRejection},
        extract::rejection::{JsonRejection, PathRejection},
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use serde_json::json;
    use tracing::error;

    impl GlaucomaError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                GlaucomaError::Validation(_)
                | GlaucomaError::InvalidImage(_)
                | GlaucomaError::Conflict(_) => StatusCode::BAD_REQUEST,
                GlaucomaError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                GlaucomaError::NotFound(_) => StatusCode::NOT_FOUND,
                GlaucomaError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                GlaucomaError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }

        /// 对外暴露的错误信息，5xx 只返回通用描述
        fn public_message(&self) -> String {
            match self {
                GlaucomaError::Validation(msg)
                | GlaucomaError::Conflict(msg)
                | GlaucomaError::Unauthorized(msg)
                | GlaucomaError::NotFound(msg)
                | GlaucomaError::UnsupportedMedia(msg)
                | GlaucomaError::PayloadTooLarge(msg) => msg.clone(),
                GlaucomaError::InvalidImage(_) => "Uploaded file is not a readable image".to_string(),
                GlaucomaError::ModelUnavailable(_) | GlaucomaError::Inference(_) => {
                    "Prediction failed".to_string()
                }
                GlaucomaError::Report(_) => "Failed to generate report".to_string(),
                _ => "Server error".to_string(),
            }
        }
    }

    impl IntoResponse for GlaucomaError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                error!("Request failed: {}", self);
            }

            let body = Json(json!({
                "detail": self.public_message(),
                "error": true,
                "status": status.as_u16()
            }));

            (status, body).into_response()
        }
    }

    impl From<JsonRejection> for GlaucomaError {
        fn from(rejection: JsonRejection) -> Self {
            GlaucomaError::Validation(rejection.body_text())
        }
    }

    impl From<PathRejection> for GlaucomaError {
        fn from(rejection: PathRejection) -> Self {
            GlaucomaError::Validation(rejection.body_text())
        }
    }

    impl From<MultipartRejection> for GlaucomaError {
        fn from(rejection: MultipartRejection) -> Self {
            GlaucomaError::Validation(rejection.body_text())
        }
    }

    /// 超过请求体上限时保留 413
    impl From<MultipartError> for GlaucomaError {
        fn from(err: MultipartError) -> Self {
            if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                GlaucomaError::PayloadTooLarge(err.body_text())
            } else {
                GlaucomaError::Validation(err.body_text())
            }
        }
    }
}
