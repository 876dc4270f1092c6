//! OCT 图像预测路由

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use glaucoma_core::{GlaucomaError, PredictionResult, Result};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::state::AppState;

const UPLOAD_PREFIX: &str = "oct_upload_";

/// 已通过类型检查的上传图像
struct ImageUpload {
    extension: &'static str,
    bytes: Bytes,
}

pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/predict/", post(predict))
        .route("/api/predict", post(predict))
        .route("/api/predict/ping", get(ping))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "msg": "predict router ok" }))
}

/// 上传图像并返回分期预测
pub async fn predict(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>> {
    let mut multipart = multipart?;
    let mut upload: Option<ImageUpload> = None;
    let mut patient_id: Option<i64> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") | Some("file") if upload.is_none() => {
                let extension = image_extension(field.content_type())?;
                let bytes = field.bytes().await?;
                upload = Some(ImageUpload { extension, bytes });
            }
            Some("patient_id") => {
                let text = field.text().await?;
                let id = text.trim().parse::<i64>().map_err(|_| {
                    GlaucomaError::Validation("patient_id must be an integer".to_string())
                })?;
                patient_id = Some(id);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| {
        GlaucomaError::Validation("Missing image upload (expected field 'image' or 'file')".to_string())
    })?;

    info!(
        "Prediction requested: {} bytes, patient_id={:?}",
        upload.bytes.len(),
        patient_id
    );

    let staged = stage_upload(state.upload_dir().to_path_buf(), upload).await?;
    let result = state.predictor.predict_file(staged.path()).await;

    if let Err(e) = staged.close() {
        warn!("Failed to remove staged upload: {}", e);
    }

    let result = result?;
    info!("Prediction complete: {}", result.prediction);
    Ok(Json(result))
}

/// 只接受 PNG 和 JPEG
fn image_extension(content_type: Option<&str>) -> Result<&'static str> {
    let content_type = content_type.map(str::to_ascii_lowercase);
    match content_type.as_deref() {
        Some("image/png") => Ok("png"),
        Some("image/jpeg") | Some("image/jpg") => Ok("jpg"),
        other => Err(GlaucomaError::UnsupportedMedia(format!(
            "Unsupported file type '{}'. Upload a PNG or JPEG image",
            other.unwrap_or("unknown")
        ))),
    }
}

/// 将上传内容写入上传目录下的临时文件，文件在句柄释放时删除
async fn stage_upload(dir: PathBuf, upload: ImageUpload) -> Result<NamedTempFile> {
    tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(UPLOAD_PREFIX)
            .suffix(&format!(".{}", upload.extension))
            .tempfile_in(&dir)?;
        file.write_all(&upload.bytes)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| GlaucomaError::Internal(format!("upload staging task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        missing_model_app, multipart_request, png_bytes, send_request, stub_model_app,
        TEST_UPLOAD_LIMIT,
    };
    use axum::http::StatusCode;
    use std::path::Path;

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_prediction_success_cleans_up() {
        let app = stub_model_app(vec![0.2, 1.5, 0.1]).await;

        let request = multipart_request("/api/predict/", &[("file", "image/png", png_bytes())]);
        let (status, body) = send_request(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "early");

        let probabilities = &body["probabilities"];
        let total: f64 = ["normal", "early", "advanced"]
            .iter()
            .map(|k| probabilities[k].as_f64().unwrap())
            .sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(probabilities["early"].as_f64() > probabilities["normal"].as_f64());
        assert_eq!(staged_files(app.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_alias_route_and_patient_id() {
        let app = stub_model_app(vec![0.7, 0.2, 0.1]).await;

        let request = multipart_request(
            "/api/predict",
            &[
                ("patient_id", "text/plain", b"17".to_vec()),
                ("image", "image/jpeg", png_bytes()),
            ],
        );
        let (status, body) = send_request(&app.router, request).await;
        // 内容按实际字节解码，声明的类型只用于过滤
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "normal");
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected_before_staging() {
        let app = stub_model_app(vec![0.7, 0.2, 0.1]).await;

        let request = multipart_request("/api/predict/", &[("file", "application/pdf", b"%PDF-1.4".to_vec())]);
        let (status, _) = send_request(&app.router, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(staged_files(app.upload_dir.path()), 0);
        assert!(!app.state.predictor.is_loaded());
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let app = stub_model_app(vec![0.7, 0.2, 0.1]).await;

        let request = multipart_request("/api/predict/", &[("note", "text/plain", b"hello".to_vec())]);
        let (status, _) = send_request(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = multipart_request(
            "/api/predict/",
            &[("file", "image/png", b"definitely not a png".to_vec())],
        );
        let (status, body) = send_request(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Uploaded file is not a readable image");
        assert_eq!(staged_files(app.upload_dir.path()), 0);

        let request = multipart_request(
            "/api/predict/",
            &[("patient_id", "text/plain", b"abc".to_vec()), ("file", "image/png", png_bytes())],
        );
        let (status, _) = send_request(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let app = stub_model_app(vec![0.7, 0.2, 0.1]).await;

        let oversized = vec![0u8; TEST_UPLOAD_LIMIT + 1024 * 1024];
        let request = multipart_request("/api/predict/", &[("file", "image/png", oversized)]);
        let (status, body) = send_request(&app.router, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["status"], 413);
        assert_eq!(staged_files(app.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_model_is_server_error() {
        let app = missing_model_app().await;

        let request = multipart_request("/api/predict/", &[("file", "image/png", png_bytes())]);
        let (status, body) = send_request(&app.router, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Prediction failed");
        assert_eq!(staged_files(app.upload_dir.path()), 0);
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Some("image/PNG")).unwrap(), "png");
        assert_eq!(image_extension(Some("image/jpg")).unwrap(), "jpg");
        assert!(matches!(
            image_extension(None),
            Err(GlaucomaError::UnsupportedMedia(_))
        ));
    }
}
