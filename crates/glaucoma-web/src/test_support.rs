//! 路由测试共用的应用构造与请求工具

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, HeaderName, Method, Request, StatusCode},
    Router,
};
use glaucoma_core::config::{TensorLayout, DEFAULT_CORS_ORIGINS};
use glaucoma_core::Result;
use glaucoma_database::{DatabasePool, DatabaseQueries};
use glaucoma_inference::{
    Array4, InputShape, ModelLoader, OnnxModelLoader, Predictor, StageClassifier,
};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::credentials::TokenIssuer;
use crate::server::create_app;
use crate::state::AppState;

const TEST_SECRET: &str = "test-secret";
pub const TEST_UPLOAD_LIMIT: usize = 2 * 1024 * 1024;
const BOUNDARY: &str = "glaucoma-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

/// 返回固定分数的分类器
struct StubClassifier {
    scores: Vec<f32>,
}

impl StageClassifier for StubClassifier {
    fn input_shape(&self) -> InputShape {
        InputShape::new(16, TensorLayout::Nhwc)
    }

    fn forward(&self, _input: Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.scores.clone())
    }
}

struct StubLoader {
    scores: Vec<f32>,
}

impl ModelLoader for StubLoader {
    fn load(&self) -> Result<Arc<dyn StageClassifier>> {
        Ok(Arc::new(StubClassifier {
            scores: self.scores.clone(),
        }))
    }
}

pub async fn test_app() -> TestApp {
    stub_model_app(vec![0.6, 0.3, 0.1]).await
}

pub async fn stub_model_app(scores: Vec<f32>) -> TestApp {
    build_app(Arc::new(StubLoader { scores })).await
}

/// 模型文件不存在的应用
pub async fn missing_model_app() -> TestApp {
    let loader = OnnxModelLoader::new(
        "/nonexistent/glaucoma_model.onnx",
        InputShape::new(224, TensorLayout::Nhwc),
    );
    build_app(Arc::new(loader)).await
}

async fn build_app(loader: Arc<dyn ModelLoader>) -> TestApp {
    let db = DatabasePool::in_memory().await.unwrap();
    DatabaseQueries::new(&db).create_tables().await.unwrap();

    let upload_dir = TempDir::new().unwrap();
    let state = AppState::new(
        db,
        TokenIssuer::new(TEST_SECRET, chrono::Duration::minutes(30)),
        Predictor::new(loader),
        upload_dir.path().to_path_buf(),
    );

    let origins: Vec<String> = DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect();
    let router = create_app(state.clone(), &origins, TEST_UPLOAD_LIMIT).unwrap();

    TestApp {
        router,
        state,
        upload_dir,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

pub async fn dispatch(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if body.is_null() {
        builder.body(Body::empty()).unwrap()
    } else {
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}

/// 发送 JSON 请求，`Value::Null` 表示无请求体
pub async fn send_json(router: &Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    send_request(router, json_request(method, uri, body, None)).await
}

pub async fn send_json_with_token(
    router: &Router,
    method: Method,
    uri: &str,
    token: &str,
) -> (StatusCode, Value) {
    send_request(router, json_request(method, uri, Value::Null, Some(token))).await
}

pub async fn send(router: &Router, method: Method, uri: &str) -> TestResponse {
    dispatch(router, json_request(method, uri, Value::Null, None)).await
}

pub async fn send_request(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = dispatch(router, request).await;
    (response.status, response.json())
}

/// 构造 multipart 请求，每个部分为 (字段名, 内容类型, 内容)
pub fn multipart_request(uri: &str, parts: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, content_type, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}.bin\"\r\n",
                name, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// 生成一张小的 PNG 图像
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_fn(32, 24, |x, y| image::Rgb([(x * 8) as u8, (y * 10) as u8, 128]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}
