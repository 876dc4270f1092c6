//! 配置管理
//!
//! 优先级从低到高：内置默认值 → 配置文件 → `GLAUCOMA_` 前缀环境变量 →
//! 兼容旧部署的 `DATABASE_URL` / `JWT_SECRET`。

use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{GlaucomaError, Result};

/// 未指定 `--config` 时尝试加载的文件名（可缺省）
pub const DEFAULT_CONFIG_FILE: &str = "glaucoma";

/// 令牌有效期上限（10年）
pub const MAX_TOKEN_EXPIRY_MINUTES: i64 = 10 * 365 * 24 * 60;

/// 前端开发服务器的默认来源
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:8080",
    "http://127.0.0.1:8080",
];

/// 系统完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub model: ModelConfig,
    pub uploads: UploadConfig,
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域访问的来源
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GlaucomaError::Config(format!("invalid bind address: {}", e)))
    }
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 连接字符串
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT签名密钥，必须显式配置
    #[serde(default)]
    pub jwt_secret: String,
    /// token有效期（分钟）
    pub token_expiry_minutes: i64,
}

/// 张量布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// batch, height, width, channels
    Nhwc,
    /// batch, channels, height, width
    Nchw,
}

/// 分类模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// ONNX 模型文件路径
    pub path: PathBuf,
    /// 输入边长（正方形）
    pub input_size: u32,
    pub layout: TensorLayout,
}

/// 上传文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 临时文件目录
    pub dir: PathBuf,
    /// 请求体上限（字节）
    pub max_bytes: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl From<ConfigError> for GlaucomaError {
    fn from(err: ConfigError) -> Self {
        GlaucomaError::Config(err.to_string())
    }
}

impl AppConfig {
    /// 从配置文件和进程环境变量加载
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_from(path, std::env::vars().collect())
    }

    /// 从给定的环境变量集合加载
    pub fn load_from(path: Option<&str>, env: HashMap<String, String>) -> Result<Self> {
        let upload_dir = std::env::temp_dir().join("glaucoma-uploads");
        let cors_origins: Vec<String> = DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect();

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_origins", cors_origins)?
            .set_default("database.url", "sqlite://glaucoma.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.token_expiry_minutes", 60)?
            .set_default("model.path", "models/glaucoma_oct.onnx")?
            .set_default("model.input_size", 224)?
            .set_default("model.layout", "nhwc")?
            .set_default("uploads.dir", upload_dir.to_string_lossy().to_string())?
            .set_default("uploads.max_bytes", 20 * 1024 * 1024)?
            .set_default("logging.level", "info")?;

        builder = match path {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings = builder
            .add_source(
                Environment::with_prefix("GLAUCOMA")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            )
            .set_override_option("database.url", env.get("DATABASE_URL").cloned())?
            .set_override_option("auth.jwt_secret", env.get("JWT_SECRET").cloned())?
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(GlaucomaError::Config(
                "JWT_SECRET (or auth.jwt_secret) must be set".to_string(),
            ));
        }
        if !(1..=MAX_TOKEN_EXPIRY_MINUTES).contains(&self.auth.token_expiry_minutes) {
            return Err(GlaucomaError::Config(format!(
                "auth.token_expiry_minutes must be between 1 and {}",
                MAX_TOKEN_EXPIRY_MINUTES
            )));
        }
        if self.database.max_connections == 0 {
            return Err(GlaucomaError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.model.input_size == 0 {
            return Err(GlaucomaError::Config("model.input_size must be positive".to_string()));
        }
        Ok(())
    }
}
