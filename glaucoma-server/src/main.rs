//! 青光眼辅助诊断服务主程序

use anyhow::Context;
use clap::Parser;
use glaucoma_core::AppConfig;
use glaucoma_database::{DatabasePool, DatabaseQueries};
use glaucoma_inference::{InputShape, OnnxModelLoader, Predictor};
use glaucoma_web::{create_app, AppState, TokenIssuer, WebServer};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "glaucoma-server")]
#[command(about = "Glaucoma XAI 临床辅助诊断后端")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听地址，覆盖配置文件
    #[arg(long)]
    host: Option<String>,

    /// 监听端口，覆盖配置文件
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // 初始化日志，RUST_LOG 优先
    let level = args.log_level.unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .init();

    info!("启动 Glaucoma XAI 后端...");
    if let Some(path) = &args.config {
        info!("  配置文件: {}", path);
    }
    info!("  数据库: {}", config.database.url);
    info!("  模型文件: {}", config.model.path.display());
    info!("  上传目录: {}", config.uploads.dir.display());

    std::fs::create_dir_all(&config.uploads.dir).with_context(|| {
        format!("failed to create upload directory {}", config.uploads.dir.display())
    })?;

    let db = DatabasePool::connect(&config.database.url, config.database.max_connections).await?;
    DatabaseQueries::new(&db).create_tables().await?;
    info!("数据库表结构已就绪");

    // 模型在第一次预测时加载
    let shape = InputShape::new(config.model.input_size, config.model.layout);
    let predictor = Predictor::new(Arc::new(OnnxModelLoader::new(config.model.path.clone(), shape)));

    let tokens = TokenIssuer::new(
        &config.auth.jwt_secret,
        chrono::Duration::minutes(config.auth.token_expiry_minutes),
    );

    let state = AppState::new(db.clone(), tokens, predictor, config.uploads.dir.clone());
    let app = create_app(state, &config.server.cors_origins, config.uploads.max_bytes)?;

    let addr = config.server.bind_address()?;
    WebServer::new(addr, app).run().await?;

    db.close().await;
    info!("服务器已关闭");
    Ok(())
}
