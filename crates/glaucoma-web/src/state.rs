//! 请求间共享的应用状态

use glaucoma_database::{DatabasePool, DatabaseQueries};
use glaucoma_inference::Predictor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::credentials::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabasePool,
    pub tokens: Arc<TokenIssuer>,
    pub predictor: Arc<Predictor>,
    upload_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db: DatabasePool, tokens: TokenIssuer, predictor: Predictor, upload_dir: PathBuf) -> Self {
        Self {
            db,
            tokens: Arc::new(tokens),
            predictor: Arc::new(predictor),
            upload_dir: Arc::new(upload_dir),
        }
    }

    pub fn queries(&self) -> DatabaseQueries<'_> {
        DatabaseQueries::new(&self.db)
    }

    /// 上传文件的暂存目录
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}
