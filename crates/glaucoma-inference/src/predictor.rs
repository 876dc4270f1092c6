//! 预测入口与模型缓存

use glaucoma_core::{GlaucomaError, PredictionResult, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::classifier::{interpret, ModelLoader, StageClassifier};
use crate::preprocess::prepare_image;

/// 青光眼分期预测器
///
/// 模型在第一次预测时加载，之后整个进程共享同一实例。并发的首次请求只会
/// 触发一次加载，其余请求等待其完成；加载失败不会被缓存，下一次请求会重试。
pub struct Predictor {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn StageClassifier>>,
}

impl Predictor {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    /// 模型是否已加载
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// 获取（必要时加载）分类器
    pub async fn classifier(&self) -> Result<Arc<dyn StageClassifier>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                info!("Loading glaucoma classifier");
                let loader = Arc::clone(&self.loader);
                let loaded = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| GlaucomaError::Internal(format!("model load task failed: {}", e)))?;

                if let Err(e) = &loaded {
                    error!("Failed to load glaucoma classifier: {}", e);
                }
                loaded
            })
            .await?;

        Ok(Arc::clone(model))
    }

    /// 对已暂存到磁盘的上传文件执行预测
    pub async fn predict_file(&self, path: &Path) -> Result<PredictionResult> {
        let classifier = self.classifier().await?;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&path)?;
            run_classifier(classifier.as_ref(), &bytes)
        })
        .await
        .map_err(|e| GlaucomaError::Internal(format!("prediction task failed: {}", e)))?
    }
}

fn run_classifier(classifier: &dyn StageClassifier, bytes: &[u8]) -> Result<PredictionResult> {
    let tensor = prepare_image(bytes, classifier.input_shape())?;
    let scores = classifier.forward(tensor)?;
    interpret(&scores)
}
