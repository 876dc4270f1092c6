//! 基于 tract 的 ONNX 分类器

use glaucoma_core::{GlaucomaError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tract_onnx::prelude::tract_ndarray::Array4;
use tract_onnx::prelude::*;
use tracing::info;

use crate::classifier::{ModelLoader, StageClassifier};
use crate::preprocess::InputShape;

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// 已优化、可直接运行的 ONNX 分类器
pub struct OnnxClassifier {
    plan: OnnxPlan,
    shape: InputShape,
}

impl OnnxClassifier {
    pub fn load(path: &Path, shape: InputShape) -> Result<Self> {
        if !path.is_file() {
            return Err(GlaucomaError::ModelUnavailable(format!(
                "model artifact not found at {}",
                path.display()
            )));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(shape.dims()).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                GlaucomaError::ModelUnavailable(format!("failed to load {}: {}", path.display(), e))
            })?;

        info!("Loaded ONNX classifier from {} (input {:?})", path.display(), shape.dims());
        Ok(Self { plan, shape })
    }
}

impl StageClassifier for OnnxClassifier {
    fn input_shape(&self) -> InputShape {
        self.shape
    }

    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let tensor: Tensor = input.into();
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| GlaucomaError::Inference(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| GlaucomaError::Inference("model produced no outputs".to_string()))?;
        let scores = first
            .to_array_view::<f32>()
            .map_err(|e| GlaucomaError::Inference(e.to_string()))?;

        Ok(scores.iter().copied().collect())
    }
}

/// 从磁盘加载 ONNX 模型
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    path: PathBuf,
    shape: InputShape,
}

impl OnnxModelLoader {
    pub fn new(path: impl Into<PathBuf>, shape: InputShape) -> Self {
        Self { path: path.into(), shape }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self) -> Result<Arc<dyn StageClassifier>> {
        let classifier = OnnxClassifier::load(&self.path, self.shape)?;
        Ok(Arc::new(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glaucoma_core::config::TensorLayout;

    #[test]
    fn test_missing_artifact_is_model_unavailable() {
        let loader = OnnxModelLoader::new(
            "/nonexistent/glaucoma_oct.onnx",
            InputShape::new(224, TensorLayout::Nhwc),
        );

        match loader.load() {
            Err(GlaucomaError::ModelUnavailable(msg)) => assert!(msg.contains("not found")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_garbage_artifact_is_model_unavailable() {
        let file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
        std::fs::write(file.path(), b"not a protobuf").unwrap();

        let loader = OnnxModelLoader::new(file.path(), InputShape::new(32, TensorLayout::Nhwc));
        assert!(matches!(loader.load(), Err(GlaucomaError::ModelUnavailable(_))));
    }
}
