//! # 推理适配模块
//!
//! 加载预训练的 OCT 青光眼分期模型（进程内单例），预处理上传的图像并执行一次前向推理。

pub mod classifier;
pub mod onnx;
pub mod predictor;
pub mod preprocess;

pub use classifier::{interpret, ModelLoader, StageClassifier};
pub use onnx::{OnnxClassifier, OnnxModelLoader};
pub use predictor::Predictor;
pub use preprocess::{prepare_image, InputShape};

/// 张量类型，供自定义分类器实现使用
pub use tract_onnx::prelude::tract_ndarray::Array4;
