//! 分类器接口与输出解析

use glaucoma_core::{
    GlaucomaError, GlaucomaStage, PredictionResult, Result, StageProbabilities,
};
use std::sync::Arc;
use tract_onnx::prelude::tract_ndarray::Array4;

use crate::preprocess::InputShape;

/// 已加载的预训练分类器
///
/// 实现必须可被多个请求并发只读调用。
pub trait StageClassifier: Send + Sync {
    /// 模型期望的输入形状
    fn input_shape(&self) -> InputShape;

    /// 执行一次前向推理，返回按 normal/early/advanced 顺序排列的分数
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>>;
}

/// 模型加载器，负责从外部制品构造分类器
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn StageClassifier>>;
}

/// 分数与概率分布的容差
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// 将模型输出解析为预测结果
///
/// 输出已是概率分布（非负且和为1）时直接使用，否则视为 logits 做 softmax。
pub fn interpret(scores: &[f32]) -> Result<PredictionResult> {
    if scores.len() != GlaucomaStage::LABELS.len() {
        return Err(GlaucomaError::Inference(format!(
            "expected {} class scores, model returned {}",
            GlaucomaStage::LABELS.len(),
            scores.len()
        )));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(GlaucomaError::Inference("model returned non-finite scores".to_string()));
    }

    let probabilities = if is_distribution(scores) {
        scores.to_vec()
    } else {
        softmax(scores)
    };

    let (best, _) = probabilities
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |(best, max), (i, &p)| if p > max { (i, p) } else { (best, max) });

    Ok(PredictionResult {
        prediction: GlaucomaStage::LABELS[best],
        probabilities: StageProbabilities {
            normal: probabilities[0],
            early: probabilities[1],
            advanced: probabilities[2],
        },
        explainability: None,
    })
}

fn is_distribution(scores: &[f32]) -> bool {
    let sum: f32 = scores.iter().sum();
    scores.iter().all(|s| *s >= 0.0) && (sum - 1.0).abs() <= DISTRIBUTION_TOLERANCE
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::MIN, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
