//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GlaucomaError;

/// 医生账户
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub hospital: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// 患者信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    pub age: i32,
    pub gender: String,
    pub medical_history: Option<String>,
    pub risk_factors: Option<String>,
    pub mrn: Option<String>, // 病历号
}

/// 工单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [Self::Open, Self::InProgress, Self::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = GlaucomaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                GlaucomaError::Validation(format!(
                    "Invalid status '{}'. Allowed: {}",
                    value,
                    allowed.join(", ")
                ))
            })
    }
}

/// 支持工单
///
/// `status` 不落库，读取时总是 `Open`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub issue_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
}

/// 青光眼分期，顺序与模型输出一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlaucomaStage {
    Normal,
    Early,
    Advanced,
}

impl GlaucomaStage {
    pub const LABELS: [GlaucomaStage; 3] = [Self::Normal, Self::Early, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Early => "early",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for GlaucomaStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 各分期概率
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageProbabilities {
    pub normal: f32,
    pub early: f32,
    pub advanced: f32,
}

/// 单次预测结果，不持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: GlaucomaStage,
    pub probabilities: StageProbabilities,
    pub explainability: Option<serde_json::Value>,
}
