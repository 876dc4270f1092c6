//! 数据库模型

use chrono::{DateTime, Utc};
use glaucoma_core::models::*;
use sqlx::FromRow;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库用户表
#[derive(Debug, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String, // Argon2 PHC 字符串
    pub hospital: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(db_user: DbUser) -> Self {
        User {
            id: db_user.id,
            name: db_user.name,
            email: db_user.email,
            password_hash: db_user.password,
            hospital: db_user.hospital,
            specialization: db_user.specialization,
            experience_years: db_user.experience_years,
            created_at: db_user.created_at,
        }
    }
}

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: i64,
    pub full_name: String,
    pub age: i32,
    pub gender: String,
    pub medical_history: Option<String>,
    pub risk_factors: Option<String>,
    pub mrn: Option<String>,
}

impl From<DbPatient> for Patient {
    fn from(db_patient: DbPatient) -> Self {
        Patient {
            id: db_patient.id,
            full_name: db_patient.full_name,
            age: db_patient.age,
            gender: db_patient.gender,
            medical_history: db_patient.medical_history,
            risk_factors: db_patient.risk_factors,
            mrn: db_patient.mrn,
        }
    }
}

/// 数据库工单表（无状态列）
#[derive(Debug, FromRow)]
pub struct DbSupportTicket {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub issue_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbSupportTicket> for SupportTicket {
    fn from(db_ticket: DbSupportTicket) -> Self {
        SupportTicket {
            id: db_ticket.id,
            name: db_ticket.name,
            email: db_ticket.email,
            issue_type: db_ticket.issue_type,
            message: db_ticket.message,
            created_at: db_ticket.created_at,
            status: TicketStatus::Open,
        }
    }
}

// 插入模型 - 用于创建新记录

/// 新用户插入模型
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub hospital: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
}

/// 新患者插入模型，也用于整体更新
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub full_name: String,
    pub age: i32,
    pub gender: String,
    pub medical_history: Option<String>,
    pub risk_factors: Option<String>,
    pub mrn: Option<String>,
}

/// 新工单插入模型
#[derive(Debug, Clone)]
pub struct NewSupportTicket {
    pub name: String,
    pub email: String,
    pub issue_type: String,
    pub message: String,
}
