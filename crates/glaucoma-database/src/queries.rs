//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use glaucoma_core::{GlaucomaError, Patient, Result, SupportTicket, User};

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表（已存在则跳过）
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建用户表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                hospital TEXT,
                specialization TEXT,
                experience_years INTEGER,
                created_at DATETIME NOT NULL
            )
        "#).execute(pool).await?;

        // 创建患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name VARCHAR(255) NOT NULL,
                age INTEGER NOT NULL,
                gender VARCHAR(10) NOT NULL,
                medical_history TEXT,
                risk_factors TEXT,
                mrn VARCHAR(100)
            )
        "#).execute(pool).await?;

        // 创建工单表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS support_tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                issue_type TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at DATETIME NOT NULL
            )
        "#).execute(pool).await?;

        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
            "CREATE INDEX IF NOT EXISTS idx_patients_full_name ON patients(full_name)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        Ok(())
    }

    // ========== 用户相关操作 ==========

    /// 创建新用户
    ///
    /// 邮箱重复时返回 `Conflict`，包括并发注册时由唯一约束拦下的情况。
    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        let pool = self.pool.pool();

        let result = sqlx::query(r#"
            INSERT INTO users (name, email, password, hospital, specialization, experience_years, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.hospital)
        .bind(&user.specialization)
        .bind(user.experience_years)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await
        .map_err(|e| match GlaucomaError::from(e) {
            GlaucomaError::Conflict(_) => {
                GlaucomaError::Conflict("Email already registered".to_string())
            }
            other => other,
        })?;

        let id = result.last_insert_rowid();
        self.get_user_by_id(id)
            .await?
            .ok_or_else(|| GlaucomaError::Internal(format!("user {} vanished after insert", id)))
    }

    /// 根据ID查找用户
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(result.map(User::from))
    }

    /// 根据邮箱查找用户
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(result.map(User::from))
    }

    /// 统计使用该邮箱的账户数，注册前的重复检查使用
    pub async fn count_users_by_email(&self, email: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count.0)
    }

    // ========== 患者相关操作 ==========

    /// 创建新患者
    pub async fn create_patient(&self, patient: &NewPatient) -> Result<Patient> {
        let result = sqlx::query(r#"
            INSERT INTO patients (full_name, age, gender, medical_history, risk_factors, mrn)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#)
        .bind(&patient.full_name)
        .bind(patient.age)
        .bind(&patient.gender)
        .bind(&patient.medical_history)
        .bind(&patient.risk_factors)
        .bind(&patient.mrn)
        .execute(self.pool.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.get_patient_by_id(id)
            .await?
            .ok_or_else(|| GlaucomaError::Internal(format!("patient {} vanished after insert", id)))
    }

    /// 获取全部患者，按ID升序
    pub async fn list_patients(&self) -> Result<Vec<Patient>> {
        let results = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients ORDER BY id ASC")
            .fetch_all(self.pool.pool())
            .await?;

        Ok(results.into_iter().map(Patient::from).collect())
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&self, id: i64) -> Result<Option<Patient>> {
        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(result.map(Patient::from))
    }

    /// 整体替换患者的可变字段，患者不存在时返回 `None`
    pub async fn update_patient(&self, id: i64, patient: &NewPatient) -> Result<Option<Patient>> {
        let result = sqlx::query(r#"
            UPDATE patients
            SET full_name = $1, age = $2, gender = $3, medical_history = $4, risk_factors = $5, mrn = $6
            WHERE id = $7
        "#)
        .bind(&patient.full_name)
        .bind(patient.age)
        .bind(&patient.gender)
        .bind(&patient.medical_history)
        .bind(&patient.risk_factors)
        .bind(&patient.mrn)
        .bind(id)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_patient_by_id(id).await
    }

    // ========== 工单相关操作 ==========

    /// 创建新工单，返回工单ID
    pub async fn create_ticket(&self, ticket: &NewSupportTicket) -> Result<i64> {
        let result = sqlx::query(r#"
            INSERT INTO support_tickets (name, email, issue_type, message, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#)
        .bind(&ticket.name)
        .bind(&ticket.email)
        .bind(&ticket.issue_type)
        .bind(&ticket.message)
        .bind(chrono::Utc::now())
        .execute(self.pool.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// 获取全部工单，按ID降序
    pub async fn list_tickets(&self) -> Result<Vec<SupportTicket>> {
        let results =
            sqlx::query_as::<_, DbSupportTicket>("SELECT * FROM support_tickets ORDER BY id DESC")
                .fetch_all(self.pool.pool())
                .await?;

        Ok(results.into_iter().map(SupportTicket::from).collect())
    }

    /// 根据ID查找工单
    pub async fn get_ticket_by_id(&self, id: i64) -> Result<Option<SupportTicket>> {
        let result =
            sqlx::query_as::<_, DbSupportTicket>("SELECT * FROM support_tickets WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.pool())
                .await?;

        Ok(result.map(SupportTicket::from))
    }
}
