//! # 数据库模块
//!
//! 负责医生、患者和支持工单的持久化，提供SQLite连接池、建表和CRUD操作。

pub mod connection;
pub mod models;
pub mod queries;

// 重新导出主要类型
pub use connection::DatabasePool;
pub use models::*;
pub use queries::DatabaseQueries;
