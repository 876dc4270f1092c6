//! 通用工具函数

use crate::error::{GlaucomaError, Result};

/// 密码最大字节数（Argon2 支持长密码，但需要上限）
pub const MAX_PASSWORD_BYTES: usize = 4096;

/// 验证邮箱格式
pub fn is_valid_email(email: &str) -> bool {
    // 简单的格式校验，不做 DNS 检查
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

/// 要求字段非空白
pub fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GlaucomaError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// 验证密码长度
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(GlaucomaError::Validation("password must not be empty".to_string()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(GlaucomaError::Validation("password too long".to_string()));
    }
    Ok(())
}
