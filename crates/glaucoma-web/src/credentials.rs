//! 凭证处理：密码哈希与访问令牌

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use glaucoma_core::{GlaucomaError, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// 使用 Argon2id 和随机盐计算密码哈希（PHC 格式）
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GlaucomaError::Internal(format!("password hashing failed: {}", e)))
}

/// 校验密码，存储的哈希格式错误时视为不匹配
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 医生邮箱
    pub iat: i64,    // 签发时间
    pub exp: i64,    // 过期时间
    pub jti: String, // JWT ID
}

/// HS256 令牌签发与校验
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// 为指定邮箱签发访问令牌
    pub fn issue(&self, email: &str) -> Result<String> {
        let now = chrono::Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| GlaucomaError::Internal("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GlaucomaError::Internal(format!("token signing failed: {}", e)))
    }

    /// 校验签名和过期时间
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Rejected bearer token: {}", e);
                GlaucomaError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}
