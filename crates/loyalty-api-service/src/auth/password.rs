//! 密码哈希与校验

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::error::ApiError;

/// bcrypt 哈希
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    hash(password, DEFAULT_COST).map_err(|e| ApiError::Internal(format!("密码哈希失败: {e}")))
}

/// 比较明文密码与存储的哈希
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    verify(password, hash).map_err(|e| ApiError::Internal(format!("密码验证失败: {e}")))
}
