//! 认证模块
//!
//! 提供用户注册登录所需的 JWT 签发校验、密码哈希和用户仓储

mod jwt;
mod password;
mod user_repo;

pub use jwt::{Claims, JwtConfig, JwtManager};
pub use password::{hash_password, verify_password};
pub use user_repo::{User, UserRepository, UserRepositoryTrait};

#[cfg(test)]
pub use user_repo::MockUserRepositoryTrait;
