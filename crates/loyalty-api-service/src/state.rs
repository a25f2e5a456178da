//! 应用状态定义

use std::sync::Arc;

use loyalty_ledger::{BalanceRepository, BalanceService, OrderRepository, OrderService};
use sqlx::PgPool;

use crate::auth::{JwtConfig, JwtManager, UserRepository, UserRepositoryTrait};

/// Axum 应用共享状态
///
/// 服务与仓储通过 Arc 在 handler 间共享，身份信息由认证中间件注入请求扩展
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池，就绪探针使用
    pub pool: PgPool,
    pub order_service: Arc<OrderService>,
    pub balance_service: Arc<BalanceService>,
    pub user_repo: Arc<dyn UserRepositoryTrait>,
    pub jwt_manager: Arc<JwtManager>,
}

impl AppState {
    /// 基于连接池组装默认的 PostgreSQL 实现
    pub fn new(pool: PgPool, jwt_config: JwtConfig) -> Self {
        let order_service = Arc::new(OrderService::new(Arc::new(OrderRepository::new(
            pool.clone(),
        ))));
        let balance_service = Arc::new(BalanceService::new(
            Arc::new(BalanceRepository::new(pool.clone())),
            pool.clone(),
        ));
        let user_repo = Arc::new(UserRepository::new(pool.clone()));

        Self::from_parts(pool, order_service, balance_service, user_repo, jwt_config)
    }

    /// 使用外部构造的服务组装状态
    pub fn from_parts(
        pool: PgPool,
        order_service: Arc<OrderService>,
        balance_service: Arc<BalanceService>,
        user_repo: Arc<dyn UserRepositoryTrait>,
        jwt_config: JwtConfig,
    ) -> Self {
        Self {
            pool,
            order_service,
            balance_service,
            user_repo,
            jwt_manager: Arc::new(JwtManager::new(jwt_config)),
        }
    }
}
