//! 路由配置

use axum::{
    Router, middleware,
    routing::{get, post},
};
use loyalty_shared::observability::middleware as obs_middleware;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;

use crate::handlers::{balance, health, order, user};
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// 用户路由，注册与登录之外的接口都需要认证
pub fn user_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login));

    let protected = Router::new()
        .route("/orders", post(order::upload_order).get(order::list_orders))
        .route("/balance", get(balance::get_balance))
        .route("/balance/withdraw", post(balance::withdraw))
        .route("/withdrawals", get(balance::list_withdrawals))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

/// 构建完整应用
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/user", user_routes(state.clone()))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(obs_middleware::request_id))
                .layer(middleware::from_fn(obs_middleware::http_tracing))
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;
