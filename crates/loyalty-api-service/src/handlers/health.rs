//! 存活与就绪探针

use axum::{Json, extract::State, http::StatusCode};
use loyalty_shared::database::Database;
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "loyalty-api-service";

/// 存活探针：进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：数据库不可用时返回 503，负载均衡据此摘除实例
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = Database::from_pool(state.pool.clone())
        .health_check()
        .await
        .is_ok();

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "service": SERVICE_NAME,
            "checks": {
                "database": if db_ok { "ok" } else { "fail" }
            }
        })),
    )
}
