//! HTTP 接口集成测试
//!
//! 使用真实 PostgreSQL 驱动完整路由，覆盖注册登录、订单上传与提现的端到端流程。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p loyalty-api-service --test api_integration_test -- --ignored
//! ```

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use loyalty_api::{AppState, app, auth::JwtConfig};
use loyalty_ledger::{OrderRepository, OrderStatus};
use loyalty_shared::database::Database;
use loyalty_shared::test_utils::{test_login, test_order_number};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower::ServiceExt;

// ==================== 辅助函数 ====================

async fn setup() -> (Router, PgPool) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = PgPool::connect(&url).await.expect("数据库连接失败");
    Database::from_pool(pool.clone())
        .run_migrations()
        .await
        .expect("执行迁移失败");

    let jwt = JwtConfig {
        secret: "integration-secret".to_string(),
        expires_in_secs: 3600,
        issuer: "loyalty-api-service".to_string(),
    };
    (app(AppState::new(pool.clone(), jwt)), pool)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: String,
) -> (StatusCode, HeaderMap, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body)).unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

fn bearer(headers: &HeaderMap) -> String {
    headers[header::AUTHORIZATION]
        .to_str()
        .unwrap()
        .trim_start_matches("Bearer ")
        .to_string()
}

// ==================== 测试 ====================

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_register_login_and_conflict() {
    let (router, _pool) = setup().await;
    let login = test_login();
    let credentials = format!(r#"{{"login":"{login}","password":"s3cret"}}"#);

    let (status, headers, _) = send(
        &router,
        Method::POST,
        "/api/user/register",
        None,
        credentials.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!bearer(&headers).is_empty());

    let (status, _, _) = send(
        &router,
        Method::POST,
        "/api/user/register",
        None,
        credentials.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) =
        send(&router, Method::POST, "/api/user/login", None, credentials).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        &router,
        Method::POST,
        "/api/user/login",
        None,
        format!(r#"{{"login":"{login}","password":"wrong"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_order_and_withdraw_flow() {
    let (router, pool) = setup().await;
    let credentials = format!(r#"{{"login":"{}","password":"s3cret"}}"#, test_login());
    let (_, headers, _) =
        send(&router, Method::POST, "/api/user/register", None, credentials).await;
    let token = bearer(&headers);

    let number = test_order_number();
    let (status, _, _) = send(
        &router,
        Method::POST,
        "/api/user/orders",
        Some(&token),
        number.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // 余额为 0 时提现失败
    let withdraw = format!(r#"{{"order":"{}","sum":200}}"#, test_order_number());
    let (status, _, _) = send(
        &router,
        Method::POST,
        "/api/user/balance/withdraw",
        Some(&token),
        withdraw.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    // 模拟对账完成
    OrderRepository::new(pool.clone())
        .update_order_resolution(&number, OrderStatus::Processed, Some(Decimal::new(500, 0)))
        .await
        .unwrap();

    let (status, _, body) =
        send(&router, Method::GET, "/api/user/orders", Some(&token), String::new()).await;
    assert_eq!(status, StatusCode::OK);
    let orders: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(orders[0]["status"], "PROCESSED");
    assert_eq!(orders[0]["accrual"], 500.0);

    let (status, _, _) = send(
        &router,
        Method::POST,
        "/api/user/balance/withdraw",
        Some(&token),
        withdraw,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) =
        send(&router, Method::GET, "/api/user/balance", Some(&token), String::new()).await;
    assert_eq!(status, StatusCode::OK);
    let balance: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(balance["current"], 300.0);
    assert_eq!(balance["withdrawn"], 200.0);

    let (status, _, body) = send(
        &router,
        Method::GET,
        "/api/user/withdrawals",
        Some(&token),
        String::new(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let withdrawals: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(withdrawals.as_array().unwrap().len(), 1);
    assert_eq!(withdrawals[0]["sum"], 200.0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_readiness_with_database() {
    let (router, _pool) = setup().await;
    let (status, _, body) = send(&router, Method::GET, "/ready", None, String::new()).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["checks"]["database"], "ok");
}
