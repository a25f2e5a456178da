//! 路由测试
//!
//! 仓储使用内存实现，通过 `oneshot` 直接驱动完整路由

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use loyalty_ledger::repository::{BalanceRepositoryTrait, OrderRepositoryTrait};
use loyalty_ledger::{
    Balance, BalanceService, LedgerError, Order, OrderService, OrderStatus, Withdrawal,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower::ServiceExt;

use crate::auth::{JwtConfig, MockUserRepositoryTrait, User};
use crate::routes::app;
use crate::state::AppState;

// ==================== 内存仓储 ====================

#[derive(Default)]
struct InMemoryOrders {
    orders: Mutex<Vec<Order>>,
}

#[async_trait]
impl OrderRepositoryTrait for InMemoryOrders {
    async fn insert_order(
        &self,
        user_id: i64,
        number: &str,
        uploaded_at: DateTime<Utc>,
    ) -> loyalty_ledger::Result<Order> {
        let mut orders = self.orders.lock().unwrap();
        if orders.iter().any(|o| o.number == number) {
            return Err(LedgerError::DuplicateOrder(number.to_string()));
        }
        let order = Order {
            id: orders.len() as i64 + 1,
            number: number.to_string(),
            user_id,
            status: OrderStatus::New,
            accrual: None,
            uploaded_at,
            updated_at: uploaded_at,
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn order_exists(&self, user_id: i64, number: &str) -> loyalty_ledger::Result<bool> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .any(|o| o.user_id == user_id && o.number == number))
    }

    async fn order_exists_globally(&self, number: &str) -> loyalty_ledger::Result<bool> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.iter().any(|o| o.number == number))
    }

    async fn list_orders_by_user(&self, user_id: i64) -> loyalty_ledger::Result<Vec<Order>> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn select_next_unresolved_order(
        &self,
        _lease: Duration,
    ) -> loyalty_ledger::Result<Option<Order>> {
        Ok(None)
    }

    async fn defer_order(&self, _number: &str, _delay: Duration) -> loyalty_ledger::Result<()> {
        Ok(())
    }

    async fn update_order_resolution(
        &self,
        _number: &str,
        _status: OrderStatus,
        _accrual: Option<Decimal>,
    ) -> loyalty_ledger::Result<bool> {
        Ok(false)
    }
}

#[derive(Default)]
struct InMemoryBalances {
    accrued: Decimal,
    withdrawals: Vec<Withdrawal>,
}

#[async_trait]
impl BalanceRepositoryTrait for InMemoryBalances {
    async fn sum_accrual(&self, _user_id: i64) -> loyalty_ledger::Result<Decimal> {
        Ok(self.accrued)
    }

    async fn sum_withdrawn(&self, user_id: i64) -> loyalty_ledger::Result<Decimal> {
        Ok(self
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.amount)
            .sum())
    }

    async fn get_balance(&self, user_id: i64) -> loyalty_ledger::Result<Balance> {
        let withdrawn = self.sum_withdrawn(user_id).await?;
        Ok(Balance::new(self.accrued, withdrawn))
    }

    async fn list_withdrawals(&self, user_id: i64) -> loyalty_ledger::Result<Vec<Withdrawal>> {
        Ok(self
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }
}

// ==================== 测试装置 ====================

fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "route-test-secret".to_string(),
        expires_in_secs: 3600,
        issuer: "loyalty-api-service".to_string(),
    }
}

/// 懒连接池，提现校验失败与探针之外的路径不会访问数据库
fn lazy_pool() -> PgPool {
    PgPool::connect_lazy("postgres://localhost/loyalty_unused").unwrap()
}

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new(users: MockUserRepositoryTrait, balances: InMemoryBalances) -> Self {
        let pool = lazy_pool();
        let order_service = Arc::new(OrderService::new(Arc::new(InMemoryOrders::default())));
        let balance_service = Arc::new(BalanceService::new(Arc::new(balances), pool.clone()));
        let state = AppState::from_parts(
            pool,
            order_service,
            balance_service,
            Arc::new(users),
            jwt_config(),
        );
        Self {
            router: app(state.clone()),
            state,
        }
    }

    fn with_defaults() -> Self {
        Self::new(MockUserRepositoryTrait::new(), InMemoryBalances::default())
    }

    fn token_for(&self, user_id: i64) -> String {
        let (token, _) = self
            .state
            .jwt_manager
            .generate_token(user_id, &format!("user{user_id}"))
            .unwrap();
        token
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    async fn authed(
        &self,
        method: Method,
        uri: &str,
        user_id: i64,
        body: impl Into<Body>,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(user_id)))
            .body(body.into())
            .unwrap();
        self.send(request).await
    }
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn stored_user(id: i64, login: &str, password: &str) -> User {
    User {
        id,
        login: login.to_string(),
        password_hash: bcrypt::hash(password, 4).unwrap(),
        created_at: Utc::now(),
    }
}

fn json(body: &Bytes) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

// ==================== 注册与登录 ====================

#[tokio::test]
async fn test_register_returns_token() {
    let mut users = MockUserRepositoryTrait::new();
    users
        .expect_create_user()
        .withf(|login, hash| login.to_string() == "alice" && hash.to_string() != "s3cret")
        .times(1)
        .returning(|login, hash| {
            Ok(User {
                id: 7,
                login: login.to_string(),
                password_hash: hash.to_string(),
                created_at: Utc::now(),
            })
        });
    let test_app = TestApp::new(users, InMemoryBalances::default());

    let (status, headers, body) = test_app
        .send(json_request(
            "/api/user/register",
            r#"{"login":"alice","password":"s3cret"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let bearer = headers[header::AUTHORIZATION].to_str().unwrap();
    let token = bearer.strip_prefix("Bearer ").unwrap();
    let claims = test_app.state.jwt_manager.verify_token(token).unwrap();
    assert_eq!(claims.user_id().unwrap(), 7);
    assert!(
        headers[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .starts_with("token=")
    );
    assert_eq!(json(&body)["data"]["token"], token);
}

#[tokio::test]
async fn test_register_login_taken() {
    let mut users = MockUserRepositoryTrait::new();
    users
        .expect_create_user()
        .returning(|login, _| Err(crate::ApiError::LoginTaken(login.to_string())));
    let test_app = TestApp::new(users, InMemoryBalances::default());

    let (status, _, body) = test_app
        .send(json_request(
            "/api/user/register",
            r#"{"login":"alice","password":"s3cret"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["code"], "LOGIN_TAKEN");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let test_app = TestApp::with_defaults();

    for body in [
        "not json",
        r#"{"login":"alice"}"#,
        r#"{"login":"a","password":"s3cret"}"#,
        r#"{"login":"alice","password":"123"}"#,
    ] {
        let (status, _, _) = test_app
            .send(json_request("/api/user/register", body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn test_login_success_and_failure() {
    let mut users = MockUserRepositoryTrait::new();
    users
        .expect_find_by_login()
        .returning(|login| match login.to_string().as_str() {
            "alice" => Ok(Some(stored_user(7, "alice", "s3cret"))),
            _ => Ok(None),
        });
    let test_app = TestApp::new(users, InMemoryBalances::default());

    let (status, headers, _) = test_app
        .send(json_request(
            "/api/user/login",
            r#"{"login":"alice","password":"s3cret"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key(header::AUTHORIZATION));

    let (status, _, body) = test_app
        .send(json_request(
            "/api/user/login",
            r#"{"login":"alice","password":"wrong"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["code"], "INVALID_CREDENTIALS");

    let (status, _, _) = test_app
        .send(json_request(
            "/api/user/login",
            r#"{"login":"nobody","password":"s3cret"}"#,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ==================== 认证 ====================

#[tokio::test]
async fn test_protected_routes_require_token() {
    let test_app = TestApp::with_defaults();

    for (method, uri) in [
        (Method::GET, "/api/user/orders"),
        (Method::POST, "/api/user/orders"),
        (Method::GET, "/api/user/balance"),
        (Method::POST, "/api/user/balance/withdraw"),
        (Method::GET, "/api/user/withdrawals"),
    ] {
        let request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = test_app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    let request = Request::builder()
        .uri("/api/user/orders")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = test_app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_token_accepted() {
    let test_app = TestApp::with_defaults();

    let request = Request::builder()
        .uri("/api/user/orders")
        .header(header::COOKIE, format!("token={}", test_app.token_for(3)))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = test_app.send(request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// ==================== 订单 ====================

#[tokio::test]
async fn test_order_upload_outcomes() {
    let test_app = TestApp::with_defaults();

    let (status, _, _) = test_app
        .authed(Method::POST, "/api/user/orders", 1, "12345678903")
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _, _) = test_app
        .authed(Method::POST, "/api/user/orders", 1, "12345678903\n")
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = test_app
        .authed(Method::POST, "/api/user/orders", 2, "12345678903")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["code"], "ORDER_NUMBER_CONFLICT");

    let (status, _, body) = test_app
        .authed(Method::POST, "/api/user/orders", 1, "12345678900")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json(&body)["code"], "INVALID_ORDER_NUMBER");

    let (status, _, _) = test_app
        .authed(Method::POST, "/api/user/orders", 1, "  ")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders() {
    let test_app = TestApp::with_defaults();

    let (status, _, body) = test_app
        .authed(Method::GET, "/api/user/orders", 1, Body::empty())
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    for number in ["12345678903", "79927398713"] {
        test_app
            .authed(Method::POST, "/api/user/orders", 1, number)
            .await;
    }

    let (status, _, body) = test_app
        .authed(Method::GET, "/api/user/orders", 1, Body::empty())
        .await;
    assert_eq!(status, StatusCode::OK);

    let orders = json(&body);
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["number"], "12345678903");
    assert_eq!(orders[0]["status"], "NEW");
    assert!(orders[0].get("accrual").is_none());
    assert!(orders[0]["uploaded_at"].is_string());

    // 其他用户看不到
    let (status, _, _) = test_app
        .authed(Method::GET, "/api/user/orders", 2, Body::empty())
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// ==================== 余额与提现 ====================

#[tokio::test]
async fn test_get_balance() {
    let balances = InMemoryBalances {
        accrued: Decimal::new(50050, 2),
        withdrawals: vec![Withdrawal {
            id: 1,
            user_id: 1,
            order_number: "2377225624".to_string(),
            amount: Decimal::new(200, 0),
            processed_at: Utc::now(),
        }],
    };
    let test_app = TestApp::new(MockUserRepositoryTrait::new(), balances);

    let (status, _, body) = test_app
        .authed(Method::GET, "/api/user/balance", 1, Body::empty())
        .await;
    assert_eq!(status, StatusCode::OK);

    let balance = json(&body);
    assert_eq!(balance["current"], 300.5);
    assert_eq!(balance["withdrawn"], 200.0);
}

#[tokio::test]
async fn test_withdraw_rejects_invalid_input() {
    let test_app = TestApp::with_defaults();

    let cases = [
        ("not json", StatusCode::BAD_REQUEST),
        (r#"{"order":"2377225625","sum":100}"#, StatusCode::UNPROCESSABLE_ENTITY),
        (r#"{"order":"2377225624","sum":0}"#, StatusCode::UNPROCESSABLE_ENTITY),
        (r#"{"order":"2377225624","sum":-5}"#, StatusCode::UNPROCESSABLE_ENTITY),
        (r#"{"order":"2377225624","sum":1.001}"#, StatusCode::UNPROCESSABLE_ENTITY),
    ];

    for (body, expected) in cases {
        let (status, _, _) = test_app
            .authed(Method::POST, "/api/user/balance/withdraw", 1, body)
            .await;
        assert_eq!(status, expected, "{body}");
    }
}

#[tokio::test]
async fn test_list_withdrawals() {
    let balances = InMemoryBalances {
        accrued: Decimal::new(500, 0),
        withdrawals: vec![Withdrawal {
            id: 1,
            user_id: 1,
            order_number: "2377225624".to_string(),
            amount: Decimal::new(751, 0),
            processed_at: Utc::now(),
        }],
    };
    let test_app = TestApp::new(MockUserRepositoryTrait::new(), balances);

    let (status, _, body) = test_app
        .authed(Method::GET, "/api/user/withdrawals", 1, Body::empty())
        .await;
    assert_eq!(status, StatusCode::OK);
    let withdrawals = json(&body);
    assert_eq!(withdrawals[0]["order"], "2377225624");
    assert_eq!(withdrawals[0]["sum"], 751.0);

    let (status, _, _) = test_app
        .authed(Method::GET, "/api/user/withdrawals", 2, Body::empty())
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// ==================== 探针 ====================

#[tokio::test]
async fn test_health_and_request_id() {
    let test_app = TestApp::with_defaults();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = test_app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");
    assert!(headers.contains_key("x-request-id"));
}
