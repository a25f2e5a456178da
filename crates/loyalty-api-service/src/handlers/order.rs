//! 订单上传与查询

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_ledger::dto::SubmitOutcome;
use tracing::instrument;

use crate::error::{ApiError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 上传订单号，请求体为纯文本
///
/// POST /api/user/orders
/// - 202：新订单已受理
/// - 200：本人已上传过
/// - 409：已被其他用户上传
/// - 422：订单号格式错误
#[instrument(skip(state, auth, body), fields(user_id = auth.user_id))]
pub async fn upload_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: String,
) -> Result<StatusCode> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("订单号不能为空".to_string()));
    }

    let outcome = state.order_service.submit_order(auth.user_id, &body).await?;
    Ok(match outcome {
        SubmitOutcome::Accepted => StatusCode::ACCEPTED,
        SubmitOutcome::AlreadyAccepted => StatusCode::OK,
    })
}

/// 查询本人订单，按上传时间正序；没有订单时返回 204
///
/// GET /api/user/orders
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    let orders = state.order_service.list_orders(auth.user_id).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(orders).into_response())
}
