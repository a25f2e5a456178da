//! 余额、提现与提现流水

use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_ledger::dto::{BalanceDto, WithdrawalDto};
use loyalty_ledger::{LedgerError, decimal_from_f64};
use tracing::instrument;

use crate::dto::WithdrawRequest;
use crate::error::Result;
use crate::handlers::parse_json;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// GET /api/user/balance
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<BalanceDto>> {
    let balance = state.balance_service.get_balance(auth.user_id).await?;
    Ok(Json(balance))
}

/// 提现
///
/// POST /api/user/balance/withdraw
/// - 200：提现成功
/// - 402：积分不足
/// - 422：订单号或金额无效
#[instrument(skip(state, auth, body), fields(user_id = auth.user_id))]
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<WithdrawalDto>> {
    let request: WithdrawRequest = parse_json(&body)?;
    let amount = decimal_from_f64(request.sum)
        .ok_or_else(|| LedgerError::InvalidRequest(format!("提现金额无效: {}", request.sum)))?;

    let withdrawal = state
        .balance_service
        .withdraw(auth.user_id, request.order.trim(), amount)
        .await?;
    Ok(Json(withdrawal))
}

/// 查询提现流水，按处理时间正序；没有提现时返回 204
///
/// GET /api/user/withdrawals
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    let withdrawals = state.balance_service.list_withdrawals(auth.user_id).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(withdrawals).into_response())
}
