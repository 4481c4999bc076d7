//! Billing handlers
//!
//! HTTP handlers for the /billing API: pass recharge, daily totals,
//! transaction history and the admin stats endpoint.

use crate::dto::billing::{
    DailyStatsResponse, DailyTotalResponse, RechargeRequest, RechargeResponse, TransactionResponse,
};
use crate::dto::ApiResponse;
use crate::handlers::build_ledger;
use crate::identity::{AdminCaller, CallerIdentity};
use actix_web::{web, HttpResponse};
use mobi_core::traits::LedgerService;
use mobi_core::AppError;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Credit a pass balance
///
/// POST /api/v1/billing/recharge
#[instrument(skip(pool, req), fields(caller = %caller.user_id))]
pub async fn recharge(
    pool: web::Data<PgPool>,
    caller: CallerIdentity,
    req: web::Json<RechargeRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Recharge validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    if req.amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "Recharge amount must be positive".to_string(),
        ));
    }

    let description = req
        .description
        .clone()
        .unwrap_or_else(|| "Pass recharge".to_string());

    debug!(pass_id = %req.pass_id, amount = %req.amount, "Recharging pass");

    let ledger = build_ledger(&pool);
    let outcome = ledger.credit(req.pass_id, req.amount, &description).await?;

    info!(
        transaction_id = %outcome.transaction_id,
        balance_after = %outcome.balance_after,
        "Pass recharged"
    );

    let response = RechargeResponse {
        transaction_id: outcome.transaction_id,
        pass_id: req.pass_id,
        amount: req.amount,
        balance_after: outcome.balance_after,
    };

    Ok(HttpResponse::Created().json(ApiResponse::success(response)))
}

/// Today's successful debit total for a pass
///
/// GET /api/v1/billing/daily-total/{pass_id}
#[instrument(skip(pool, _caller))]
pub async fn daily_total(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    _caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let pass_id = path.into_inner();

    let ledger = build_ledger(&pool);
    let total = ledger.daily_total(pass_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(DailyTotalResponse { pass_id, total })))
}

/// Transaction history for a pass, most recent first
///
/// GET /api/v1/billing/history/{pass_id}
#[instrument(skip(pool, _caller))]
pub async fn history(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    _caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let pass_id = path.into_inner();

    let ledger = build_ledger(&pool);
    let transactions = ledger.history(pass_id).await?;

    let response: Vec<TransactionResponse> =
        transactions.into_iter().map(TransactionResponse::from).collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Single transaction lookup
///
/// GET /api/v1/billing/transactions/{id}
#[instrument(skip(pool, _caller))]
pub async fn get_transaction(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    _caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let transaction_id = path.into_inner();

    let ledger = build_ledger(&pool);
    let transaction = ledger.transaction(transaction_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(TransactionResponse::from(transaction))))
}

/// Today's aggregated ledger figures (admin only)
///
/// GET /api/v1/billing/stats/today
#[instrument(skip(pool, admin), fields(admin = %admin.identity.user_id))]
pub async fn daily_stats(
    pool: web::Data<PgPool>,
    admin: AdminCaller,
) -> Result<HttpResponse, AppError> {
    let ledger = build_ledger(&pool);
    let stats = ledger.daily_stats().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(DailyStatsResponse::from(stats))))
}

/// Configure billing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/billing")
            .route("/recharge", web::post().to(recharge))
            .route("/daily-total/{pass_id}", web::get().to(daily_total))
            .route("/history/{pass_id}", web::get().to(history))
            .route("/transactions/{id}", web::get().to(get_transaction))
            .route("/stats/today", web::get().to(daily_stats)),
    );
}
