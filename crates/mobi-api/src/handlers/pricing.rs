//! Pricing handlers
//!
//! HTTP handlers for the /pricing API: ad-hoc fare quotes, fare rule
//! listing and the per-trip calculation audit trail.

use crate::dto::pricing::{
    CalculateFareRequest, FareCalculationResponse, FareResponse, FareRuleResponse,
};
use crate::dto::ApiResponse;
use crate::handlers::build_pricing;
use crate::identity::CallerIdentity;
use crate::state::Breakers;
use actix_web::{web, HttpResponse};
use mobi_cache::RedisCache;
use mobi_core::traits::PricingService;
use mobi_core::{AppConfig, AppError};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Price a trip without charging it
///
/// POST /api/v1/pricing/calculate
#[instrument(skip(pool, cache, config, breakers, req), fields(caller = %caller.user_id))]
pub async fn calculate_fare(
    pool: web::Data<PgPool>,
    cache: web::Data<RedisCache>,
    config: web::Data<AppConfig>,
    breakers: web::Data<Breakers>,
    caller: CallerIdentity,
    req: web::Json<CalculateFareRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Fare calculation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let request = req.into_inner().into_pricing_request()?;
    debug!(
        mode = %request.transport_mode,
        distance = %request.distance_km,
        "Quoting fare"
    );

    let pricing = build_pricing(&pool, &cache, &config, &breakers);
    let result = pricing.calculate_fare(&request).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(FareResponse::from(result))))
}

/// List all fare rules
///
/// GET /api/v1/pricing/rules
#[instrument(skip(pool, cache, config, breakers, _caller))]
pub async fn list_rules(
    pool: web::Data<PgPool>,
    cache: web::Data<RedisCache>,
    config: web::Data<AppConfig>,
    breakers: web::Data<Breakers>,
    _caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let pricing = build_pricing(&pool, &cache, &config, &breakers);
    let rules = pricing.list_rules().await?;

    let response: Vec<FareRuleResponse> = rules.into_iter().map(FareRuleResponse::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Fare calculation audit row for a trip
///
/// GET /api/v1/pricing/calculations/{trip_id}
#[instrument(skip(pool, cache, config, breakers, _caller))]
pub async fn get_calculation(
    pool: web::Data<PgPool>,
    cache: web::Data<RedisCache>,
    config: web::Data<AppConfig>,
    breakers: web::Data<Breakers>,
    path: web::Path<Uuid>,
    _caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let trip_id = path.into_inner();

    let pricing = build_pricing(&pool, &cache, &config, &breakers);
    let calculation = pricing
        .calculation_for_trip(trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No calculation for trip {}", trip_id)))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(FareCalculationResponse::from(
        calculation,
    ))))
}

/// Configure pricing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pricing")
            .route("/calculate", web::post().to(calculate_fare))
            .route("/rules", web::get().to(list_rules))
            .route("/calculations/{trip_id}", web::get().to(get_calculation)),
    );
}
