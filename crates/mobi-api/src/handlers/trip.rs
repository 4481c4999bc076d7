//! Trip handlers
//!
//! HTTP handlers for the /trips API. Trip creation runs the full payment
//! saga: pass validation, fare calculation and ledger debit.

use crate::dto::trip::{TripCreateRequest, TripResponse};
use crate::dto::ApiResponse;
use crate::handlers::build_saga;
use crate::identity::CallerIdentity;
use crate::state::Breakers;
use actix_web::{web, HttpResponse};
use mobi_cache::RedisCache;
use mobi_core::{AppConfig, AppError};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Create a trip and charge its fare to the caller's pass
///
/// POST /api/v1/trips
#[instrument(skip(pool, cache, config, breakers, req), fields(rider_id = %caller.user_id))]
pub async fn create_trip(
    pool: web::Data<PgPool>,
    cache: web::Data<RedisCache>,
    config: web::Data<AppConfig>,
    breakers: web::Data<Breakers>,
    caller: CallerIdentity,
    req: web::Json<TripCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Trip creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let order = req.into_inner().into_order()?;
    debug!(mode = %order.transport_mode, distance = %order.distance_km, "Creating trip");

    let saga = build_saga(&pool, &cache, &config, &breakers);
    let trip = saga.initiate_trip(caller.user_id, order).await?;

    info!(id = %trip.id, status = %trip.status, "Trip created");

    Ok(HttpResponse::Created().json(ApiResponse::success(TripResponse::from(trip))))
}

/// Fetch a single trip
///
/// GET /api/v1/trips/{id}
#[instrument(skip(pool, cache, config, breakers, caller))]
pub async fn get_trip(
    pool: web::Data<PgPool>,
    cache: web::Data<RedisCache>,
    config: web::Data<AppConfig>,
    breakers: web::Data<Breakers>,
    path: web::Path<Uuid>,
    caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let trip_id = path.into_inner();

    let saga = build_saga(&pool, &cache, &config, &breakers);
    let trip = saga.trip(trip_id).await?;

    if trip.rider_id != caller.user_id && !caller.is_admin() {
        return Err(AppError::Forbidden);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(TripResponse::from(trip))))
}

/// List the caller's trips, most recent first
///
/// GET /api/v1/trips
#[instrument(skip(pool, cache, config, breakers), fields(rider_id = %caller.user_id))]
pub async fn list_trips(
    pool: web::Data<PgPool>,
    cache: web::Data<RedisCache>,
    config: web::Data<AppConfig>,
    breakers: web::Data<Breakers>,
    caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let saga = build_saga(&pool, &cache, &config, &breakers);
    let trips = saga.trips_for_rider(caller.user_id).await?;

    let response: Vec<TripResponse> = trips.into_iter().map(TripResponse::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// List trips charged to a pass
///
/// GET /api/v1/trips/pass/{pass_id}
#[instrument(skip(pool, cache, config, breakers, _caller))]
pub async fn list_trips_by_pass(
    pool: web::Data<PgPool>,
    cache: web::Data<RedisCache>,
    config: web::Data<AppConfig>,
    breakers: web::Data<Breakers>,
    path: web::Path<Uuid>,
    _caller: CallerIdentity,
) -> Result<HttpResponse, AppError> {
    let pass_id = path.into_inner();

    let saga = build_saga(&pool, &cache, &config, &breakers);
    let trips = saga.trips_for_pass(pass_id).await?;

    let response: Vec<TripResponse> = trips.into_iter().map(TripResponse::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Configure trip routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/trips")
            .route("", web::post().to(create_trip))
            .route("", web::get().to(list_trips))
            .route("/pass/{pass_id}", web::get().to(list_trips_by_pass))
            .route("/{id}", web::get().to(get_trip)),
    );
}
