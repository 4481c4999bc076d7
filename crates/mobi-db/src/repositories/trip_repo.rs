//! Trip repository implementation

use chrono::{DateTime, NaiveDateTime, Utc};
use mobi_core::{
    models::{TransportMode, Trip, TripStatus},
    traits::TripRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of TripRepository
pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    /// Create a new trip repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripRepository for PgTripRepository {
    #[instrument(skip(self, trip))]
    async fn create(&self, trip: &Trip) -> AppResult<Trip> {
        debug!("Creating trip for rider {}", trip.rider_id);

        let row = sqlx::query_as::<sqlx::Postgres, TripRow>(
            r#"
            INSERT INTO trips (
                id, rider_id, pass_id, transport_mode, origin, destination,
                distance_km, departure_time, arrival_time, status, computed_fare
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING
                id, rider_id, pass_id, transport_mode, origin, destination,
                distance_km, departure_time, arrival_time, status, computed_fare,
                created_at, updated_at
            "#,
        )
        .bind(trip.id)
        .bind(trip.rider_id)
        .bind(trip.pass_id)
        .bind(trip.transport_mode.to_string())
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(trip.distance_km)
        .bind(trip.departure_time)
        .bind(trip.arrival_time)
        .bind(trip.status.to_string())
        .bind(trip.computed_fare)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating trip: {}", e);
            AppError::Database(format!("Failed to create trip: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn settle(
        &self,
        id: Uuid,
        status: TripStatus,
        computed_fare: Option<Decimal>,
        arrival_time: Option<NaiveDateTime>,
    ) -> AppResult<Trip> {
        debug!("Settling trip {} as {}", id, status);

        // Status only moves forward; the guard refuses to touch settled rows
        let row = sqlx::query_as::<sqlx::Postgres, TripRow>(
            r#"
            UPDATE trips
            SET status = $2,
                computed_fare = COALESCE($3, computed_fare),
                arrival_time = COALESCE($4, arrival_time),
                updated_at = NOW()
            WHERE id = $1
              AND status = 'INITIATED'
            RETURNING
                id, rider_id, pass_id, transport_mode, origin, destination,
                distance_km, departure_time, arrival_time, status, computed_fare,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(computed_fare)
        .bind(arrival_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error settling trip {}: {}", id, e);
            AppError::Database(format!("Failed to settle trip: {}", e))
        })?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        match self.find_by_id(id).await? {
            Some(current) if !current.status.can_transition_to(status) => {
                error!(
                    "Refusing to settle trip {}: {} cannot move to {}",
                    id, current.status, status
                );
                Err(AppError::Conflict(format!(
                    "Trip {} is {} and cannot move to {}",
                    id, current.status, status
                )))
            }
            Some(_) => Err(AppError::Conflict(format!(
                "Trip {} changed concurrently",
                id
            ))),
            None => Err(AppError::TripNotFound(id.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>> {
        debug!("Finding trip by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, TripRow>(
            r#"
            SELECT
                id, rider_id, pass_id, transport_mode, origin, destination,
                distance_km, departure_time, arrival_time, status, computed_fare,
                created_at, updated_at
            FROM trips
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding trip {}: {}", id, e);
            AppError::Database(format!("Failed to find trip: {}", e))
        })?;

        Ok(result.map(Trip::from))
    }

    #[instrument(skip(self))]
    async fn list_by_rider(&self, rider_id: Uuid) -> AppResult<Vec<Trip>> {
        debug!("Listing trips for rider {}", rider_id);

        let rows = sqlx::query_as::<sqlx::Postgres, TripRow>(
            r#"
            SELECT
                id, rider_id, pass_id, transport_mode, origin, destination,
                distance_km, departure_time, arrival_time, status, computed_fare,
                created_at, updated_at
            FROM trips
            WHERE rider_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(rider_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing trips for rider {}: {}", rider_id, e);
            AppError::Database(format!("Failed to list trips: {}", e))
        })?;

        Ok(rows.into_iter().map(Trip::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_by_pass(&self, pass_id: Uuid) -> AppResult<Vec<Trip>> {
        debug!("Listing trips for pass {}", pass_id);

        let rows = sqlx::query_as::<sqlx::Postgres, TripRow>(
            r#"
            SELECT
                id, rider_id, pass_id, transport_mode, origin, destination,
                distance_km, departure_time, arrival_time, status, computed_fare,
                created_at, updated_at
            FROM trips
            WHERE pass_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(pass_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing trips for pass {}: {}", pass_id, e);
            AppError::Database(format!("Failed to list trips: {}", e))
        })?;

        Ok(rows.into_iter().map(Trip::from).collect())
    }

    #[instrument(skip(self))]
    async fn count_by_rider(&self, rider_id: Uuid) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM trips
            WHERE rider_id = $1
              AND status = 'COMPLETED'
            "#,
        )
        .bind(rider_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting trips for rider {}: {}", rider_id, e);
            AppError::Database(format!("Failed to count trips: {}", e))
        })?;

        Ok(count.0)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    rider_id: Uuid,
    pass_id: Uuid,
    transport_mode: String,
    origin: String,
    destination: String,
    distance_km: Decimal,
    departure_time: NaiveDateTime,
    arrival_time: Option<NaiveDateTime>,
    status: String,
    computed_fare: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Self {
            id: row.id,
            rider_id: row.rider_id,
            pass_id: row.pass_id,
            transport_mode: TransportMode::from_str(&row.transport_mode)
                .unwrap_or(TransportMode::Bus),
            origin: row.origin,
            destination: row.destination,
            distance_km: row.distance_km,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            status: TripStatus::from_str(&row.status).unwrap_or(TripStatus::Initiated),
            computed_fare: row.computed_fare,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::PgPassRepository;
    use chrono::Local;
    use mobi_core::traits::PassRepository;
    use mobi_core::models::Pass;
    use rust_decimal_macros::dec;

    async fn setup_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        crate::create_pool(&url, Some(2))
            .await
            .expect("Failed to connect to Postgres")
    }

    async fn initiated_trip(pool: &PgPool) -> Trip {
        let pass = PgPassRepository::new(pool.clone())
            .create(&Pass::default())
            .await
            .expect("Failed to create pass");

        let trip = Trip::initiate(
            pass.rider_id,
            pass.id,
            TransportMode::Bus,
            "Liberté 6".to_string(),
            "Plateau".to_string(),
            dec!(10),
            Local::now().naive_local(),
        );
        PgTripRepository::new(pool.clone())
            .create(&trip)
            .await
            .expect("Failed to create trip")
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_settle_rejects_regression_from_completed() {
        let pool = setup_pool().await;
        let repo = PgTripRepository::new(pool.clone());
        let trip = initiated_trip(&pool).await;

        let settled = repo
            .settle(
                trip.id,
                TripStatus::Completed,
                Some(dec!(400)),
                Some(Local::now().naive_local()),
            )
            .await
            .unwrap();
        assert_eq!(settled.status, TripStatus::Completed);

        let err = repo
            .settle(trip.id, TripStatus::Initiated, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let current = repo.find_by_id(trip.id).await.unwrap().unwrap();
        assert_eq!(current.status, TripStatus::Completed);
        assert_eq!(current.computed_fare, Some(dec!(400)));
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_settle_is_single_shot() {
        let pool = setup_pool().await;
        let repo = PgTripRepository::new(pool.clone());
        let trip = initiated_trip(&pool).await;

        repo.settle(trip.id, TripStatus::Failed, Some(dec!(400)), None)
            .await
            .unwrap();

        let err = repo
            .settle(trip.id, TripStatus::Completed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore] // Requires Postgres running
    async fn test_settle_missing_trip() {
        let pool = setup_pool().await;
        let repo = PgTripRepository::new(pool);

        let err = repo
            .settle(Uuid::new_v4(), TripStatus::Completed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TripNotFound(_)));
    }
}
