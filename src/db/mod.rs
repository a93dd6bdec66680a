use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::trip::Trip;

pub type DbPool = SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TripRow {
    pub id: String,
    pub destination: String,
    pub duration_days: i64,
    pub status: String,
    pub created_at: i64,
    pub payload: String,
}

impl TripRow {
    pub fn into_trip(self) -> Result<Trip, sqlx::Error> {
        serde_json::from_str(&self.payload).map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}

pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        let path = path.trim_start_matches("//");
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Insert a trip, or overwrite the stored copy with the same id
pub async fn save_trip(pool: &DbPool, trip: &Trip) -> Result<(), sqlx::Error> {
    let payload = serde_json::to_string(trip).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO trips (id, destination, duration_days, status, created_at, payload, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, datetime('now'))
        ON CONFLICT(id)
        DO UPDATE SET
            destination = excluded.destination,
            duration_days = excluded.duration_days,
            status = excluded.status,
            created_at = excluded.created_at,
            payload = excluded.payload,
            updated_at = datetime('now')
        "#
    )
    .bind(&trip.id)
    .bind(&trip.destination)
    .bind(trip.duration_days as i64)
    .bind(trip.status.to_string())
    .bind(trip.created_at)
    .bind(payload)
    .execute(pool)
    .await?;

    debug!("Saved trip {} ({})", trip.id, trip.destination);
    Ok(())
}

pub async fn get_trip(pool: &DbPool, id: &str) -> Result<Option<Trip>, sqlx::Error> {
    let row = sqlx::query_as::<_, TripRow>(
        "SELECT id, destination, duration_days, status, created_at, payload FROM trips WHERE id = ?"
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(TripRow::into_trip).transpose()
}

/// All stored trips, newest first; rows that no longer parse are skipped
pub async fn list_trips(pool: &DbPool) -> Result<Vec<Trip>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TripRow>(
        "SELECT id, destination, duration_days, status, created_at, payload FROM trips ORDER BY created_at DESC, id"
    )
    .fetch_all(pool)
    .await?;

    let mut trips = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone();
        match row.into_trip() {
            Ok(trip) => trips.push(trip),
            Err(e) => warn!("Skipping unreadable trip {}: {}", id, e),
        }
    }
    Ok(trips)
}

pub async fn delete_trip(pool: &DbPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM trips WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::model::*;

    fn trip(id: &str, destination: &str, created_at: i64) -> Trip {
        Trip {
            id: id.to_string(),
            destination: destination.to_string(),
            duration_days: 1,
            pace: TravelPace::Balanced,
            interests: vec!["Naturaleza".to_string()],
            mandatory_activities: None,
            num_restaurants_per_day: 1,
            itinerary: vec![TripDay {
                day_number: 1,
                activities: Vec::new(),
            }],
            reservations: Vec::new(),
            budget: TripBudget {
                total_estimated: 120.0,
                currency: "EUR".to_string(),
                level: BudgetLevel::Low,
                breakdown: BudgetBreakdown::default(),
            },
            general_tips: Vec::new(),
            status: TripStatus::Upcoming,
            created_at,
        }
    }

    async fn test_pool(dir: &tempfile::TempDir) -> DbPool {
        let url = format!("sqlite:{}", dir.path().join("nested").join("trips.db").display());
        init_db(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get_trip() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let saved = trip("a1", "Oporto", 10);
        save_trip(&pool, &saved).await.unwrap();

        assert_eq!(get_trip(&pool, "a1").await.unwrap(), Some(saved));
        assert_eq!(get_trip(&pool, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        let mut t = trip("a1", "Oporto", 10);
        save_trip(&pool, &t).await.unwrap();
        t.status = TripStatus::Completed;
        save_trip(&pool, &t).await.unwrap();

        let trips = list_trips(&pool).await.unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].status, TripStatus::Completed);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool(&dir).await;

        save_trip(&pool, &trip("old", "Sevilla", 1)).await.unwrap();
        save_trip(&pool, &trip("new", "Bilbao", 2)).await.unwrap();

        let ids: Vec<String> = list_trips(&pool).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["new", "old"]);

        assert!(delete_trip(&pool, "old").await.unwrap());
        assert!(!delete_trip(&pool, "old").await.unwrap());
        assert_eq!(list_trips(&pool).await.unwrap().len(), 1);
    }
}
