//! Saved meal plans ("food logs") in SQLite
//!
//! Each record belongs to one user and is only ever listed or deleted on
//! that user's behalf.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use super::plan::{summarize, PlanDetails};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Open (creating if needed) the SQLite database at `db_path`
pub async fn connect(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Single-connection in-memory database, for tests
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
}

/// A saved plan
#[derive(Debug, Clone, Serialize)]
pub struct FoodLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_details: PlanDetails,
    pub created_at: DateTime<Utc>,
}

impl FoodLog {
    /// Display lines describing the intake behind this plan
    pub fn summary(&self) -> Vec<String> {
        summarize(&self.plan_details)
    }
}

pub struct FoodLogStore {
    pool: SqlitePool,
}

impl FoodLogStore {
    /// Wrap a pool and make sure the schema exists
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS food_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                plan_details TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_food_logs_owner
            ON food_logs(user_id, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Save a plan for `user_id`
    pub async fn insert(&self, user_id: Uuid, details: PlanDetails) -> Result<FoodLog, StoreError> {
        let log = FoodLog {
            id: Uuid::new_v4(),
            user_id,
            plan_details: details,
            created_at: Utc::now().trunc_subsecs(6),
        };

        let json = serde_json::to_string(&log.plan_details).map_err(|e| StoreError::Corrupt {
            id: log.id.to_string(),
            reason: e.to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO food_logs (id, user_id, plan_details, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(log.id.to_string())
        .bind(user_id.to_string())
        .bind(json)
        .bind(log.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        tracing::debug!(log_id = %log.id, user_id = %user_id, "food log saved");
        Ok(log)
    }

    /// All of a user's plans, newest first
    pub async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<FoodLog>, StoreError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT id, plan_details, created_at
            FROM food_logs
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, details, created_at)| {
                let corrupt = |reason: String| StoreError::Corrupt {
                    id: id.clone(),
                    reason,
                };
                Ok(FoodLog {
                    id: Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?,
                    user_id,
                    plan_details: serde_json::from_str(&details)
                        .map_err(|e| corrupt(e.to_string()))?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| corrupt(e.to_string()))?,
                })
            })
            .collect()
    }

    /// Delete one of the user's plans. Returns false if nothing matched.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM food_logs WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::{AgeRange, MealsPerDay, Sex, ValidIntake};
    use tokio_test::assert_ok;

    fn details(plan: &str) -> PlanDetails {
        PlanDetails {
            intake: ValidIntake {
                age_range: AgeRange::EightToTwelve,
                height_cm: 72.0,
                weight_kg: 9.1,
                sex: Sex::Boy,
                goal: None,
                meals_per_day: MealsPerDay::default(),
                allergies: Default::default(),
                dietary_preference: None,
            },
            plan: plan.to_string(),
        }
    }

    async fn store() -> FoodLogStore {
        FoodLogStore::new(connect_in_memory().await.unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let store = store().await;
        let owner = Uuid::new_v4();

        assert_ok!(store.insert(owner, details("first")).await);
        assert_ok!(store.insert(owner, details("second")).await);

        let logs = store.list_for_owner(owner).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].plan_details.plan, "second");
        assert_eq!(logs[1].plan_details.plan, "first");
        assert_eq!(logs[0].summary()[0], "Age: 8-12 months");
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped() {
        let store = store().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.insert(alice, details("alice's")).await.unwrap();

        assert_eq!(store.list_for_owner(alice).await.unwrap().len(), 1);
        assert!(store.list_for_owner(bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let store = store().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let log = store.insert(alice, details("plan")).await.unwrap();

        assert!(!store.delete(bob, log.id).await.unwrap());
        assert_eq!(store.list_for_owner(alice).await.unwrap().len(), 1);

        assert!(store.delete(alice, log.id).await.unwrap());
        assert!(store.list_for_owner(alice).await.unwrap().is_empty());
        assert!(!store.delete(alice, log.id).await.unwrap());
    }
}
