use super::DB;
use crate::models::progress::UserProgress;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tapgame_core::Progress;

/// Where per-user progress lives.
///
/// One row per Telegram user. `save` is a single upsert, so concurrent saves for
/// different users never touch each other and saves for the same user are
/// last-write-wins.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self, user_id: i64) -> Result<Option<UserProgress>>;

    async fn save(&self, user_id: i64, progress: Progress) -> Result<()>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> bool;
}

#[derive(Clone)]
pub struct PgProgressStore {
    db: DB,
}

impl PgProgressStore {
    pub fn new(db: DB) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn load(&self, user_id: i64) -> Result<Option<UserProgress>> {
        sqlx::query_as::<_, UserProgress>(
            "SELECT user_id, score, level, last_updated FROM user_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("Could not load progress for user {user_id}"))
    }

    async fn save(&self, user_id: i64, progress: Progress) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, score, level, last_updated)
            VALUES ($1, $2, $3, CURRENT_TIMESTAMP)
            ON CONFLICT (user_id)
            DO UPDATE SET score = EXCLUDED.score,
                          level = EXCLUDED.level,
                          last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(user_id)
        .bind(progress.score)
        .bind(progress.level)
        .execute(&self.db)
        .await
        .with_context(|| format!("Could not save progress for user {user_id}"))?;

        Ok(())
    }

    async fn ping(&self) -> bool {
        // `SELECT 1` is the fastest way to check the pool still hands out live connections.
        sqlx::query("SELECT 1").execute(&self.db).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use sqlx::postgres::PgPoolOptions;

    // Outside the range of real Telegram ids, so a shared database is left alone.
    const USER_ID: i64 = -7_000_000_001;

    async fn store() -> (PgProgressStore, DB) {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at Postgres");
        let db = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        init_schema(&db).await.unwrap();
        sqlx::query("DELETE FROM user_progress WHERE user_id = $1")
            .bind(USER_ID)
            .execute(&db)
            .await
            .unwrap();
        (PgProgressStore::new(db.clone()), db)
    }

    async fn rows(db: &DB) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_progress WHERE user_id = $1")
            .bind(USER_ID)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a Postgres at DATABASE_URL"]
    async fn upsert_keeps_one_row_per_user() {
        let (store, db) = store().await;

        assert!(store.ping().await);
        assert!(store.load(USER_ID).await.unwrap().is_none());

        let first = Progress::new(10, 2);
        store.save(USER_ID, first).await.unwrap();
        let inserted = store.load(USER_ID).await.unwrap().unwrap();
        assert_eq!(inserted.progress(), first);

        store.save(USER_ID, first).await.unwrap();
        assert_eq!(rows(&db).await, 1);

        let second = Progress::new(0, 3);
        store.save(USER_ID, second).await.unwrap();
        assert_eq!(rows(&db).await, 1);

        let updated = store.load(USER_ID).await.unwrap().unwrap();
        assert_eq!(updated.progress(), second);
        assert!(updated.last_updated >= inserted.last_updated);

        sqlx::query("DELETE FROM user_progress WHERE user_id = $1")
            .bind(USER_ID)
            .execute(&db)
            .await
            .unwrap();
    }
}
