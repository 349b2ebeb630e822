use super::ProgressStore;
use crate::models::progress::UserProgress;
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tapgame_core::Progress;
use tokio::sync::RwLock;

/// In-process stand-in for Postgres with the same upsert semantics.
#[derive(Default)]
pub struct MemoryProgressStore {
    rows: RwLock<HashMap<i64, UserProgress>>,
    offline: AtomicBool,
}

impl MemoryProgressStore {
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn row(&self, user_id: i64) -> Option<UserProgress> {
        self.rows.read().await.get(&user_id).cloned()
    }

    /// Makes every following call fail like an unreachable database.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load(&self, user_id: i64) -> Result<Option<UserProgress>> {
        self.check_online()?;
        Ok(self.row(user_id).await)
    }

    async fn save(&self, user_id: i64, progress: Progress) -> Result<()> {
        self.check_online()?;
        let row = UserProgress {
            user_id,
            score: progress.score,
            level: progress.level,
            last_updated: chrono::Utc::now().naive_utc(),
        };
        self.rows.write().await.insert(user_id, row);
        Ok(())
    }

    async fn ping(&self) -> bool {
        self.check_online().is_ok()
    }
}
