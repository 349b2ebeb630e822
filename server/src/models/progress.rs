use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tapgame_core::Progress;

/// A row of `user_progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserProgress {
    pub user_id: i64,
    pub score: i32,
    pub level: i32,
    pub last_updated: NaiveDateTime,
}

impl UserProgress {
    pub fn progress(&self) -> Progress {
        Progress::new(self.score, self.level)
    }
}

/// Query string every `/api/progress` call carries.
#[derive(Debug, Deserialize)]
pub struct InitDataQuery {
    #[serde(rename = "initData")]
    pub init_data: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
}
