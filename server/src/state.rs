use crate::db::ProgressStore;
use std::sync::Arc;
use tapgame_core::{InitDataVerifier, ProgressPolicy};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProgressStore>,
    pub verifier: Arc<InitDataVerifier>,
    pub policy: ProgressPolicy,
}
