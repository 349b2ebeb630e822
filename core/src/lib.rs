//! Shared domain for the tap game: the leveling rule, the progress validation
//! policy and verification of Telegram Mini App init data.

pub mod init_data;
pub mod progress;

pub use init_data::{InitData, InitDataError, InitDataVerifier, WebAppUser};
pub use progress::{Progress, ProgressPolicy, ProgressViolation, TapOutcome};
