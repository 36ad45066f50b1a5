pub mod grant_manager;
pub mod reward_manager;

pub use grant_manager::{GrantManager, GrantOutcome};
pub use reward_manager::{RewardManager, ScanReport, ScanSettings};
