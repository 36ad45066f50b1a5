pub mod legacy;
pub mod rewarded;

pub use rewarded::{
    create_shared_rewarded_store, PlayerKey, RewardedPlayer, RewardedStore, SharedRewardedStore,
};
