pub mod legacy;
pub mod players;
pub mod simulate;

pub use legacy::{export_legacy, import_legacy};
pub use players::{list, revoke};
pub use simulate::simulate;

use std::path::Path;

use crate::config::PluginConfig;
use crate::error::Result;
use crate::state::RewardedStore;

/// Open the configured store, running the legacy import on first use
pub async fn open_store(config: &PluginConfig) -> Result<RewardedStore> {
    RewardedStore::load_or_migrate(
        &config.players_file,
        config.legacy_players_file.as_deref().map(Path::new),
    )
    .await
}
