use std::path::Path;
use tracing::info;

use crate::commands::open_store;
use crate::config::PluginConfig;
use crate::error::{RewardError, Result};
use crate::state::{legacy, RewardedPlayer};

/// Merge a `}`-delimited file into the store. Returns how many were new.
pub async fn import_legacy(config: &PluginConfig, path: Option<&Path>) -> Result<usize> {
    let path = match path.or(config.legacy_players_file.as_deref().map(Path::new)) {
        Some(p) => p.to_path_buf(),
        None => {
            return Err(RewardError::ConfigValidation {
                message: "no legacy file given and legacy_players_file is not set".to_string(),
            })
        }
    };

    let mut store = open_store(config).await?;
    let keys = legacy::import_file(&path).await?;
    let total = keys.len();

    let added = keys
        .into_iter()
        .filter(|key| store.append(RewardedPlayer::migrated(key.clone())))
        .count();
    if added > 0 {
        store.save().await?;
    }

    info!(
        "Imported {} of {} legacy records from {}",
        added,
        total,
        path.display()
    );
    println!("Imported {} new player(s), {} already known", added, total - added);
    Ok(added)
}

/// Write the store out in the legacy flat format
pub async fn export_legacy(config: &PluginConfig, path: &Path) -> Result<()> {
    let store = open_store(config).await?;
    legacy::export_file(path, &store.keys()).await?;

    info!("Exported {} records to {}", store.len(), path.display());
    println!("Exported {} player(s) to {}", store.len(), path.display());
    Ok(())
}
