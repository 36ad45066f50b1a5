use tracing::info;

use crate::commands::open_store;
use crate::config::PluginConfig;
use crate::error::{RewardError, Result};
use crate::state::PlayerKey;

/// Print every rewarded player in the order they were rewarded
pub async fn list(config: &PluginConfig) -> Result<()> {
    let store = open_store(config).await?;

    if store.is_empty() {
        println!("No players have received starting items yet.");
        return Ok(());
    }

    for player in store.players() {
        println!(
            "{}\t{}\t{}",
            player.user_id,
            player.name,
            player.rewarded_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("{} rewarded player(s)", store.len());
    Ok(())
}

/// Forget a player so the kit is granted again on their next scan
pub async fn revoke(config: &PluginConfig, user_id: i64, name: &str) -> Result<()> {
    let mut store = open_store(config).await?;
    let key = PlayerKey::new(user_id, name);

    match store.revoke(&key).await? {
        Some(_) => {
            info!("Revoked starting items record for {}", key);
            println!("Revoked {}", key);
            Ok(())
        }
        None => Err(RewardError::PlayerNotFound {
            key: key.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> PluginConfig {
        let mut config = PluginConfig::default();
        config.resolve_paths(dir.path());
        config
    }

    #[tokio::test]
    async fn test_revoke_unknown_player() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let err = revoke(&config, 1, "Ghost").await.unwrap_err();
        assert!(matches!(err, RewardError::PlayerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_revoke_migrated_player() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("players.txt"), "1000Alice}1001Bob}").unwrap();
        let config = config_in(&dir);

        revoke(&config, 1000, "Alice").await.unwrap();

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.keys(), vec![PlayerKey::new(1001, "Bob")]);
        list(&config).await.unwrap();
    }
}
