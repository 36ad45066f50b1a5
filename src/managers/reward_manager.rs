use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::host::{ChatLine, ServerHost};
use crate::messages::grant_announcement;
use crate::protocol::{GrantFlag, GrantNotice};
use crate::state::{PlayerKey, SharedRewardedStore};

/// Per-scan settings taken from the plugin config
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub channel: String,
    pub send_delay: Duration,
    pub announcer_name: String,
}

/// Outcome of one scan over the connected players
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Newly rewarded and sent a grant notice
    pub rewarded: Vec<PlayerKey>,

    /// Already in the rewarded set
    pub already_rewarded: Vec<PlayerKey>,

    /// Grant notice could not be sent; the record was rolled back
    pub deferred: Vec<PlayerKey>,

    /// Could not be persisted; retried on the next scan
    pub failed: Vec<PlayerKey>,

    /// Connected but not yet playing
    pub skipped: usize,
}

/// Server side of the starter kit: decides who gets it and tells the clients
pub struct RewardManager<H: ServerHost> {
    store: SharedRewardedStore,
    host: Arc<H>,
    settings: ScanSettings,
}

impl<H: ServerHost> RewardManager<H> {
    pub fn new(store: SharedRewardedStore, host: Arc<H>, settings: ScanSettings) -> Self {
        Self {
            store,
            host,
            settings,
        }
    }

    pub fn store(&self) -> &SharedRewardedStore {
        &self.store
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Check every playing connection against the rewarded set and send each
    /// player one grant notice. Fails only when the roster cannot be read.
    pub async fn scan(&self) -> Result<ScanReport> {
        let players = self.host.connected_players().await?;
        let mut report = ScanReport::default();

        // Held for the whole scan so overlapping scans cannot double-grant
        let mut store = self.store.lock().await;
        let mut first_send = true;

        for player in players {
            if !player.is_playing() {
                report.skipped += 1;
                continue;
            }

            let key = PlayerKey::new(player.user_id, player.name.clone());
            let flag = if store.contains(&key) {
                GrantFlag::AlreadyRewarded
            } else {
                match store.record(key.clone()).await {
                    Ok(_) => {}
                    Err(e) => {
                        error!("Failed to persist reward for {}: {}", key, e);
                        report.failed.push(key);
                        continue;
                    }
                }
                GrantFlag::GrantNow
            };

            if !first_send && !self.settings.send_delay.is_zero() {
                tokio::time::sleep(self.settings.send_delay).await;
            }
            first_send = false;

            let notice = GrantNotice::for_player(player.user_id, flag);
            debug!("Sending {:?} to {}", flag, key);
            match self
                .host
                .send_to_client(&self.settings.channel, player.user_id, &notice.encode())
                .await
            {
                Ok(()) if flag == GrantFlag::GrantNow => {
                    info!("Granted starting items to {}", key);
                    let line = ChatLine::from_server(
                        &self.settings.announcer_name,
                        grant_announcement(&player.name),
                    );
                    if let Err(e) = self.host.broadcast_chat(line).await {
                        warn!("Failed to announce reward for {}: {}", key, e);
                    }
                    report.rewarded.push(key);
                }
                Ok(()) => report.already_rewarded.push(key),
                Err(e) if flag == GrantFlag::GrantNow => {
                    warn!("Grant notice to {} not sent, retrying next scan: {}", key, e);
                    if let Err(e) = store.revoke(&key).await {
                        error!("Failed to roll back reward for {}: {}", key, e);
                    }
                    report.deferred.push(key);
                }
                Err(e) => {
                    warn!("Notice to {} not sent: {}", key, e);
                    report.already_rewarded.push(key);
                }
            }
        }

        if !report.rewarded.is_empty() || !report.deferred.is_empty() || !report.failed.is_empty()
        {
            info!(
                "Reward scan: {} rewarded, {} already rewarded, {} deferred, {} failed, \
                 {} not playing",
                report.rewarded.len(),
                report.already_rewarded.len(),
                report.deferred.len(),
                report.failed.len(),
                report.skipped
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RewardError;
    use crate::host::{ConnectedPlayer, ConnectionState, LoopbackServer};
    use crate::protocol::wire_id;
    use crate::state::{create_shared_rewarded_store, RewardedStore};
    use async_trait::async_trait;

    fn settings() -> ScanSettings {
        ScanSettings {
            channel: "test.channel".to_string(),
            send_delay: Duration::ZERO,
            announcer_name: "[SERVER]".to_string(),
        }
    }

    async fn manager_with(
        dir: &tempfile::TempDir,
        rewarded: &[(i64, &str)],
        players: Vec<ConnectedPlayer>,
    ) -> (RewardManager<LoopbackServer>, Arc<LoopbackServer>) {
        let mut store = RewardedStore::load(dir.path().join("rewarded.json"))
            .await
            .unwrap();
        for (id, name) in rewarded {
            store.record(PlayerKey::new(*id, *name)).await.unwrap();
        }
        let host = Arc::new(LoopbackServer::new(players));
        let manager =
            RewardManager::new(create_shared_rewarded_store(store), host.clone(), settings());
        (manager, host)
    }

    fn flags(host: &LoopbackServer) -> Vec<(i64, GrantFlag)> {
        host.sent()
            .iter()
            .map(|s| {
                let notice = GrantNotice::decode(&s.payload).unwrap();
                assert_eq!(notice.target_user_id, wire_id(s.user_id));
                (s.user_id, notice.flag)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_new_and_known_players() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, host) = manager_with(
            &dir,
            &[(1000, "Alice")],
            vec![
                ConnectedPlayer::playing(1000, "Alice"),
                ConnectedPlayer::playing(1001, "Bob"),
            ],
        )
        .await;

        let report = manager.scan().await.unwrap();

        assert_eq!(report.rewarded, vec![PlayerKey::new(1001, "Bob")]);
        assert_eq!(report.already_rewarded, vec![PlayerKey::new(1000, "Alice")]);
        assert_eq!(
            flags(&host),
            vec![(1000, GrantFlag::AlreadyRewarded), (1001, GrantFlag::GrantNow)]
        );

        let chat = host.chat_log();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].text, "Giving starting items to Bob");
        assert_eq!(chat[0].sender_id, -1);

        let reloaded = RewardedStore::load(dir.path().join("rewarded.json"))
            .await
            .unwrap();
        assert_eq!(
            reloaded.keys(),
            vec![PlayerKey::new(1000, "Alice"), PlayerKey::new(1001, "Bob")]
        );
    }

    #[tokio::test]
    async fn test_second_scan_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, host) = manager_with(
            &dir,
            &[],
            vec![
                ConnectedPlayer::playing(1, "Ann"),
                ConnectedPlayer::playing(2, "Ben"),
            ],
        )
        .await;

        let first = manager.scan().await.unwrap();
        assert_eq!(first.rewarded.len(), 2);
        let on_disk = std::fs::read_to_string(dir.path().join("rewarded.json")).unwrap();

        host.clear_sent();
        let second = manager.scan().await.unwrap();

        assert!(second.rewarded.is_empty());
        assert_eq!(second.already_rewarded.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("rewarded.json")).unwrap(),
            on_disk
        );
        assert!(flags(&host)
            .iter()
            .all(|(_, flag)| *flag == GrantFlag::AlreadyRewarded));
        assert_eq!(host.chat_log().len(), 2);
    }

    #[tokio::test]
    async fn test_players_still_joining_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, host) = manager_with(
            &dir,
            &[],
            vec![ConnectedPlayer {
                user_id: 5,
                name: "Loader".to_string(),
                state: ConnectionState::Loading,
            }],
        )
        .await;

        let report = manager.scan().await.unwrap();

        assert_eq!(report.skipped, 1);
        assert!(host.sent().is_empty());
        assert!(manager.store().lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_grant_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, host) =
            manager_with(&dir, &[], vec![ConnectedPlayer::playing(9, "Nia")]).await;

        host.drop_sends(9);
        let report = manager.scan().await.unwrap();
        assert_eq!(report.deferred, vec![PlayerKey::new(9, "Nia")]);
        assert!(!manager.store().lock().await.contains(&PlayerKey::new(9, "Nia")));

        host.restore_sends(9);
        let report = manager.scan().await.unwrap();
        assert_eq!(report.rewarded, vec![PlayerKey::new(9, "Nia")]);
        assert_eq!(flags(&host), vec![(9, GrantFlag::GrantNow)]);
    }

    #[tokio::test]
    async fn test_same_id_new_name_is_a_new_player() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, host) = manager_with(
            &dir,
            &[(1000, "Alice")],
            vec![ConnectedPlayer::playing(1000, "Alicia")],
        )
        .await;

        manager.scan().await.unwrap();

        assert_eq!(flags(&host), vec![(1000, GrantFlag::GrantNow)]);
        assert_eq!(manager.store().lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unsaved_player_is_retried_next_scan() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("state");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = RewardedStore::new(blocker.join("rewarded.json"));
        let host = Arc::new(LoopbackServer::new(vec![ConnectedPlayer::playing(1, "Ann")]));
        let manager =
            RewardManager::new(create_shared_rewarded_store(store), host.clone(), settings());

        let report = manager.scan().await.unwrap();
        assert_eq!(report.failed, vec![PlayerKey::new(1, "Ann")]);
        assert!(report.rewarded.is_empty());
        assert!(host.sent().is_empty());
        assert!(host.chat_log().is_empty());
        assert!(!manager.store().lock().await.contains(&PlayerKey::new(1, "Ann")));

        std::fs::remove_file(&blocker).unwrap();
        let report = manager.scan().await.unwrap();
        assert_eq!(report.rewarded, vec![PlayerKey::new(1, "Ann")]);
        assert_eq!(flags(&host), vec![(1, GrantFlag::GrantNow)]);
        assert_eq!(host.chat_log().len(), 1);
    }

    struct OfflineHost;

    #[async_trait]
    impl ServerHost for OfflineHost {
        async fn connected_players(&self) -> Result<Vec<ConnectedPlayer>> {
            Err(RewardError::host("server is shutting down"))
        }

        async fn broadcast_chat(&self, _line: ChatLine) -> Result<()> {
            Ok(())
        }

        async fn send_to_client(
            &self,
            _channel: &str,
            _user_id: i64,
            _payload: &[u8],
        ) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unreadable_roster_fails_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let store = RewardedStore::load(dir.path().join("rewarded.json"))
            .await
            .unwrap();
        let manager = RewardManager::new(
            create_shared_rewarded_store(store),
            Arc::new(OfflineHost),
            settings(),
        );

        let err = manager.scan().await.unwrap_err();

        assert!(matches!(err, RewardError::Host { .. }));
        assert!(manager.store().lock().await.is_empty());
    }
}
