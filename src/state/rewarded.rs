use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{RewardError, Result};
use crate::state::legacy;

const STORE_VERSION: u32 = 1;

/// Identity of a player: numeric user id plus display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub user_id: i64,
    pub name: String,
}

impl PlayerKey {
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }

    /// Id and name run together, as older installs stored them
    pub fn legacy_record(&self) -> String {
        format!("{}{}", self.user_id, self.name)
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.user_id)
    }
}

/// A player who already received the starter kit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardedPlayer {
    pub user_id: i64,
    pub name: String,

    /// When the kit was granted
    pub rewarded_at: DateTime<Utc>,

    /// Imported from a legacy file. The id/name split of those records is a
    /// guess, so they also match on the concatenated form.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub migrated: bool,
}

impl RewardedPlayer {
    pub fn new(key: PlayerKey) -> Self {
        Self {
            user_id: key.user_id,
            name: key.name,
            rewarded_at: Utc::now(),
            migrated: false,
        }
    }

    pub fn migrated(key: PlayerKey) -> Self {
        Self {
            migrated: true,
            ..Self::new(key)
        }
    }

    pub fn key(&self) -> PlayerKey {
        PlayerKey::new(self.user_id, self.name.clone())
    }
}

/// Persisted set of players that were already rewarded.
///
/// Records keep their insertion order on disk; lookups go through in-memory
/// indexes rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardedStore {
    /// Schema version
    pub version: u32,

    /// Last write timestamp
    pub last_updated: DateTime<Utc>,

    players: Vec<RewardedPlayer>,

    #[serde(skip)]
    index: HashSet<PlayerKey>,

    /// Concatenated `<id><name>` of every migrated record
    #[serde(skip)]
    legacy_index: HashSet<String>,

    #[serde(skip)]
    path: PathBuf,
}

impl RewardedStore {
    /// Empty store bound to `path`; nothing is written until `save`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            version: STORE_VERSION,
            last_updated: Utc::now(),
            players: Vec::new(),
            index: HashSet::new(),
            legacy_index: HashSet::new(),
            path: path.into(),
        }
    }

    /// Load from a JSON file, creating an empty one if it does not exist
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::from_json(path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No rewarded players file at {}, creating one", path.display());
                let store = Self::new(path);
                store.save().await?;
                Ok(store)
            }
            Err(e) => Err(RewardError::StateLoad {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Load the JSON store, importing a legacy `}`-delimited file the first
    /// time the store is created
    pub async fn load_or_migrate(
        path: impl AsRef<Path>,
        legacy_path: Option<&Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let store_exists = tokio::fs::try_exists(path).await.unwrap_or(false);
        let legacy_path = match legacy_path {
            Some(p) if !store_exists => p,
            _ => return Self::load(path).await,
        };

        let keys = legacy::import_file(legacy_path).await?;
        if keys.is_empty() {
            return Self::load(path).await;
        }

        info!(
            "Migrating {} rewarded players from legacy file {}",
            keys.len(),
            legacy_path.display()
        );
        let mut store = Self::new(path);
        for key in keys {
            store.append(RewardedPlayer::migrated(key));
        }
        store.save().await?;
        Ok(store)
    }

    fn from_json(path: &Path, content: &str) -> Result<Self> {
        let mut store: Self =
            serde_json::from_str(content).map_err(|e| RewardError::StateParse {
                path: path.display().to_string(),
                source: e,
            })?;
        store.path = path.to_path_buf();

        let last_updated = store.last_updated;
        let players = std::mem::take(&mut store.players);
        for player in players {
            let key = player.key();
            if !store.append(player) {
                warn!("Dropping duplicate rewarded player entry {}", key);
            }
        }
        store.last_updated = last_updated;
        Ok(store)
    }

    /// Save the whole store atomically
    pub async fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        let path = self.path.display().to_string();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RewardError::StateSave {
                    path: path.clone(),
                    source: e,
                })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| RewardError::StateSave {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| RewardError::StateSave { path, source: e })?;

        Ok(())
    }

    pub fn contains(&self, key: &PlayerKey) -> bool {
        self.index.contains(key) || self.legacy_index.contains(&key.legacy_record())
    }

    /// Insert in memory only. Returns false if the player was already present.
    pub fn append(&mut self, player: RewardedPlayer) -> bool {
        let key = player.key();
        if self.contains(&key) {
            return false;
        }
        if player.migrated {
            self.legacy_index.insert(key.legacy_record());
        }
        self.index.insert(key);
        self.players.push(player);
        self.last_updated = Utc::now();
        true
    }

    /// Append and persist. The in-memory insert is undone if the write fails.
    pub async fn record(&mut self, key: PlayerKey) -> Result<bool> {
        if !self.append(RewardedPlayer::new(key.clone())) {
            return Ok(false);
        }

        if let Err(e) = self.save().await {
            self.remove_in_memory(&key);
            return Err(e);
        }
        Ok(true)
    }

    /// Remove and persist
    pub async fn revoke(&mut self, key: &PlayerKey) -> Result<Option<RewardedPlayer>> {
        let removed = self.remove_in_memory(key);
        if removed.is_some() {
            self.save().await?;
        }
        Ok(removed)
    }

    /// Removes the exact key, or the migrated record it was stored as
    fn remove_in_memory(&mut self, key: &PlayerKey) -> Option<RewardedPlayer> {
        let pos = if self.index.contains(key) {
            self.players.iter().position(|p| p.user_id == key.user_id && p.name == key.name)
        } else {
            let record = key.legacy_record();
            self.players
                .iter()
                .position(|p| p.migrated && p.key().legacy_record() == record)
        }?;

        let player = self.players.remove(pos);
        self.index.remove(&player.key());
        if player.migrated {
            self.legacy_index.remove(&player.key().legacy_record());
        }
        self.last_updated = Utc::now();
        Some(player)
    }

    pub fn players(&self) -> &[RewardedPlayer] {
        &self.players
    }

    pub fn keys(&self) -> Vec<PlayerKey> {
        self.players.iter().map(RewardedPlayer::key).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Shared rewarded store type
pub type SharedRewardedStore = Arc<tokio::sync::Mutex<RewardedStore>>;

pub fn create_shared_rewarded_store(store: RewardedStore) -> SharedRewardedStore {
    Arc::new(tokio::sync::Mutex::new(store))
}
