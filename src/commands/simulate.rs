use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::commands::open_store;
use crate::config::PluginConfig;
use crate::error::{RewardError, Result};
use crate::host::{ChatLine, ConnectedPlayer, LoopbackClient, LoopbackServer};
use crate::kit::ItemGrant;
use crate::managers::{RewardManager, ScanSettings};
use crate::plugin::{drive_ticks, ClientPlugin, ServerPlugin};
use crate::protocol::GrantNotice;
use crate::state::{create_shared_rewarded_store, PlayerKey, RewardedStore};

/// Players connected to the simulated server
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Roster {
    pub players: Vec<ConnectedPlayer>,

    /// User ids whose notices the network drops
    #[serde(default)]
    pub drop_sends_for: Vec<i64>,
}

impl Roster {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| RewardError::ConfigLoad {
            path: display.clone(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| RewardError::ConfigParse {
            path: display,
            source: e,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationSummary {
    pub chat: Vec<ChatLine>,
    pub notices: Vec<GrantNotice>,
    pub inventories: BTreeMap<i64, Vec<ItemGrant>>,
    pub rewarded: Vec<PlayerKey>,
}

/// Run the server and client plugins over an in-process host.
///
/// The configured store is copied to `scratch` first so the real file is
/// never touched.
pub async fn simulate(
    config: &PluginConfig,
    roster: &Roster,
    ticks: u64,
    scratch: &Path,
) -> Result<SimulationSummary> {
    let real = open_store(config).await?;
    let mut store = RewardedStore::new(scratch);
    for player in real.players() {
        store.append(player.clone());
    }
    store.save().await?;

    let host = Arc::new(LoopbackServer::new(roster.players.clone()));
    let mut clients = BTreeMap::new();
    for player in &roster.players {
        let client = Arc::new(LoopbackClient::new(player.user_id));
        host.attach_client(
            player.user_id,
            Arc::new(ClientPlugin::new(client.clone(), config.channel.clone())),
        );
        clients.insert(player.user_id, client);
    }
    for user_id in &roster.drop_sends_for {
        host.drop_sends(*user_id);
    }

    let settings = ScanSettings {
        channel: config.channel.clone(),
        send_delay: config.send_delay(),
        announcer_name: config.announcer_name.clone(),
    };
    let rewards = RewardManager::new(create_shared_rewarded_store(store), host.clone(), settings);
    let shared = rewards.store().clone();
    let server = ServerPlugin::new(rewards, config.scan_interval());

    info!(
        "Simulating {} tick(s) with {} connected player(s)",
        ticks,
        roster.players.len()
    );
    drive_ticks(&server, config.scan_interval(), ticks).await;

    let notices = host
        .sent()
        .iter()
        .map(|sent| GrantNotice::decode(&sent.payload))
        .collect::<Result<Vec<_>>>()?;
    let inventories = clients
        .into_iter()
        .map(|(id, client)| (id, client.inventory()))
        .collect();
    let rewarded = shared.lock().await.keys();

    Ok(SimulationSummary {
        chat: host.chat_log(),
        notices,
        inventories,
        rewarded,
    })
}

pub fn default_scratch_path() -> PathBuf {
    std::env::temp_dir().join("starting-items-simulation.json")
}
