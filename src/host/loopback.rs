//! In-process host: the server side keeps a roster and delivers notices
//! straight to registered client plugins.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{RewardError, Result};
use crate::host::{ChatLine, ClientHost, ConnectedPlayer, ServerHost};
use crate::kit::{CubeType, ItemGrant};
use crate::plugin::ModHooks;

/// A payload the server handed to the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotice {
    pub channel: String,
    pub user_id: i64,
    pub payload: Vec<u8>,
}

#[derive(Default)]
pub struct LoopbackServer {
    players: Mutex<Vec<ConnectedPlayer>>,
    chat: Mutex<Vec<ChatLine>>,
    sent: Mutex<Vec<SentNotice>>,
    drop_sends_for: Mutex<HashSet<i64>>,
    clients: Mutex<HashMap<i64, Arc<dyn ModHooks>>>,
}

impl LoopbackServer {
    pub fn new(players: Vec<ConnectedPlayer>) -> Self {
        Self {
            players: Mutex::new(players),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn connect(&self, player: ConnectedPlayer) {
        self.players.lock().push(player);
    }

    /// Attach a client plugin that receives notices addressed to `user_id`
    pub fn attach_client(&self, user_id: i64, client: Arc<dyn ModHooks>) {
        self.clients.lock().insert(user_id, client);
    }

    /// Make every send to `user_id` fail until `restore_sends` is called
    pub fn drop_sends(&self, user_id: i64) {
        self.drop_sends_for.lock().insert(user_id);
    }

    pub fn restore_sends(&self, user_id: i64) {
        self.drop_sends_for.lock().remove(&user_id);
    }

    pub fn chat_log(&self) -> Vec<ChatLine> {
        self.chat.lock().clone()
    }

    pub fn sent(&self) -> Vec<SentNotice> {
        self.sent.lock().clone()
    }

    #[cfg(test)]
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl ServerHost for LoopbackServer {
    async fn connected_players(&self) -> Result<Vec<ConnectedPlayer>> {
        Ok(self.players.lock().clone())
    }

    async fn broadcast_chat(&self, line: ChatLine) -> Result<()> {
        debug!("[chat] {}: {}", line.sender_name, line.text);
        self.chat.lock().push(line);
        Ok(())
    }

    async fn send_to_client(&self, channel: &str, user_id: i64, payload: &[u8]) -> Result<()> {
        let dropped = self.drop_sends_for.lock().contains(&user_id);
        if dropped {
            return Err(RewardError::host(format!(
                "connection to {} dropped the message",
                user_id
            )));
        }

        self.sent.lock().push(SentNotice {
            channel: channel.to_string(),
            user_id,
            payload: payload.to_vec(),
        });

        let client = self.clients.lock().get(&user_id).cloned();
        if let Some(client) = client {
            if client.registration().channel == channel {
                // Client failures never travel back to the server
                if let Err(e) = client.on_message(payload).await {
                    warn!("Client {} failed to handle message: {}", user_id, e);
                }
            }
        }
        Ok(())
    }
}

pub struct LoopbackClient {
    user_id: Option<i64>,
    inventory: Mutex<Vec<ItemGrant>>,
    failing_cube: Option<CubeType>,
}

impl LoopbackClient {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            inventory: Mutex::new(Vec::new()),
            failing_cube: None,
        }
    }

    /// A client that has not finished joining yet
    #[cfg(test)]
    pub fn unjoined() -> Self {
        Self {
            user_id: None,
            inventory: Mutex::new(Vec::new()),
            failing_cube: None,
        }
    }

    /// Refuse every grant of `cube`, e.g. a full inventory slot
    #[cfg(test)]
    pub fn with_failing_cube(mut self, cube: CubeType) -> Self {
        self.failing_cube = Some(cube);
        self
    }

    pub fn inventory(&self) -> Vec<ItemGrant> {
        self.inventory.lock().clone()
    }
}

#[async_trait]
impl ClientHost for LoopbackClient {
    fn local_user_id(&self) -> Option<i64> {
        self.user_id
    }

    async fn collect_item(&self, grant: &ItemGrant) -> Result<()> {
        if self.failing_cube == Some(grant.cube) {
            return Err(RewardError::host(format!("inventory rejected {}", grant)));
        }
        self.inventory.lock().push(*grant);
        Ok(())
    }
}
