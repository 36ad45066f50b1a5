//! Boundary to the game engine. An integration implements `ServerHost` on
//! the server and `ClientHost` on the client, then forwards its update and
//! message callbacks to a `plugin::ModHooks` implementation.

pub mod loopback;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::kit::ItemGrant;

pub use loopback::{LoopbackClient, LoopbackServer};

/// Connection lifecycle as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Loading,
    Playing,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedPlayer {
    pub user_id: i64,
    pub name: String,
    pub state: ConnectionState,
}

impl ConnectedPlayer {
    #[cfg(test)]
    pub fn playing(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            state: ConnectionState::Playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == ConnectionState::Playing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Normal,
}

/// A line for the shared chat channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    /// Sending player id, -1 for the server itself
    pub sender_id: i64,
    pub sender_name: String,
    pub text: String,
    pub kind: ChatKind,
}

impl ChatLine {
    pub fn from_server(sender_name: &str, text: String) -> Self {
        Self {
            sender_id: -1,
            sender_name: sender_name.to_string(),
            text,
            kind: ChatKind::Normal,
        }
    }
}

#[async_trait]
pub trait ServerHost: Send + Sync {
    /// Every player with an open connection, in connection order
    async fn connected_players(&self) -> Result<Vec<ConnectedPlayer>>;

    async fn broadcast_chat(&self, line: ChatLine) -> Result<()>;

    /// Queue `payload` for one client on a registered channel. An error means
    /// the host knows the message was not sent.
    async fn send_to_client(&self, channel: &str, user_id: i64, payload: &[u8]) -> Result<()>;
}

#[async_trait]
pub trait ClientHost: Send + Sync {
    /// Id of the local player, `None` until the client has joined
    fn local_user_id(&self) -> Option<i64>;

    async fn collect_item(&self, grant: &ItemGrant) -> Result<()>;
}
