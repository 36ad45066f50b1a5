use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::host::ClientHost;
use crate::kit::{ItemGrant, STARTER_KIT};
use crate::protocol::{wire_id, GrantFlag, GrantNotice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// Addressed to another player, or the local player is unknown
    NotForUs,
    AlreadyRewarded,
    Granted { applied: usize, failed: usize },
}

/// Client side of the starter kit: applies the kit when the server says so
pub struct GrantManager<H: ClientHost> {
    host: Arc<H>,
    kit: &'static [ItemGrant],
}

impl<H: ClientHost> GrantManager<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            kit: STARTER_KIT,
        }
    }

    pub async fn handle_notice(&self, payload: &[u8]) -> Result<GrantOutcome> {
        let notice = GrantNotice::decode(payload)?;

        match self.host.local_user_id() {
            Some(id) if wire_id(id) == notice.target_user_id => {}
            _ => {
                debug!("Ignoring notice for user {}", notice.target_user_id);
                return Ok(GrantOutcome::NotForUs);
            }
        }

        if notice.flag == GrantFlag::AlreadyRewarded {
            return Ok(GrantOutcome::AlreadyRewarded);
        }

        let mut applied = 0;
        let mut failed = 0;
        for grant in self.kit {
            match self.host.collect_item(grant).await {
                Ok(()) => applied += 1,
                Err(e) => {
                    error!("Failed to collect {}: {}", grant, e);
                    failed += 1;
                }
            }
        }

        info!("Collected starting items ({} granted, {} failed)", applied, failed);
        Ok(GrantOutcome::Granted { applied, failed })
    }
}
