//! Hooks the game engine calls. A host integration forwards its periodic
//! update callback to `on_tick` and every payload received on the
//! registered channel to `on_message`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error};

use crate::error::{RewardError, Result};
use crate::host::{ClientHost, ServerHost};
use crate::managers::{GrantManager, GrantOutcome, RewardManager, ScanReport};

/// What the plugin registers with the host's mod messaging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub channel: String,
}

#[async_trait]
pub trait ModHooks: Send + Sync {
    fn registration(&self) -> Registration;

    async fn on_tick(&self) -> Result<()>;

    async fn on_message(&self, payload: &[u8]) -> Result<()>;
}

pub struct ServerPlugin<H: ServerHost> {
    rewards: RewardManager<H>,
    scan_interval: Duration,
    last_scan: Mutex<Option<Instant>>,
    scanning: AtomicBool,
}

impl<H: ServerHost> ServerPlugin<H> {
    pub fn new(rewards: RewardManager<H>, scan_interval: Duration) -> Self {
        Self {
            rewards,
            scan_interval,
            last_scan: Mutex::new(None),
            scanning: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn rewards(&self) -> &RewardManager<H> {
        &self.rewards
    }

    /// Run a scan if one is due. `None` when throttled or already scanning.
    pub async fn tick(&self) -> Result<Option<ScanReport>> {
        if self.scanning.swap(true, Ordering::AcqRel) {
            debug!("Reward scan still running, skipping tick");
            return Ok(None);
        }
        let _guard = ScanningGuard(&self.scanning);

        {
            let mut last = self.last_scan.lock();
            if matches!(*last, Some(at) if at.elapsed() < self.scan_interval) {
                return Ok(None);
            }
            *last = Some(Instant::now());
        }

        self.rewards.scan().await.map(Some)
    }
}

struct ScanningGuard<'a>(&'a AtomicBool);

impl Drop for ScanningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[async_trait]
impl<H: ServerHost> ModHooks for ServerPlugin<H> {
    fn registration(&self) -> Registration {
        Registration {
            channel: self.rewards.settings().channel.clone(),
        }
    }

    async fn on_tick(&self) -> Result<()> {
        self.tick().await.map(|_| ())
    }

    async fn on_message(&self, payload: &[u8]) -> Result<()> {
        debug!("Ignoring {} byte client message", payload.len());
        Ok(())
    }
}

pub struct ClientPlugin<H: ClientHost> {
    grants: GrantManager<H>,
    channel: String,
}

impl<H: ClientHost> ClientPlugin<H> {
    pub fn new(host: Arc<H>, channel: impl Into<String>) -> Self {
        Self {
            grants: GrantManager::new(host),
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl<H: ClientHost> ModHooks for ClientPlugin<H> {
    fn registration(&self) -> Registration {
        Registration {
            channel: self.channel.clone(),
        }
    }

    async fn on_tick(&self) -> Result<()> {
        Ok(())
    }

    async fn on_message(&self, payload: &[u8]) -> Result<()> {
        match self.grants.handle_notice(payload).await? {
            GrantOutcome::Granted { applied, failed } if failed > 0 => {
                Err(RewardError::host(format!(
                    "{} of {} starter kit item(s) could not be collected",
                    failed,
                    applied + failed
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Call `on_tick` every `period`, `ticks` times. Tick errors are logged.
pub async fn drive_ticks(hooks: &dyn ModHooks, period: Duration, ticks: u64) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for _ in 0..ticks {
        interval.tick().await;
        if let Err(e) = hooks.on_tick().await {
            error!("Tick failed: {}", e);
        }
    }
}
