use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::TICK_MS;
use crate::error::LevelError;
use crate::level::Level;
use crate::types::{Direction, EntityId, LevelSnapshot, MoveOutcome};

pub type SharedLevel = Arc<Mutex<Level>>;

/// Drives a level on the tokio clock. Every mutation, timer-driven or
/// caller-driven, goes through the one mutex, so moves and effect expiries
/// are serialized.
pub struct LevelRuntime {
    level: SharedLevel,
    epoch: Instant,
    driver: Option<JoinHandle<()>>,
}

impl LevelRuntime {
    pub fn new(level: Level) -> Self {
        Self {
            level: Arc::new(Mutex::new(level)),
            epoch: Instant::now(),
            driver: None,
        }
    }

    pub fn shared(&self) -> SharedLevel {
        self.level.clone()
    }

    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub async fn start(&mut self) {
        let now_ms = self.now_ms();
        {
            let mut level = self.level.lock().await;
            level.start(now_ms);
            if !level.is_in_progress() {
                return;
            }
        }
        if self
            .driver
            .as_ref()
            .is_some_and(|driver| !driver.is_finished())
        {
            return;
        }
        info!(now_ms, "level driver started");
        self.driver = Some(spawn_driver(self.level.clone(), self.epoch));
    }

    /// Once this returns, no further move is applied.
    pub async fn stop(&mut self) {
        self.level.lock().await.stop();
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }

    pub async fn wait(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        match driver.await {
            Ok(()) => {}
            Err(error) if error.is_panic() => warn!(%error, "level driver panicked"),
            Err(error) => debug!(%error, "level driver cancelled"),
        }
    }

    pub async fn move_player(
        &self,
        player: EntityId,
        direction: Direction,
    ) -> Result<MoveOutcome, LevelError> {
        let now_ms = self.now_ms();
        let mut level = self.level.lock().await;
        level.advance(now_ms);
        level.move_entity(player, direction)
    }

    pub async fn fire(&self, player: EntityId) -> Option<EntityId> {
        let now_ms = self.now_ms();
        let mut level = self.level.lock().await;
        level.advance(now_ms);
        level.fire(player)
    }

    pub async fn snapshot(&self, include_events: bool) -> LevelSnapshot {
        self.level.lock().await.snapshot(include_events)
    }
}

impl Drop for LevelRuntime {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

fn spawn_driver(level: SharedLevel, epoch: Instant) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let now_ms = epoch.elapsed().as_millis() as u64;
            let mut guard = level.lock().await;
            guard.advance(now_ms);
            if !guard.is_in_progress() {
                debug!(now_ms, outcome = ?guard.outcome(), "level driver exiting");
                break;
            }
        }
    })
}
