//! In-memory registry of hosted players.
//!
//! Each player with a pending timer gets a tokio task that ticks it once
//! per interval. The task ends once no timed session is left counting down
//! and is aborted when the player is removed. A retry or reset that brings
//! a countdown back restarts it through [`PlayerStore::ensure_ticker`].
//!
//! Players are never evicted: clients own their lifetime and must
//! `DELETE /api/players/:id` when done.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use exercise_core::Player;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub type SharedPlayer = Arc<Mutex<Player>>;

struct PlayerEntry {
    player: SharedPlayer,
    created_at: DateTime<Utc>,
    ticker: Option<JoinHandle<()>>,
}

pub struct PlayerStore {
    players: RwLock<HashMap<Uuid, PlayerEntry>>,
    tick_interval: Duration,
}

impl PlayerStore {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            tick_interval,
        }
    }

    /// Register a player and start its timer task when it needs one.
    pub async fn insert(&self, player: Player) -> (Uuid, DateTime<Utc>) {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let has_timer = player.timer_pending();
        let player = Arc::new(Mutex::new(player));
        let ticker = has_timer.then(|| self.spawn_ticker(id, &player));

        self.players.write().await.insert(
            id,
            PlayerEntry {
                player,
                created_at,
                ticker,
            },
        );
        tracing::info!(%id, has_timer, "player created");
        (id, created_at)
    }

    pub async fn get(&self, id: Uuid) -> Option<(SharedPlayer, DateTime<Utc>)> {
        self.players
            .read()
            .await
            .get(&id)
            .map(|entry| (entry.player.clone(), entry.created_at))
    }

    /// Remove a player and cancel its timer task.
    pub async fn remove(&self, id: Uuid) -> bool {
        let Some(entry) = self.players.write().await.remove(&id) else {
            return false;
        };
        if let Some(ticker) = entry.ticker {
            ticker.abort();
        }
        tracing::info!(%id, "player removed");
        true
    }

    /// Start a timer task for a player whose countdown is pending again,
    /// e.g. after a retry or a reset.
    pub async fn ensure_ticker(&self, id: Uuid) {
        let mut players = self.players.write().await;
        let Some(entry) = players.get_mut(&id) else {
            return;
        };
        let running = entry.ticker.as_ref().is_some_and(|t| !t.is_finished());
        if running || !entry.player.lock().await.timer_pending() {
            return;
        }
        entry.ticker = Some(self.spawn_ticker(id, &entry.player));
    }

    pub async fn ticker_running(&self, id: Uuid) -> bool {
        self.players
            .read()
            .await
            .get(&id)
            .and_then(|entry| entry.ticker.as_ref())
            .is_some_and(|ticker| !ticker.is_finished())
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    fn spawn_ticker(&self, id: Uuid, player: &SharedPlayer) -> JoinHandle<()> {
        let player = Arc::downgrade(player);
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(player) = player.upgrade() else {
                    break;
                };
                let mut player = player.lock().await;
                if player.tick() {
                    tracing::debug!(%id, "player timed out");
                }
                if !player.timer_pending() {
                    tracing::debug!(%id, "player timer finished");
                    break;
                }
            }
        })
    }
}

impl Drop for PlayerStore {
    fn drop(&mut self) {
        for entry in self.players.get_mut().values_mut() {
            if let Some(ticker) = entry.ticker.take() {
                ticker.abort();
            }
        }
    }
}
