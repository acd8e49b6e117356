//! Shared application state: the authoritative game session, round machine,
//! undo history, realtime bus, and storage handle.

pub mod game;
pub mod machine;
pub mod undo;

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{
    bus::EventBus,
    config::AppConfig,
    dao::snapshot_store::SnapshotStore,
    services::{timer_service::TimerController, wheel_service::WheelCoordinator},
    state::{
        game::GameSession,
        machine::{InvalidTransition, Round, RoundEvent, RoundMachine, RoundSnapshot},
        undo::UndoStack,
    },
};

/// Cheaply cloneable handle to the process-wide state.
pub type SharedState = Arc<AppState>;

/// Per-topic broadcast channel capacity.
const BUS_CAPACITY: usize = 32;

/// Liveness bookkeeping for one connected player view.
#[derive(Debug, Clone, Copy)]
pub struct PlayerPresence {
    /// When the player view attached.
    pub connected_at: Instant,
    /// Last heartbeat emission.
    pub last_ping: Instant,
}

/// Central application state. The host process is the single writer; overlay
/// and player clients only ever see broadcasts and read-only projections.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn SnapshotStore>>>,
    bus: EventBus,
    round: RwLock<RoundMachine>,
    session: RwLock<Option<GameSession>>,
    undo: Mutex<UndoStack>,
    wheel: Mutex<WheelCoordinator>,
    timer: Mutex<TimerController>,
    presence: DashMap<Uuid, PlayerPresence>,
    degraded: watch::Sender<bool>,
    host_token: Mutex<Option<String>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            bus: EventBus::new(BUS_CAPACITY),
            round: RwLock::new(RoundMachine::new()),
            session: RwLock::new(None),
            undo: Mutex::new(UndoStack::new()),
            wheel: Mutex::new(WheelCoordinator::new()),
            timer: Mutex::new(TimerController::new()),
            presence: DashMap::new(),
            degraded: degraded_tx,
            host_token: Mutex::new(None),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The realtime broadcast bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Obtain a handle to the current snapshot store, if one is installed.
    pub async fn snapshot_store(&self) -> Option<Arc<dyn SnapshotStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn set_snapshot_store(&self, store: Arc<dyn SnapshotStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current storage backend and enter degraded mode.
    pub async fn clear_snapshot_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Snapshot the current round machine state.
    pub async fn round_snapshot(&self) -> RoundSnapshot {
        self.round.read().await.snapshot()
    }

    /// The current round.
    pub async fn current_round(&self) -> Round {
        self.round.read().await.round()
    }

    /// Apply an event to the shared round machine, returning the new round.
    pub async fn apply_round_event(&self, event: RoundEvent) -> Result<Round, InvalidTransition> {
        let mut machine = self.round.write().await;
        machine.apply(event)
    }

    /// Run a closure against the (possibly absent) current session.
    pub async fn read_session<F, R>(&self, reader: F) -> R
    where
        F: FnOnce(Option<&GameSession>) -> R,
    {
        let guard = self.session.read().await;
        reader(guard.as_ref())
    }

    /// Run a closure against the mutable session slot.
    pub async fn write_session<F, R>(&self, writer: F) -> R
    where
        F: FnOnce(&mut Option<GameSession>) -> R,
    {
        let mut guard = self.session.write().await;
        writer(&mut guard)
    }

    /// Undo history of mutating host actions.
    pub fn undo(&self) -> &Mutex<UndoStack> {
        &self.undo
    }

    /// Wheel synchronization coordinator.
    pub fn wheel(&self) -> &Mutex<WheelCoordinator> {
        &self.wheel
    }

    /// Shared countdown controller.
    pub fn timer(&self) -> &Mutex<TimerController> {
        &self.timer
    }

    /// Registry of connected player views keyed by player id.
    pub fn presence(&self) -> &DashMap<Uuid, PlayerPresence> {
        &self.presence
    }

    /// Token guard that ensures a single host SSE subscriber at a time.
    pub fn host_token(&self) -> &Mutex<Option<String>> {
        &self.host_token
    }
}
