//! Category wheel coordination.
//!
//! The backend keeps an optimistic local wheel state and broadcasts every
//! transition on the `wheel_events` topic, so the host, overlay, and player
//! views all animate the same spin.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::{
    dto::{
        events::{WheelSyncEvent, WheelSyncKind},
        game::WheelSnapshot,
    },
    error::{ServiceError, ServiceResult},
    services::event_service,
    state::SharedState,
};

/// Local authoritative wheel state.
#[derive(Debug)]
pub struct WheelCoordinator {
    spinning: bool,
    selected_category: Option<String>,
    last_spin_started: Option<Instant>,
}

impl WheelCoordinator {
    /// Fresh idle wheel.
    pub fn new() -> Self {
        Self {
            spinning: false,
            selected_category: None,
            last_spin_started: None,
        }
    }

    /// Whether a spin is currently in flight.
    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    /// Category selected by the last completed spin.
    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    /// Time left before a new spin is allowed, `None` once the cooldown
    /// elapsed (or before the first spin).
    pub fn cooldown_remaining(&self, cooldown: Duration) -> Option<Duration> {
        let started = self.last_spin_started?;
        cooldown.checked_sub(started.elapsed()).filter(|left| !left.is_zero())
    }

    /// Start a spin. The local state is set optimistically before the
    /// broadcast so a concurrent second trigger observes `spinning` and
    /// gets rejected instead of racing the bus.
    pub fn begin_spin(&mut self) -> Result<WheelSyncEvent, SpinInFlight> {
        if self.spinning {
            return Err(SpinInFlight);
        }
        self.spinning = true;
        self.selected_category = None;
        self.last_spin_started = Some(Instant::now());
        Ok(WheelSyncEvent::of_kind(WheelSyncKind::WheelSpin))
    }

    /// Finish the spin with the category the wheel landed on.
    ///
    /// Returns the stop event followed by the selection event; callers must
    /// publish them in that order so no subscriber ever observes a selected
    /// category while the wheel still spins.
    pub fn finish_spin(&mut self, category: String) -> [WheelSyncEvent; 2] {
        self.spinning = false;
        self.selected_category = Some(category.clone());
        let stop = WheelSyncEvent::of_kind(WheelSyncKind::WheelStop);
        let mut selected = WheelSyncEvent::of_kind(WheelSyncKind::CategorySelected);
        selected.category = Some(category);
        [stop, selected]
    }

    /// Clear spin and selection state. The cooldown window is kept so a
    /// reset cannot be used to bypass it.
    pub fn clear(&mut self) -> WheelSyncEvent {
        self.spinning = false;
        self.selected_category = None;
        WheelSyncEvent::of_kind(WheelSyncKind::WheelReset)
    }

    /// Read-only snapshot for late joiners.
    pub fn snapshot(&self) -> WheelSnapshot {
        WheelSnapshot {
            spinning: self.spinning,
            selected_category: self.selected_category.clone(),
        }
    }
}

impl Default for WheelCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// A spin was triggered while another one was already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinInFlight;

/// Trigger a wheel spin and broadcast it.
///
/// Rejects with [`ServiceError::Busy`] while a spin is in flight or the
/// configured cooldown since the previous spin has not elapsed.
pub async fn trigger_spin(state: &SharedState) -> ServiceResult<()> {
    let event = {
        let mut wheel = state.wheel().lock().await;
        if wheel.is_spinning() {
            return Err(ServiceError::Busy("a wheel spin is already in flight".into()));
        }
        if let Some(left) = wheel.cooldown_remaining(state.config().wheel_cooldown) {
            debug!(remaining_ms = left.as_millis() as u64, "wheel spin rejected by cooldown");
            return Err(ServiceError::Busy("wheel spin cooldown has not elapsed".into()));
        }
        match wheel.begin_spin() {
            Ok(event) => event,
            Err(SpinInFlight) => {
                return Err(ServiceError::Busy("a wheel spin is already in flight".into()));
            }
        }
    };
    event_service::broadcast_wheel(state, &event);
    Ok(())
}

/// Complete the current spin with the category the wheel landed on, and
/// broadcast the stop followed by the selection.
pub async fn complete_spin(state: &SharedState, category: String) -> ServiceResult<()> {
    let events = {
        let mut wheel = state.wheel().lock().await;
        wheel.finish_spin(category)
    };
    for event in &events {
        event_service::broadcast_wheel(state, event);
    }
    Ok(())
}

/// Clear the wheel state and broadcast the reset.
pub async fn reset_wheel(state: &SharedState) {
    let event = {
        let mut wheel = state.wheel().lock().await;
        wheel.clear()
    };
    event_service::broadcast_wheel(state, &event);
}

/// Current wheel state for late joiners.
pub async fn snapshot(state: &SharedState) -> WheelSnapshot {
    state.wheel().lock().await.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bus::Topic, config::AppConfig, state::AppState};

    #[test]
    fn second_spin_is_rejected_while_in_flight() {
        let mut wheel = WheelCoordinator::new();
        assert!(wheel.begin_spin().is_ok());
        assert!(matches!(wheel.begin_spin(), Err(SpinInFlight)));
        assert!(wheel.is_spinning());
    }

    #[test]
    fn finish_emits_stop_before_selection() {
        let mut wheel = WheelCoordinator::new();
        wheel.begin_spin().unwrap();

        let [first, second] = wheel.finish_spin("history".into());
        assert_eq!(first.kind, WheelSyncKind::WheelStop);
        assert_eq!(second.kind, WheelSyncKind::CategorySelected);
        assert_eq!(second.category.as_deref(), Some("history"));
        assert!(!wheel.is_spinning());
        assert_eq!(wheel.selected_category(), Some("history"));
    }

    #[test]
    fn cooldown_blocks_until_elapsed() {
        let mut wheel = WheelCoordinator::new();
        assert!(wheel.cooldown_remaining(Duration::from_secs(3)).is_none());

        wheel.begin_spin().unwrap();
        wheel.finish_spin("music".into());
        assert!(wheel.cooldown_remaining(Duration::from_secs(3)).is_some());
        assert!(wheel.cooldown_remaining(Duration::ZERO).is_none());
    }

    #[test]
    fn clear_forgets_selection_but_keeps_cooldown() {
        let mut wheel = WheelCoordinator::new();
        wheel.begin_spin().unwrap();
        wheel.finish_spin("sports".into());

        let event = wheel.clear();
        assert_eq!(event.kind, WheelSyncKind::WheelReset);
        assert_eq!(wheel.selected_category(), None);
        assert!(wheel.cooldown_remaining(Duration::from_secs(60)).is_some());
    }

    #[tokio::test]
    async fn concurrent_triggers_broadcast_a_single_spin() {
        let state = AppState::new(AppConfig::default());
        let mut rx = state.bus().subscribe(Topic::WheelEvents);

        let first = trigger_spin(&state).await;
        let second = trigger_spin(&state).await;
        assert!(first.is_ok());
        assert!(matches!(second, Err(ServiceError::Busy(_))));

        let event = rx.recv().await.unwrap();
        assert!(event.data.contains("wheel_spin"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn complete_spin_broadcasts_stop_then_selection() {
        let state = AppState::new(AppConfig::default());
        trigger_spin(&state).await.unwrap();

        let mut rx = state.bus().subscribe(Topic::WheelEvents);
        complete_spin(&state, "geography".into()).await.unwrap();

        let stop = rx.recv().await.unwrap();
        let selected = rx.recv().await.unwrap();
        assert!(stop.data.contains("wheel_stop"));
        assert!(selected.data.contains("category_selected"));
        assert!(selected.data.contains("geography"));
    }
}
