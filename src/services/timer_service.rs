//! Shared countdown timer.
//!
//! The authoritative remaining time is always derived from the start instant
//! and the full duration, never from accumulated ticks, so a stalled or
//! coalesced tick cannot make the countdown drift. A background task
//! broadcasts the derived state at the configured resolution and stops
//! itself exactly once when the countdown reaches zero.

use std::time::Duration;

use tokio::{task::JoinHandle, time::Instant};
use tracing::info;

use crate::{
    dto::game::TimerSnapshot,
    services::event_service,
    state::SharedState,
};

/// State of the shared countdown.
pub struct TimerController {
    generation: u64,
    running: Option<RunningTimer>,
}

struct RunningTimer {
    started_at: Instant,
    duration: Duration,
    task: JoinHandle<()>,
}

impl TimerController {
    /// Fresh idle controller.
    pub fn new() -> Self {
        Self {
            generation: 0,
            running: None,
        }
    }

    /// Whether a countdown is in flight.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Remaining time in milliseconds, zero when idle.
    pub fn remaining_ms(&self) -> u64 {
        self.running
            .as_ref()
            .map(|timer| remaining_ms(timer.started_at, timer.duration, Instant::now()))
            .unwrap_or(0)
    }

    /// Read-only snapshot for late joiners.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            running: self.is_running(),
            remaining_ms: self.remaining_ms(),
        }
    }

    fn install(&mut self, started_at: Instant, duration: Duration, task: JoinHandle<()>) -> u64 {
        if let Some(previous) = self.running.take() {
            previous.task.abort();
        }
        self.generation += 1;
        self.running = Some(RunningTimer {
            started_at,
            duration,
            task,
        });
        self.generation
    }

    fn stop_if_current(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        match self.running.take() {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }
}

impl Default for TimerController {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock remaining time. Derived from the start instant so that stalled
/// ticks never accumulate into drift.
pub fn remaining_ms(started_at: Instant, duration: Duration, now: Instant) -> u64 {
    duration
        .saturating_sub(now.saturating_duration_since(started_at))
        .as_millis() as u64
}

/// Start (or restart) the shared countdown.
///
/// A countdown already in flight is replaced; its completion is superseded
/// and will never fire.
pub async fn start(state: &SharedState, seconds: u64) {
    let duration = Duration::from_secs(seconds);
    let started_at = Instant::now();

    let mut controller = state.timer().lock().await;
    let task_state = state.clone();
    // The generation the task runs under is assigned by install(); announce
    // after installing so the broadcast reflects the new countdown.
    let generation = controller.generation + 1;
    let task = tokio::spawn(async move {
        run_countdown(task_state, generation, started_at, duration).await;
    });
    controller.install(started_at, duration, task);
    drop(controller);

    info!(seconds, "countdown started");
    event_service::broadcast_timer_started(state, seconds);
    event_service::broadcast_timer_state(state, true, duration.as_millis() as u64);
}

/// Stop the countdown. Returns whether one was running.
pub async fn stop(state: &SharedState) -> bool {
    let stopped = {
        let mut controller = state.timer().lock().await;
        let generation = controller.generation;
        controller.stop_if_current(generation)
    };
    if stopped {
        info!("countdown stopped by host");
        event_service::broadcast_timer_stopped(state);
        event_service::broadcast_timer_state(state, false, 0);
    }
    stopped
}

/// Current countdown state for late joiners.
pub async fn snapshot(state: &SharedState) -> TimerSnapshot {
    state.timer().lock().await.snapshot()
}

async fn run_countdown(
    state: SharedState,
    generation: u64,
    started_at: Instant,
    duration: Duration,
) {
    let mut interval = tokio::time::interval(state.config().timer_tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick resolves immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let remaining = remaining_ms(started_at, duration, Instant::now());
        if remaining == 0 {
            // Stop through the controller so a restart that won the race
            // keeps its own countdown untouched.
            let completed = {
                let mut controller = state.timer().lock().await;
                controller.stop_if_current(generation)
            };
            if completed {
                info!("countdown completed");
                event_service::broadcast_timer_stopped(&state);
                event_service::broadcast_timer_state(&state, false, 0);
            }
            return;
        }
        event_service::broadcast_timer_state(&state, true, remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bus::Topic, config::AppConfig, state::AppState};

    #[test]
    fn remaining_is_derived_from_wall_clock_not_ticks() {
        let start = Instant::now();
        let duration = Duration::from_secs(30);

        // A stalled tick loop observes the same remaining time a healthy one
        // would at the same instant.
        let after_stall = start + Duration::from_secs(12);
        assert_eq!(remaining_ms(start, duration, after_stall), 18_000);

        let past_end = start + Duration::from_secs(31);
        assert_eq!(remaining_ms(start, duration, past_end), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_tracks_virtual_time() {
        let state = AppState::new(AppConfig::default());
        start(&state, 30).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        let snapshot = snapshot(&state).await;
        assert!(snapshot.running);
        assert_eq!(snapshot.remaining_ms, 20_000);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_fires_exactly_once() {
        let state = AppState::new(AppConfig::default());
        let mut rx = state.bus().subscribe(Topic::GameEvents);
        start(&state, 1).await;

        // Run past the end several times; only one timer_stopped may appear.
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }

        let mut stopped = 0;
        while let Ok(event) = rx.try_recv() {
            if event.data.contains("timer_stopped") {
                stopped += 1;
            }
        }
        assert_eq!(stopped, 1);
        assert!(!state.timer().lock().await.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_running_countdown() {
        let state = AppState::new(AppConfig::default());
        start(&state, 5).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        start(&state, 60).await;
        let snapshot = snapshot(&state).await;
        assert_eq!(snapshot.remaining_ms, 60_000);
    }

    #[tokio::test]
    async fn stop_is_a_noop_when_idle() {
        let state = AppState::new(AppConfig::default());
        assert!(!stop(&state).await);
    }
}
