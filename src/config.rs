//! Application-level configuration loading, including the game rules and
//! the sound cue catalog used by the overlay.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_ROYALE_CONFIG_PATH";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Round progression rules.
    pub rules: GameRules,
    /// Minimum delay the host must wait between two wheel spins.
    pub wheel_cooldown: Duration,
    /// Interval between heartbeat pings emitted for connected players.
    pub heartbeat_interval: Duration,
    /// Countdown tick resolution used by the shared timer.
    pub timer_tick: Duration,
    /// Named sound cues the host can trigger on the overlay.
    pub sound_cues: Vec<String>,
}

/// Thresholds driving round advancement and the round-one cut.
#[derive(Debug, Clone)]
pub struct GameRules {
    /// Number of players eliminated during round one. Round one can end once
    /// the alive count drops to `eliminate_count + 1`.
    pub eliminate_count: usize,
    /// Number of top-scoring players kept when cutting into round two.
    pub round_two_survivors: usize,
    /// Whether one extra player below the cut line is retained.
    pub lucky_loser: bool,
    /// Whether point awards may push a score below zero.
    pub allow_negative_points: bool,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        cues = config.sound_cues.len(),
                        "loaded configuration from file"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Whether the given cue name exists in the configured catalog.
    pub fn has_sound_cue(&self, cue: &str) -> bool {
        self.sound_cues.iter().any(|known| known == cue)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            wheel_cooldown: Duration::from_millis(3_000),
            heartbeat_interval: Duration::from_secs(30),
            timer_tick: Duration::from_millis(100),
            sound_cues: default_sound_cues(),
        }
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            eliminate_count: 4,
            round_two_survivors: 4,
            lucky_loser: true,
            allow_negative_points: true,
        }
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    rules: RawRules,
    wheel_cooldown_ms: Option<u64>,
    heartbeat_interval_secs: Option<u64>,
    timer_tick_ms: Option<u64>,
    sound_cues: Option<Vec<String>>,
}

/// JSON representation of the round rules block.
#[derive(Debug, Default, Deserialize)]
struct RawRules {
    eliminate_count: Option<usize>,
    round_two_survivors: Option<usize>,
    lucky_loser: Option<bool>,
    allow_negative_points: Option<bool>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let rule_defaults = GameRules::default();

        Self {
            rules: GameRules {
                eliminate_count: value
                    .rules
                    .eliminate_count
                    .unwrap_or(rule_defaults.eliminate_count),
                round_two_survivors: value
                    .rules
                    .round_two_survivors
                    .unwrap_or(rule_defaults.round_two_survivors),
                lucky_loser: value.rules.lucky_loser.unwrap_or(rule_defaults.lucky_loser),
                allow_negative_points: value
                    .rules
                    .allow_negative_points
                    .unwrap_or(rule_defaults.allow_negative_points),
            },
            wheel_cooldown: value
                .wheel_cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.wheel_cooldown),
            heartbeat_interval: value
                .heartbeat_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            timer_tick: value
                .timer_tick_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timer_tick),
            sound_cues: value.sound_cues.unwrap_or(defaults.sound_cues),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in sound cue catalog shipped with the binary.
fn default_sound_cues() -> Vec<String> {
    [
        "correct_answer",
        "wrong_answer",
        "player_eliminated",
        "card_awarded",
        "card_used",
        "wheel_spin",
        "wheel_stop",
        "timer_tick",
        "timer_end",
        "round_start",
        "drumroll",
        "fanfare",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
