//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::time::AnimationTime;

/// Tuning knobs for the engine's tick loop and diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Frame processing budget in milliseconds. Overruns are logged, never
    /// enforced.
    pub frame_budget_ms: f64,

    /// Number of frame deltas kept in the sliding window used for the FPS
    /// estimate.
    pub fps_window: usize,

    /// How long the engine keeps reporting `is_running` after the active
    /// set drains, to avoid start/stop thrash under bursty add/remove.
    pub idle_grace: AnimationTime,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: 8.0,
            fps_window: 60,
            idle_grace: AnimationTime::from_nanos(500_000_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_serde_round_trip() {
        let cfg = EngineConfig::default();
        let s = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back.fps_window, cfg.fps_window);
        assert_eq!(back.idle_grace, cfg.idle_grace);
    }
}
