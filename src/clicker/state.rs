//! Cat Tapper game state definitions.

use serde::Deserialize;

use super::levels::LevelTable;

/// Default energy ceiling when the session config does not override it.
pub const DEFAULT_MAX_ENERGY: f64 = 1000.0;

/// Length of one tick. Hourly profit and per-second regeneration are
/// defined against this step, so it is not configurable.
pub const TICK_INTERVAL_MS: u32 = 1000;

/// Why a tap was refused. A refused tap is a no-op, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapRejection {
    /// The initial remote snapshot has not been applied yet.
    Loading,
    /// `energy < tap_value`.
    LowEnergy,
    /// The host gave no user identity; input is disabled.
    NoIdentity,
}

/// Result of a single tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    Accepted { levels_gained: u32 },
    Rejected(TapRejection),
}

impl TapOutcome {
    #[cfg(test)]
    pub fn is_accepted(&self) -> bool {
        matches!(self, TapOutcome::Accepted { .. })
    }
}

/// Remote snapshot as returned by `GET /api/get_score/{user_id}`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ServerSnapshot {
    pub score: f64,
    pub energy: f64,
    pub level: u32,
    #[serde(default)]
    pub profit_per_hour: f64,
    #[serde(default)]
    pub energy_per_second: f64,
}

/// Full state of one play session.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    /// Fractional accumulator; floored only for display and saves.
    pub score: f64,
    /// Always within `0.0..=max_energy`.
    pub energy: f64,
    pub max_energy: f64,
    /// 1-based, never above the table size.
    pub level: u32,
    // Derived from `level`; only `sync_rates` writes these.
    pub tap_value: f64,
    pub profit_per_hour: f64,
    pub energy_per_second: f64,
    /// True until the first snapshot is applied or loading is abandoned.
    pub is_loading: bool,
    /// Accepted taps this session (stats only, not persisted).
    pub total_taps: u64,
    /// Ticks processed while not loading.
    pub total_ticks: u64,
}

impl GameState {
    pub fn new(table: &LevelTable, max_energy: f64) -> Self {
        let mut state = Self {
            score: 0.0,
            energy: max_energy,
            max_energy,
            level: 1,
            tap_value: 0.0,
            profit_per_hour: 0.0,
            energy_per_second: 0.0,
            is_loading: true,
            total_taps: 0,
            total_ticks: 0,
        };
        state.sync_rates(table);
        state
    }

    /// Recompute the derived rates from the current level.
    pub fn sync_rates(&mut self, table: &LevelTable) {
        let entry = table.entry(self.level);
        self.tap_value = entry.tap_value;
        self.profit_per_hour = entry.profit_per_hour;
        self.energy_per_second = entry.energy_per_second;
    }

    /// Keep energy inside `[0, max_energy]`.
    pub fn clamp_energy(&mut self) {
        self.energy = self.energy.clamp(0.0, self.max_energy);
    }

    /// Score per one-second tick from passive income.
    pub fn profit_per_tick(&self) -> f64 {
        self.profit_per_hour / 3600.0
    }
}
