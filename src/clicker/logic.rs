//! Cat Tapper progression rules. Pure functions, fully testable.

use tracing::debug;

use super::levels::LevelTable;
use super::state::{GameState, ServerSnapshot, TapOutcome, TapRejection};

/// Spend energy for score. Rejected (and nothing changes) while loading or
/// when energy does not cover one tap.
pub fn tap(state: &mut GameState, table: &LevelTable) -> TapOutcome {
    if state.is_loading {
        return TapOutcome::Rejected(TapRejection::Loading);
    }
    if state.energy < state.tap_value {
        return TapOutcome::Rejected(TapRejection::LowEnergy);
    }
    state.energy -= state.tap_value;
    state.score += state.tap_value;
    state.total_taps += 1;
    state.clamp_energy();
    let levels_gained = level_up_if_eligible(state, table);
    TapOutcome::Accepted { levels_gained }
}

/// One fixed one-second step: passive income plus energy regeneration.
/// Returns the number of levels gained.
pub fn tick(state: &mut GameState, table: &LevelTable) -> u32 {
    if state.is_loading {
        return 0;
    }
    state.score += state.profit_per_tick();
    state.energy = (state.energy + state.energy_per_second).min(state.max_energy);
    state.clamp_energy();
    state.total_ticks += 1;
    level_up_if_eligible(state, table)
}

/// Advance through every threshold the score has crossed, one level per step,
/// refreshing the derived rates. Returns the number of levels gained.
pub fn level_up_if_eligible(state: &mut GameState, table: &LevelTable) -> u32 {
    let mut gained = 0;
    while let Some(threshold) = table.threshold(state.level) {
        if state.score < threshold {
            break;
        }
        state.level += 1;
        gained += 1;
    }
    if gained > 0 {
        state.sync_rates(table);
    }
    gained
}

/// Overwrite the state with the remote snapshot and open the loading gate.
///
/// Only honoured while loading; later snapshots are ignored and `false` is
/// returned. Derived rates always come from the table, never from the wire.
pub fn apply_server_snapshot(
    state: &mut GameState,
    table: &LevelTable,
    snapshot: &ServerSnapshot,
) -> bool {
    if !state.is_loading {
        return false;
    }
    state.score = if snapshot.score.is_finite() && snapshot.score > 0.0 {
        snapshot.score
    } else {
        0.0
    };
    state.energy = if snapshot.energy.is_finite() {
        snapshot.energy
    } else {
        0.0
    };
    state.clamp_energy();
    state.level = table.clamp_level(snapshot.level);
    state.sync_rates(table);

    if snapshot.profit_per_hour != state.profit_per_hour
        || snapshot.energy_per_second != state.energy_per_second
    {
        debug!(
            level = state.level,
            remote_profit = snapshot.profit_per_hour,
            remote_energy_rate = snapshot.energy_per_second,
            "snapshot rates differ from level table; using table"
        );
    }

    state.is_loading = false;
    level_up_if_eligible(state, table);
    true
}

/// Open the loading gate without a snapshot (load failed or no identity).
pub fn finish_loading(state: &mut GameState) {
    state.is_loading = false;
}

/// Progress toward the next level, 0..=100. Full at the top level.
pub fn progress_percent(state: &GameState, table: &LevelTable) -> f64 {
    match table.threshold(state.level) {
        Some(threshold) if threshold > 0.0 => (state.score / threshold * 100.0).clamp(0.0, 100.0),
        _ => 100.0,
    }
}

/// Score needed to leave the current level, or `None` at the top.
pub fn level_up_cost(state: &GameState, table: &LevelTable) -> Option<f64> {
    table.threshold(state.level)
}

const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Compact magnitude (e.g. 1500 → "1.5K", 2_000_000 → "2M").
///
/// Below 1000 the value is floored to a plain integer. Above, one decimal is
/// kept by truncation so a value never displays as the next unit's "1000".
pub fn format_compact(n: f64) -> String {
    if n.is_nan() {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞".to_string() } else { "-∞".to_string() };
    }
    if n < 0.0 {
        return format!("-{}", format_compact(-n));
    }
    for (unit, suffix) in SUFFIXES {
        if n >= unit {
            let mut scaled = ((n / unit) * 10.0 + 1e-9).floor() / 10.0;
            if unit < 1e12 {
                scaled = scaled.min(999.9);
            }
            return if scaled.fract() == 0.0 {
                format!("{:.0}{}", scaled, suffix)
            } else {
                format!("{:.1}{}", scaled, suffix)
            };
        }
    }
    // `+ 0.0` turns -0.0 into 0.0 so it never prints as "-0".
    format!("{:.0}", n.floor() + 0.0)
}
