//! Read-only projection of the game state for whatever paints it.

use std::cell::RefCell;
use std::rc::Rc;

use super::levels::{CatSkin, LevelTable};
use super::logic::{format_compact, level_up_cost, progress_percent};
use super::state::GameState;

/// Which screen the HUD should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HudStatus {
    /// Waiting for the remote snapshot; taps are ignored.
    Loading,
    /// The host supplied no identity; play is local and unsaved.
    HostUnavailable,
    Ready,
}

/// Everything a render sink needs, already formatted.
#[derive(Clone, Debug, PartialEq)]
pub struct HudView {
    pub status: HudStatus,
    pub score_text: String,
    /// `"energy/max"`, both floored.
    pub energy_text: String,
    /// Energy fill, 0.0..=1.0.
    pub energy_ratio: f64,
    /// Progress toward the next level, 0..=100.
    pub progress_percent: f64,
    pub tap_value_text: String,
    /// Score needed to leave the level, `"MAX"` at the top.
    pub level_up_cost_text: String,
    pub profit_text: String,
    pub level_name: &'static str,
    /// `"level/N"`.
    pub level_text: String,
    pub skin: CatSkin,
}

impl HudView {
    pub fn project(state: &GameState, table: &LevelTable, status: HudStatus) -> Self {
        let entry = table.entry(state.level);
        let energy_ratio = if state.max_energy > 0.0 {
            (state.energy / state.max_energy).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            status,
            score_text: format_compact(state.score),
            energy_text: format!("{:.0}/{:.0}", state.energy.floor(), state.max_energy.floor()),
            energy_ratio,
            progress_percent: progress_percent(state, table),
            tap_value_text: format_compact(state.tap_value),
            level_up_cost_text: level_up_cost(state, table)
                .map(format_compact)
                .unwrap_or_else(|| "MAX".to_string()),
            profit_text: format_compact(state.profit_per_hour),
            level_name: entry.name,
            level_text: format!("{}/{}", state.level, table.max_level()),
            skin: entry.skin,
        }
    }

    /// Cosmetic variant identifier for the current level.
    pub fn skin_id(&self) -> &'static str {
        self.skin.id()
    }
}

/// Receives a fresh view after every state change.
pub trait RenderSink {
    fn refresh(&mut self, view: &HudView);
}

/// Sink that keeps the latest view for the frame loop to draw.
///
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct SharedHud(Rc<RefCell<Option<HudView>>>);

impl SharedHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<HudView> {
        self.0.borrow().clone()
    }
}

impl RenderSink for SharedHud {
    fn refresh(&mut self, view: &HudView) {
        *self.0.borrow_mut() = Some(view.clone());
    }
}
