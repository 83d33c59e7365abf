//! Cat Tapper: tap the cat to climb the levels while the server keeps the score.

pub mod actions;
pub mod identity;
pub mod levels;
pub mod logic;
pub mod render;
pub mod save;
pub mod state;
pub mod sync;
pub mod view;

use tracing::{debug, info};

use crate::input::InputEvent;

use identity::UserId;
use levels::LevelTable;
use save::{SavePolicy, SaveScheduler, SaveScore};
use state::{GameState, ServerSnapshot, TapOutcome, TapRejection};
use sync::SyncClient;
use view::{HudStatus, HudView, RenderSink};

/// Persistence wiring for a session whose player is known.
pub struct SessionSync {
    user: UserId,
    client: SyncClient,
    scheduler: SaveScheduler,
}

impl SessionSync {
    pub fn new(user: UserId, client: SyncClient, policy: SavePolicy) -> Self {
        Self {
            user,
            client,
            scheduler: SaveScheduler::new(policy),
        }
    }

    fn dispatch(&self, save: Option<SaveScore>) {
        if let Some(save) = save {
            self.client.save(save);
        }
    }
}

/// The progression engine: owns the state for one session and pushes every
/// change to the render sink.
pub struct ClickerGame {
    pub state: GameState,
    table: LevelTable,
    sink: Box<dyn RenderSink>,
    session: Option<SessionSync>,
}

impl ClickerGame {
    /// Start a session. With a `SessionSync` the game waits for
    /// [`ClickerGame::finish_load`]; without one it runs local-only right away
    /// and refuses taps.
    pub fn new(
        table: LevelTable,
        max_energy: f64,
        sink: Box<dyn RenderSink>,
        session: Option<SessionSync>,
    ) -> Self {
        let mut state = GameState::new(&table, max_energy);
        match &session {
            Some(s) => info!(user = %s.user, policy = ?s.scheduler.policy(), "session started"),
            None => {
                info!("no host identity; running without persistence");
                logic::finish_loading(&mut state);
            }
        }
        let mut game = Self {
            state,
            table,
            sink,
            session,
        };
        game.refresh();
        game
    }

    #[cfg(test)]
    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    pub fn status(&self) -> HudStatus {
        if self.session.is_none() {
            HudStatus::HostUnavailable
        } else if self.state.is_loading {
            HudStatus::Loading
        } else {
            HudStatus::Ready
        }
    }

    pub fn hud(&self) -> HudView {
        HudView::project(&self.state, &self.table, self.status())
    }

    fn refresh(&mut self) {
        let view = self.hud();
        self.sink.refresh(&view);
    }

    fn log_level_up(&self, gained: u32) {
        if gained > 0 {
            info!(
                level = self.state.level,
                name = self.table.entry(self.state.level).name,
                gained,
                "level up"
            );
        }
    }

    /// User and client for the initial load, if this session persists.
    pub fn remote(&self) -> Option<(UserId, SyncClient)> {
        self.session.as_ref().map(|s| (s.user, s.client.clone()))
    }

    /// One tap: spend, score, level up, repaint, then hand a save to the
    /// dispatch policy.
    pub fn tap(&mut self) -> TapOutcome {
        if self.session.is_none() {
            return TapOutcome::Rejected(TapRejection::NoIdentity);
        }
        let outcome = logic::tap(&mut self.state, &self.table);
        let TapOutcome::Accepted { levels_gained } = outcome else {
            debug!(?outcome, "tap ignored");
            return outcome;
        };
        self.log_level_up(levels_gained);
        self.refresh();
        if let Some(s) = self.session.as_mut() {
            let ready = s.scheduler.request(SaveScore::from_state(s.user, &self.state));
            s.dispatch(ready);
        }
        outcome
    }

    /// One second of passive income and regeneration. Never saves.
    pub fn tick(&mut self) -> u32 {
        if self.state.is_loading {
            return 0;
        }
        let gained = logic::tick(&mut self.state, &self.table);
        self.log_level_up(gained);
        self.refresh();
        gained
    }

    pub fn level_up_if_eligible(&mut self) -> u32 {
        let gained = logic::level_up_if_eligible(&mut self.state, &self.table);
        if gained > 0 {
            self.log_level_up(gained);
            self.refresh();
        }
        gained
    }

    /// Overwrite the state with the remote snapshot. Ignored once loading
    /// has finished.
    pub fn apply_server_snapshot(&mut self, snapshot: &ServerSnapshot) -> bool {
        let applied = logic::apply_server_snapshot(&mut self.state, &self.table, snapshot);
        if applied {
            info!(
                score = self.state.score,
                level = self.state.level,
                "snapshot applied"
            );
            self.refresh();
        } else {
            debug!("late snapshot ignored");
        }
        applied
    }

    /// End of the initial load, successful or not. The loading gate opens
    /// either way.
    pub fn finish_load(&mut self, snapshot: Option<ServerSnapshot>) {
        if let Some(snapshot) = snapshot {
            if self.apply_server_snapshot(&snapshot) {
                return;
            }
        }
        if self.state.is_loading {
            logic::finish_loading(&mut self.state);
            info!("starting from defaults");
            self.refresh();
        }
    }

    /// Map an input event to a tap. Returns `true` when the event was meant
    /// for the game, even if the tap itself was rejected.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Click(actions::TAP) | InputEvent::Key(' ' | '\n' | 't') => {
                self.tap();
                true
            }
            _ => false,
        }
    }

    /// Frame hook: send a save whose time has come under the current policy.
    pub fn poll_saves(&mut self, now_ms: f64) {
        if let Some(s) = self.session.as_mut() {
            let due = s.scheduler.poll(now_ms);
            s.dispatch(due);
        }
    }

    /// Send whatever save is pending right now (page hidden, app collapsed).
    pub fn flush_saves(&mut self) {
        if let Some(s) = self.session.as_mut() {
            let pending = s.scheduler.flush();
            if pending.is_some() {
                info!("flushing pending save");
            }
            s.dispatch(pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::sync::testkit::ScriptedTransport;
    use super::view::SharedHud;
    use futures::executor::{block_on, LocalPool};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const SNAPSHOT: &str =
        r#"{"score": 10, "energy": 50, "level": 3, "profit_per_hour": 1800, "energy_per_second": 2}"#;

    struct CountingSink(Rc<Cell<u32>>);

    impl RenderSink for CountingSink {
        fn refresh(&mut self, _view: &HudView) {
            self.0.set(self.0.get() + 1);
        }
    }

    struct Harness {
        pool: LocalPool,
        transport: Rc<ScriptedTransport>,
        hud: SharedHud,
        game: Rc<RefCell<ClickerGame>>,
    }

    impl Harness {
        fn new(policy: SavePolicy) -> Self {
            let pool = LocalPool::new();
            let transport = ScriptedTransport::new();
            let client = SyncClient::new("", transport.clone(), Rc::new(pool.spawner()));
            let hud = SharedHud::new();
            let game = ClickerGame::new(
                LevelTable::standard(),
                1000.0,
                Box::new(hud.clone()),
                Some(SessionSync::new(UserId(77), client, policy)),
            );
            Self {
                pool,
                transport,
                hud,
                game: Rc::new(RefCell::new(game)),
            }
        }

        /// Loaded from defaults (remote answers 404).
        fn loaded(policy: SavePolicy) -> Self {
            let h = Self::new(policy);
            h.transport.reply_json(404, "");
            block_on(sync::bootstrap(h.game.clone()));
            h
        }

        fn posts(&mut self) -> Vec<serde_json::Value> {
            self.pool.run_until_stalled();
            self.transport.post_bodies()
        }
    }

    // ── loading ─────────────────────────────────────────────

    #[test]
    fn bootstrap_applies_remote_snapshot() {
        let h = Harness::new(SavePolicy::Immediate);
        assert_eq!(h.game.borrow().status(), HudStatus::Loading);
        assert_eq!(h.hud.latest().unwrap().status, HudStatus::Loading);

        h.transport.reply_json(200, SNAPSHOT);
        block_on(sync::bootstrap(h.game.clone()));

        let game = h.game.borrow();
        assert_eq!(game.status(), HudStatus::Ready);
        assert_eq!(game.state.score, 10.0);
        assert_eq!(game.state.energy, 50.0);
        assert_eq!(game.state.level, 3);
        assert_eq!(game.state.tap_value, 3.0);
        assert_eq!(h.transport.gets.borrow().as_slice(), ["/api/get_score/77"]);
        assert_eq!(h.hud.latest().unwrap().level_name, "House Cat");
    }

    #[test]
    fn failed_load_opens_gate_with_defaults() {
        let h = Harness::new(SavePolicy::Immediate);
        h.transport.reply_error("offline");
        block_on(sync::bootstrap(h.game.clone()));

        let game = h.game.borrow();
        assert!(!game.state.is_loading);
        assert_eq!(game.state.score, 0.0);
        assert_eq!(game.state.level, 1);
        assert_eq!(game.state.energy, 1000.0);
        assert_eq!(game.status(), HudStatus::Ready);
    }

    #[test]
    fn snapshot_then_tap_uses_snapshot_values() {
        let mut h = Harness::new(SavePolicy::Immediate);
        h.transport.reply_json(200, SNAPSHOT);
        block_on(sync::bootstrap(h.game.clone()));

        assert!(h.game.borrow_mut().tap().is_accepted());
        let game = h.game.borrow();
        assert_eq!(game.state.score, 13.0);
        assert_eq!(game.state.energy, 47.0);
        drop(game);
        assert_eq!(
            h.posts(),
            vec![serde_json::json!({"user_id": 77, "score": 13, "energy": 47, "level": 3})]
        );
    }

    #[test]
    fn late_snapshot_is_ignored() {
        let h = Harness::loaded(SavePolicy::Immediate);
        h.game.borrow_mut().tap();
        let snap: ServerSnapshot = serde_json::from_str(SNAPSHOT).unwrap();
        assert!(!h.game.borrow_mut().apply_server_snapshot(&snap));
        assert_eq!(h.game.borrow().state.score, 1.0);
    }

    #[test]
    fn tap_while_loading_is_rejected_without_save() {
        let mut h = Harness::new(SavePolicy::Immediate);
        let outcome = h.game.borrow_mut().tap();
        assert_eq!(outcome, TapOutcome::Rejected(TapRejection::Loading));
        assert_eq!(h.game.borrow_mut().tick(), 0);
        assert_eq!(h.game.borrow().state.total_ticks, 0);
        assert!(h.posts().is_empty());
    }

    // ── saves ───────────────────────────────────────────────

    #[test]
    fn immediate_policy_saves_every_accepted_tap() {
        let mut h = Harness::loaded(SavePolicy::Immediate);
        for _ in 0..3 {
            h.game.borrow_mut().tap();
        }
        let posts = h.posts();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[2]["score"], 3);
        assert_eq!(posts[2]["energy"], 997);
    }

    #[test]
    fn rejected_tap_sends_nothing() {
        let mut h = Harness::loaded(SavePolicy::Immediate);
        h.game.borrow_mut().state.energy = 0.5;
        assert_eq!(
            h.game.borrow_mut().tap(),
            TapOutcome::Rejected(TapRejection::LowEnergy)
        );
        assert!(h.posts().is_empty());
    }

    #[test]
    fn tick_never_saves() {
        let mut h = Harness::loaded(SavePolicy::Immediate);
        {
            let mut game = h.game.borrow_mut();
            game.state.level = 4;
            let table = game.table().clone();
            game.state.sync_rates(&table);
            for _ in 0..10 {
                game.tick();
            }
            game.poll_saves(100_000.0);
            game.flush_saves();
        }
        assert_eq!(h.game.borrow().state.score, 20.0);
        assert!(h.posts().is_empty());
    }

    #[test]
    fn debounced_policy_sends_latest_once() {
        let mut h = Harness::loaded(SavePolicy::Debounced { quiet_ms: 1500 });
        for t in [0.0, 500.0, 1000.0] {
            let mut game = h.game.borrow_mut();
            game.tap();
            game.poll_saves(t);
        }
        h.game.borrow_mut().poll_saves(2000.0);
        assert!(h.posts().is_empty());

        h.game.borrow_mut().poll_saves(2500.0);
        let posts = h.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["score"], 3);
    }

    #[test]
    fn flush_sends_pending_save_once() {
        let mut h = Harness::loaded(SavePolicy::Debounced { quiet_ms: 1500 });
        h.game.borrow_mut().tap();
        h.game.borrow_mut().poll_saves(0.0);
        h.game.borrow_mut().flush_saves();
        h.game.borrow_mut().flush_saves();
        h.game.borrow_mut().poll_saves(10_000.0);
        assert_eq!(h.posts().len(), 1);
    }

    #[test]
    fn periodic_policy_limits_rate() {
        let mut h = Harness::loaded(SavePolicy::Periodic { interval_ms: 1000 });
        let mut now = 0.0;
        for _ in 0..20 {
            let mut game = h.game.borrow_mut();
            game.tap();
            game.poll_saves(now);
            now += 100.0;
        }
        // Sends at 0 and 1000 only.
        assert_eq!(h.posts().len(), 2);
    }

    // ── identity unavailable ────────────────────────────────

    #[test]
    fn no_identity_runs_local_only() {
        let hud = SharedHud::new();
        let mut game = ClickerGame::new(LevelTable::standard(), 1000.0, Box::new(hud.clone()), None);
        assert!(!game.state.is_loading);
        assert_eq!(game.status(), HudStatus::HostUnavailable);
        assert!(game.remote().is_none());

        assert_eq!(game.tap(), TapOutcome::Rejected(TapRejection::NoIdentity));
        assert!(!game.handle_input(&InputEvent::Key('x')));
        assert!(game.handle_input(&InputEvent::Key(' ')));
        assert_eq!(game.state.score, 0.0);

        game.state.energy = 10.0;
        game.tick();
        assert_eq!(game.state.energy, 11.0);
        game.poll_saves(0.0);
        game.flush_saves();
        assert_eq!(hud.latest().unwrap().status, HudStatus::HostUnavailable);
    }

    #[test]
    fn bootstrap_without_identity_is_noop() {
        let game = Rc::new(RefCell::new(ClickerGame::new(
            LevelTable::standard(),
            1000.0,
            Box::new(SharedHud::new()),
            None,
        )));
        block_on(sync::bootstrap(game.clone()));
        assert_eq!(game.borrow().status(), HudStatus::HostUnavailable);
    }

    // ── input & sink ────────────────────────────────────────

    #[test]
    fn tap_inputs_map_to_tap() {
        let h = Harness::loaded(SavePolicy::Debounced { quiet_ms: 1500 });
        let mut game = h.game.borrow_mut();
        assert!(game.handle_input(&InputEvent::Click(actions::TAP)));
        assert!(game.handle_input(&InputEvent::Key(' ')));
        assert!(game.handle_input(&InputEvent::Key('\n')));
        assert!(game.handle_input(&InputEvent::Key('t')));
        assert!(!game.handle_input(&InputEvent::Key('q')));
        assert!(!game.handle_input(&InputEvent::Click(99)));
        assert_eq!(game.state.total_taps, 4);
    }

    #[test]
    fn sink_refreshed_after_each_mutation() {
        let pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        let client = SyncClient::new("", transport.clone(), Rc::new(pool.spawner()));
        let count = Rc::new(Cell::new(0));
        let mut game = ClickerGame::new(
            LevelTable::standard(),
            1000.0,
            Box::new(CountingSink(count.clone())),
            Some(SessionSync::new(UserId(1), client, SavePolicy::Immediate)),
        );
        assert_eq!(count.get(), 1);

        game.tap(); // rejected: still loading
        assert_eq!(count.get(), 1);

        game.finish_load(None);
        assert_eq!(count.get(), 2);
        game.tap();
        game.tick();
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn one_hour_of_frames_earns_one_hour_of_profit() {
        use crate::clicker::levels::{CatSkin, LevelEntry};
        use crate::clicker::state::TICK_INTERVAL_MS;
        use crate::time::TickClock;

        let table = LevelTable::new(vec![LevelEntry {
            name: "Flat",
            score_threshold: None,
            tap_value: 1.0,
            profit_per_hour: 3600.0,
            energy_per_second: 1.0,
            skin: CatSkin::Kitten,
        }])
        .unwrap();
        let mut game = ClickerGame::new(table, 5000.0, Box::new(SharedHud::new()), None);
        game.state.energy = 0.0;

        let mut clock = TickClock::new(TICK_INTERVAL_MS);
        // One hour at 60 fps.
        for frame in 0..=216_000u32 {
            for _ in 0..clock.update(frame as f64 * 1000.0 / 60.0) {
                game.tick();
            }
        }
        assert!((game.state.score - 3600.0).abs() <= 1.0, "score {}", game.state.score);
        assert!((game.state.energy - 3600.0).abs() <= 1.0, "energy {}", game.state.energy);
    }

    #[test]
    fn level_up_check_crosses_several_thresholds() {
        let h = Harness::loaded(SavePolicy::Immediate);
        let mut game = h.game.borrow_mut();
        game.state.score = 12_000.0;
        assert_eq!(game.level_up_if_eligible(), 3);
        assert_eq!(game.state.level, 4);
        assert_eq!(game.level_up_if_eligible(), 0);
        drop(game);
        assert_eq!(h.hud.latest().unwrap().level_name, "Tabby");
    }

    #[test]
    fn hud_follows_level_up() {
        let h = Harness::loaded(SavePolicy::Debounced { quiet_ms: 1500 });
        h.game.borrow_mut().state.score = 499.0;
        h.game.borrow_mut().tap();
        let view = h.hud.latest().unwrap();
        assert_eq!(view.level_name, "Alley Cat");
        assert_eq!(view.level_text, "2/10");
        assert_eq!(view.tap_value_text, "2");
    }
}
