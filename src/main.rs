mod browser;
mod clicker;
mod config;
mod input;
mod logging;
mod time;

use std::{cell::RefCell, io, rc::Rc};

use ratzilla::event::{KeyCode, MouseButton, MouseEventKind};
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};
use tracing::{info, warn};

use browser::{BrowserSpawner, FetchTransport, TelegramIdentity};
use clicker::identity::{self, FixedIdentity, IdentityProvider};
use clicker::levels::LevelTable;
use clicker::state::TICK_INTERVAL_MS;
use clicker::sync::{self, SyncClient};
use clicker::view::SharedHud;
use clicker::{render, ClickerGame, SessionSync};
use config::Config;
use input::{ClickState, InputEvent};
use time::TickClock;

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();

    let raw_config = browser::read_config_attribute();
    let (config, config_error) = Config::load_or_default(raw_config.as_deref());
    logging::init(&config.log_filter);
    if let Some(e) = config_error {
        warn!(error = %e, "ignoring data-config; using defaults");
    }

    // A configured id wins over the host's.
    let telegram = Rc::new(TelegramIdentity::detect());
    let configured = FixedIdentity(config.user_id);
    let providers: [&dyn IdentityProvider; 2] = [&configured, &*telegram];
    let user = identity::resolve(&providers);

    let session = user.map(|user| {
        let client = SyncClient::new(
            &config.api_base,
            Rc::new(FetchTransport),
            Rc::new(BrowserSpawner),
        );
        SessionSync::new(user, client, config.save_policy)
    });

    let hud = SharedHud::new();
    let game = Rc::new(RefCell::new(ClickerGame::new(
        LevelTable::standard(),
        config.max_energy,
        Box::new(hud.clone()),
        session,
    )));
    wasm_bindgen_futures::spawn_local(sync::bootstrap(game.clone()));
    if let Err(e) = browser::install_flush_hooks(&game, telegram.clone()) {
        warn!(error = ?e, "could not install flush hooks");
    }

    let click_state = Rc::new(RefCell::new(ClickState::new()));
    let mut clock = TickClock::new(TICK_INTERVAL_MS);
    let backend = DomBackend::new()?;
    let terminal = Terminal::new(backend)?;
    info!(tick_ms = clock.interval_ms(), "cat tapper started");

    // Mouse/touch: pointer-down on a registered target
    terminal.on_mouse_event({
        let game = game.clone();
        let click_state = click_state.clone();
        move |mouse_event| {
            if mouse_event.event != MouseEventKind::Pressed
                || mouse_event.button != MouseButton::Left
            {
                return;
            }

            let cs = click_state.borrow();
            if cs.terminal_rows == 0 || cs.terminal_cols == 0 {
                return;
            }
            let action = browser::grid_cell(mouse_event.x, mouse_event.y, &cs)
                .and_then(|(col, row)| cs.hit_test(col, row));
            drop(cs);

            if let Some(id) = action {
                game.borrow_mut().handle_input(&InputEvent::Click(id));
            }
        }
    });

    // Keyboard
    terminal.on_key_event({
        let game = game.clone();
        move |key_event| {
            let event = match key_event.code {
                KeyCode::Char(c) => InputEvent::Key(c),
                KeyCode::Enter => InputEvent::Key('\n'),
                _ => return,
            };
            game.borrow_mut().handle_input(&event);
        }
    });

    terminal.draw_web(move |f| {
        let now = browser::now_ms();
        {
            let mut g = game.borrow_mut();
            for _ in 0..clock.update(now) {
                g.tick();
            }
            g.poll_saves(now);
        }

        let area = f.area();
        click_state
            .borrow_mut()
            .begin_frame(area.width, area.height);
        if let Some(view) = hud.latest() {
            render::render(&view, f, area, &click_state);
        }
    });

    Ok(())
}
