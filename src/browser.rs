//! Browser side of the game: `fetch` transport, task spawner, Telegram host
//! identity, page lifecycle hooks, and DOM geometry for clicks.
//!
//! Only reached from `main` at runtime; the game itself never touches
//! `web_sys`.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use js_sys::{Function, Reflect};
use tracing::{debug, info};
use wasm_bindgen::prelude::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response, VisibilityState};

use crate::clicker::identity::{IdentityProvider, UserId};
use crate::clicker::sync::{HttpReply, SyncError, Transport};
use crate::clicker::ClickerGame;
use crate::input::{pixel_to_cell, ClickState};

fn js_error(e: JsValue) -> SyncError {
    SyncError::Transport(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

/// `Transport` over `window.fetch`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

async fn fetch(request: Result<Request, JsValue>) -> Result<HttpReply, SyncError> {
    let request = request.map_err(js_error)?;
    let window = web_sys::window().ok_or_else(|| SyncError::Transport("no window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_error)?
        .dyn_into()
        .map_err(js_error)?;
    let status = response.status();
    let body = JsFuture::from(response.text().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    Ok(HttpReply {
        status,
        body: body.as_string().unwrap_or_default(),
    })
}

impl Transport for FetchTransport {
    fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpReply, SyncError>> {
        fetch(Request::new_with_str(url)).boxed_local()
    }

    fn post_json(
        &self,
        url: &str,
        body: String,
    ) -> LocalBoxFuture<'static, Result<HttpReply, SyncError>> {
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&JsValue::from_str(&body));
        let request = Request::new_with_str_and_init(url, &init).and_then(|r| {
            r.headers().set("Content-Type", "application/json")?;
            Ok(r)
        });
        fetch(request).boxed_local()
    }
}

/// `LocalSpawn` backed by the page's microtask queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// Property lookup that treats `undefined`/`null` as absent.
fn prop(target: &JsValue, key: &str) -> Option<JsValue> {
    let value = Reflect::get(target, &JsValue::from_str(key)).ok()?;
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(value)
    }
}

fn call_method(target: &JsValue, name: &str, args: &[&JsValue]) -> Option<JsValue> {
    let method: Function = prop(target, name)?.dyn_into().ok()?;
    match args {
        [] => method.call0(target).ok(),
        [a] => method.call1(target, a).ok(),
        [a, b] => method.call2(target, a, b).ok(),
        _ => None,
    }
}

/// Telegram user ids are positive integers that fit a JS number exactly.
pub fn user_id_from_js_number(id: f64) -> Option<UserId> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if id.is_finite() && id >= 1.0 && id <= MAX_SAFE && id.fract() == 0.0 {
        Some(UserId(id as u64))
    } else {
        None
    }
}

/// Host identity from `window.Telegram.WebApp`.
pub struct TelegramIdentity {
    web_app: Option<JsValue>,
}

impl TelegramIdentity {
    /// Find the WebApp object and tell the host we are ready to be shown
    /// full-height.
    pub fn detect() -> Self {
        let web_app = web_sys::window()
            .and_then(|w| prop(&w, "Telegram"))
            .and_then(|t| prop(&t, "WebApp"));
        if let Some(app) = &web_app {
            call_method(app, "ready", &[]);
            call_method(app, "expand", &[]);
        }
        debug!(present = web_app.is_some(), "telegram web app");
        Self { web_app }
    }

    fn is_expanded(&self) -> bool {
        self.web_app
            .as_ref()
            .and_then(|app| prop(app, "isExpanded"))
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }
}

impl IdentityProvider for TelegramIdentity {
    fn user_id(&self) -> Option<UserId> {
        let app = self.web_app.as_ref()?;
        let id = prop(app, "initDataUnsafe")
            .and_then(|d| prop(&d, "user"))
            .and_then(|u| prop(&u, "id"))?
            .as_f64()?;
        user_id_from_js_number(id)
    }
}

/// Raw JSON from `<body data-config='...'>`, if present.
pub fn read_config_attribute() -> Option<String> {
    web_sys::window()?
        .document()?
        .body()?
        .get_attribute("data-config")
}

/// `performance.now()` in milliseconds, 0 when unavailable.
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Send any pending save when the page is hidden or the Telegram viewport
/// collapses. The listeners live for the whole page.
pub fn install_flush_hooks(
    game: &Rc<RefCell<ClickerGame>>,
    telegram: Rc<TelegramIdentity>,
) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let on_visibility = Closure::<dyn FnMut()>::new({
        let game = game.clone();
        let document = document.clone();
        move || {
            if document.visibility_state() == VisibilityState::Hidden {
                debug!("page hidden");
                game.borrow_mut().flush_saves();
            }
        }
    });
    document.add_event_listener_with_callback(
        "visibilitychange",
        on_visibility.as_ref().unchecked_ref(),
    )?;
    on_visibility.forget();

    if let Some(app) = telegram.web_app.clone() {
        let on_viewport = Closure::<dyn FnMut()>::new({
            let game = game.clone();
            let telegram = telegram.clone();
            move || {
                if !telegram.is_expanded() {
                    debug!("telegram viewport collapsed");
                    game.borrow_mut().flush_saves();
                }
            }
        });
        call_method(
            &app,
            "onEvent",
            &[&JsValue::from_str("viewportChanged"), on_viewport.as_ref()],
        );
        on_viewport.forget();
        info!("flush hooks installed");
    }
    Ok(())
}

/// Map a mouse position (page pixels) to a terminal cell of the DOM grid.
pub fn grid_cell(mouse_x: u32, mouse_y: u32, cs: &ClickState) -> Option<(u16, u16)> {
    let document = web_sys::window()?.document()?;

    // DomBackend creates a <div> as the grid container inside <body>.
    let grid = document.query_selector("body > div").ok()??;
    let rect = grid.get_bounding_client_rect();

    let cell = pixel_to_cell(
        mouse_x as f64 - rect.left(),
        mouse_y as f64 - rect.top(),
        rect.width(),
        rect.height(),
        cs.terminal_cols,
        cs.terminal_rows,
    );
    debug!(mouse_x, mouse_y, ?cell, targets = cs.targets.len(), "click");
    cell
}
