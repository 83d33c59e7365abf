//! Remote store client: one load at session start, fire-and-forget saves.
//!
//! Nothing here ever fails past its own boundary. `load` turns every error
//! into `None` (and a log line); `save` hands the request to a spawner and
//! returns at once, logging whatever the request ends in. No retries, no
//! cancellation, no ordering between saves.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawn, LocalSpawnExt, SpawnError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::identity::UserId;
use super::save::SaveScore;
use super::state::ServerSnapshot;
use super::ClickerGame;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced a response (network down, CORS, ...).
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not spawn request: {0}")]
    Spawn(#[from] SpawnError),
}

/// Status and body of a finished request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Minimal HTTP surface the client needs. The browser implementation wraps
/// `fetch`; tests script replies in memory.
pub trait Transport {
    fn get(&self, url: &str) -> LocalBoxFuture<'static, Result<HttpReply, SyncError>>;
    fn post_json(&self, url: &str, body: String)
        -> LocalBoxFuture<'static, Result<HttpReply, SyncError>>;
}

/// Cheap to clone; clones share the transport and spawner.
#[derive(Clone)]
pub struct SyncClient {
    api_base: Rc<str>,
    transport: Rc<dyn Transport>,
    spawner: Rc<dyn LocalSpawn>,
}

impl SyncClient {
    pub fn new(api_base: &str, transport: Rc<dyn Transport>, spawner: Rc<dyn LocalSpawn>) -> Self {
        Self {
            api_base: Rc::from(api_base.trim_end_matches('/')),
            transport,
            spawner,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Fetch the remote snapshot, surfacing the failure reason.
    pub async fn try_load(&self, user: UserId) -> Result<ServerSnapshot, SyncError> {
        let url = self.url(&format!("/api/get_score/{}", user));
        let reply = self.transport.get(&url).await?;
        if reply.status != 200 {
            return Err(SyncError::Status(reply.status));
        }
        Ok(serde_json::from_str(&reply.body)?)
    }

    /// Fetch the remote snapshot; any failure is logged and reads as "no
    /// remote state".
    pub async fn load(&self, user: UserId) -> Option<ServerSnapshot> {
        match self.try_load(user).await {
            Ok(snapshot) => {
                info!(%user, level = snapshot.level, score = snapshot.score, "remote snapshot loaded");
                Some(snapshot)
            }
            Err(e) => {
                warn!(%user, error = %e, "load failed; keeping local defaults");
                None
            }
        }
    }

    /// Send a save without waiting for it. The outcome is only logged.
    pub fn save(&self, save: SaveScore) {
        let body = match serde_json::to_string(&save) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %SyncError::from(e), "save dropped: could not encode body");
                return;
            }
        };
        let user = save.user_id;
        let request = self.transport.post_json(&self.url("/api/save_score"), body);
        let task = async move {
            match request.await {
                Ok(reply) if reply.status == 200 => {
                    debug!(%user, score = save.score, level = save.level, "save delivered");
                }
                Ok(reply) => {
                    debug!(%user, status = reply.status, "save rejected by remote store");
                }
                Err(e) => {
                    warn!(%user, error = %e, "save failed");
                }
            }
        };
        if let Err(e) = self.spawner.spawn_local(task) {
            warn!(%user, error = %SyncError::from(e), "save dropped");
        }
    }
}

/// Session start: load the remote snapshot and open the loading gate,
/// whatever the outcome. Returns at once for sessions without a player.
pub async fn bootstrap(game: Rc<RefCell<ClickerGame>>) {
    let Some((user, client)) = game.borrow().remote() else {
        return;
    };
    let snapshot = client.load(user).await;
    game.borrow_mut().finish_load(snapshot);
}


#[cfg(test)]
mod tests {
    use super::testkit::ScriptedTransport;
    use super::*;
    use futures::executor::{block_on, LocalPool};

    fn client(transport: &Rc<ScriptedTransport>, pool: &LocalPool) -> SyncClient {
        SyncClient::new("https://cats.example/", transport.clone(), Rc::new(pool.spawner()))
    }

    fn body(score: u64) -> SaveScore {
        SaveScore {
            user_id: UserId(5),
            score,
            energy: 9,
            level: 2,
        }
    }

    // ── load ────────────────────────────────────────────────

    #[test]
    fn load_parses_snapshot() {
        let pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        transport.reply_json(
            200,
            r#"{"score": 10.5, "energy": 50, "level": 3, "profit_per_hour": 1800, "energy_per_second": 2}"#,
        );
        let snap = block_on(client(&transport, &pool).load(UserId(5))).unwrap();
        assert_eq!(snap.score, 10.5);
        assert_eq!(snap.level, 3);
        assert_eq!(
            transport.gets.borrow().as_slice(),
            ["https://cats.example/api/get_score/5"]
        );
    }

    #[test]
    fn load_non_200_is_no_state() {
        let pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        transport.reply_json(404, r#"{"detail": "not found"}"#);
        let c = client(&transport, &pool);
        assert!(block_on(c.load(UserId(5))).is_none());

        transport.reply_json(500, "");
        assert!(matches!(
            block_on(c.try_load(UserId(5))),
            Err(SyncError::Status(500))
        ));
    }

    #[test]
    fn load_bad_json_is_no_state() {
        let pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        transport.reply_json(200, "<html>oops</html>");
        let c = client(&transport, &pool);
        assert!(block_on(c.load(UserId(5))).is_none());

        transport.reply_json(200, r#"{"score": 1}"#);
        assert!(matches!(
            block_on(c.try_load(UserId(5))),
            Err(SyncError::Json(_))
        ));
    }

    #[test]
    fn load_network_error_is_no_state() {
        let pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        transport.reply_error("offline");
        assert!(block_on(client(&transport, &pool).load(UserId(5))).is_none());
    }

    // ── save ────────────────────────────────────────────────

    #[test]
    fn save_posts_floored_body() {
        let mut pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        client(&transport, &pool).save(body(123));
        pool.run_until_stalled();

        let posts = transport.posts.borrow();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "https://cats.example/api/save_score");
        drop(posts);
        assert_eq!(
            transport.post_bodies(),
            vec![serde_json::json!({"user_id": 5, "score": 123, "energy": 9, "level": 2})]
        );
    }

    #[test]
    fn saves_are_not_coalesced() {
        let mut pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        let c = client(&transport, &pool);
        c.save(body(1));
        c.save(body(2));
        pool.run_until_stalled();
        assert_eq!(transport.posts.borrow().len(), 2);
    }

    #[test]
    fn save_failures_are_swallowed() {
        let mut pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        let c = client(&transport, &pool);

        transport.fail_posts(0);
        c.save(body(1));
        transport.fail_posts(503);
        c.save(body(2));
        pool.run_until_stalled();

        assert_eq!(transport.posts.borrow().len(), 2);
    }

    /// Formatted log output at `INFO` and above while `f` runs.
    fn logs_at_info(f: impl FnOnce()) -> String {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer({
                let captured = captured.clone();
                move || captured.clone()
            })
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn rejected_save_is_quiet_but_transport_failure_warns() {
        let mut pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        let c = client(&transport, &pool);

        let rejected = logs_at_info(|| {
            transport.fail_posts(503);
            c.save(body(1));
            pool.run_until_stalled();
        });
        assert!(rejected.is_empty(), "{}", rejected);

        let failed = logs_at_info(|| {
            transport.fail_posts(0);
            c.save(body(2));
            pool.run_until_stalled();
        });
        assert!(failed.contains("WARN"), "{}", failed);
        assert!(failed.contains("save failed"), "{}", failed);
        assert_eq!(transport.posts.borrow().len(), 2);
    }

    #[test]
    fn save_returns_before_request_completes() {
        let mut pool = LocalPool::new();
        let transport = ScriptedTransport::new();
        let c = client(&transport, &pool);
        c.save(body(1));
        // The task is queued on the spawner, not run inline.
        assert!(pool.try_run_one());
        assert!(!pool.try_run_one());
    }
}
