//! `tracing` output for the browser: one formatted line per event, sent to
//! the devtools console method that matches its level.

use std::io;

use tracing::{warn, Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Which `console.*` function receives a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleMethod {
    Log,
    Warn,
    Error,
}

impl ConsoleMethod {
    pub fn for_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => ConsoleMethod::Error,
            Level::WARN => ConsoleMethod::Warn,
            _ => ConsoleMethod::Log,
        }
    }
}

/// `MakeWriter` that hands each event to the browser console.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleWriter;

/// Buffers one formatted event and emits it on drop.
pub struct ConsoleLine {
    method: ConsoleMethod,
    buf: Vec<u8>,
}

impl ConsoleLine {
    fn new(method: ConsoleMethod) -> Self {
        Self {
            method,
            buf: Vec::new(),
        }
    }
}

impl io::Write for ConsoleLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        emit(self.method, text.trim_end());
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(method: ConsoleMethod, text: &str) {
    let value = wasm_bindgen::JsValue::from_str(text);
    match method {
        ConsoleMethod::Log => web_sys::console::log_1(&value),
        ConsoleMethod::Warn => web_sys::console::warn_1(&value),
        ConsoleMethod::Error => web_sys::console::error_1(&value),
    }
}

// Host builds (tests) have no console object.
#[cfg(not(target_arch = "wasm32"))]
fn emit(_method: ConsoleMethod, text: &str) {
    eprintln!("{}", text);
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleLine::new(ConsoleMethod::Log)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleLine::new(ConsoleMethod::for_level(meta.level()))
    }
}

/// Install the global subscriber. An unparsable filter falls back to
/// `info`; a second call is ignored.
pub fn init(filter: &str) {
    let (env_filter, bad_filter) = match EnvFilter::try_new(filter) {
        Ok(f) => (f, false),
        Err(_) => (EnvFilter::new("info"), true),
    };
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(ConsoleWriter)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .try_init()
        .is_ok();
    if installed && bad_filter {
        warn!(filter, "unparsable log filter; using info");
    }
}
