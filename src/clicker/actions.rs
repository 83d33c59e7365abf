//! Semantic action IDs for Cat Tapper click targets.
//!
//! Registered during render and dispatched via `InputEvent::Click`.

/// The cat itself: one tap per pointer-down.
pub const TAP: u16 = 0;
