//! Host identity: who the player is, as far as the remote store is concerned.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable numeric user id supplied by the host app.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supplies the user id, or `None` when the host cannot identify the player.
pub trait IdentityProvider {
    fn user_id(&self) -> Option<UserId>;
}

/// Identity known up front (config override, tests).
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedIdentity(pub Option<UserId>);

impl IdentityProvider for FixedIdentity {
    fn user_id(&self) -> Option<UserId> {
        self.0
    }
}

/// First provider that yields an id wins.
pub fn resolve(providers: &[&dyn IdentityProvider]) -> Option<UserId> {
    providers.iter().find_map(|p| p.user_id())
}
