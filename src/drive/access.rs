// Single-owner lock over the drive base.
//
// Cooperative: callers that care about ownership pass a token; callers that
// pass `None` are not ownership aware and may only command an unheld base.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Caller identity for exclusive access
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerToken(String);

impl OwnerToken {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct ExclusiveAccess {
    holder: Option<OwnerToken>,
}

impl ExclusiveAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder(&self) -> Option<&OwnerToken> {
        self.holder.as_ref()
    }

    /// Take the lock. Succeeds if it is free or already ours.
    pub fn acquire(&mut self, token: &OwnerToken) -> bool {
        match &self.holder {
            None => {
                info!("Exclusive access acquired by {}", token);
                self.holder = Some(token.clone());
                true
            }
            Some(current) if current == token => true,
            Some(current) => {
                debug!("Exclusive access for {} refused, held by {}", token, current);
                false
            }
        }
    }

    /// Drop the lock if `token` holds it. Returns whether it was released.
    pub fn release(&mut self, token: &OwnerToken) -> bool {
        if self.holder.as_ref() == Some(token) {
            info!("Exclusive access released by {}", token);
            self.holder = None;
            true
        } else {
            false
        }
    }

    /// Whether `caller` may command the drive base right now
    pub fn validate(&self, caller: Option<&OwnerToken>) -> bool {
        match &self.holder {
            None => true,
            Some(current) => caller == Some(current),
        }
    }
}
