//! Channel registry: deterministic naming and channel bookkeeping.
//!
//! The registry is the single authority for channel names inside one flow
//! compilation. Explicit names pass through verbatim, which is the intended
//! mechanism for connecting flows by a deliberately shared channel.
//! Anonymous channels get a deterministic `"{base}.{role}"` name so that the
//! same inputs always resolve to the same name and later lookups
//! (`flow.inputChannel`) succeed.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::types::{ChannelName, ChannelRole};

/// Errors raised by the channel registry during composition.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// An explicit channel name collides with an auto-generated one (or the
    /// other way round) inside the same composition. Sharing explicit names
    /// is allowed; shadowing a generated name is a wiring mistake.
    #[error("channel name '{name}' collides with an auto-generated channel")]
    Collision { name: ChannelName },
}

/// Tracks named channels for one flow compilation.
///
/// Written only during composition; the compiled flow keeps the resolved
/// names and the registry is dropped.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    auto: FxHashSet<ChannelName>,
    explicit: FxHashSet<ChannelName>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the deterministic auto-generated name for `base` and `role`.
    ///
    /// Pure helper: `auto_name("f", Input)` is always `"f.inputChannel"`.
    #[must_use]
    pub fn auto_name(base: &str, role: ChannelRole) -> ChannelName {
        ChannelName::new(format!("{base}.{}", role.suffix()))
    }

    /// Resolves a channel name per the composition contract.
    ///
    /// With an explicit name the name is returned verbatim; otherwise the
    /// auto-generated `"{base}.{role}"` name is produced. Both outcomes are
    /// recorded so that explicit/auto collisions are caught at build time.
    /// Calling with the same inputs is idempotent.
    pub fn resolve(
        &mut self,
        explicit: Option<ChannelName>,
        base: &str,
        role: ChannelRole,
    ) -> Result<ChannelName, ChannelError> {
        match explicit {
            Some(name) => {
                if self.auto.contains(&name) {
                    return Err(ChannelError::Collision { name });
                }
                self.explicit.insert(name.clone());
                Ok(name)
            }
            None => {
                let name = Self::auto_name(base, role);
                if self.explicit.contains(&name) {
                    return Err(ChannelError::Collision { name });
                }
                self.auto.insert(name.clone());
                Ok(name)
            }
        }
    }

    /// Returns true if `name` was resolved through this registry.
    #[must_use]
    pub fn contains(&self, name: &ChannelName) -> bool {
        self.auto.contains(name) || self.explicit.contains(name)
    }

    /// Iterates over every channel name resolved so far.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelName> {
        self.auto.iter().chain(self.explicit.iter())
    }
}
