//! Collection node configuration.

use std::time::Duration;

/// Which id `update_document` sends to the driver when the key already
/// exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateTarget {
    /// The matched document's id.
    #[default]
    Document,
    /// The owning collection's id.
    ///
    /// Reproduces the legacy driver-call shape for backends that depend on
    /// it. A driver that resolves ids strictly will not update the document.
    LegacyCollectionId,
}

/// Configuration shared by every node of a collection tree.
///
/// Children inherit their parent's configuration when they are created or
/// fetched.
#[derive(Debug, Clone, Default)]
pub struct CollectionConfig {
    /// Upper bound on each driver call. `None` waits indefinitely.
    pub driver_timeout: Option<Duration>,

    /// Id passed to the driver by `update_document` on an existing key.
    pub update_target: UpdateTarget,
}

impl CollectionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds every driver call by `timeout`.
    #[must_use]
    pub const fn with_driver_timeout(mut self, timeout: Duration) -> Self {
        self.driver_timeout = Some(timeout);
        self
    }

    /// Sets the id `update_document` sends on an existing key.
    #[must_use]
    pub const fn with_update_target(mut self, target: UpdateTarget) -> Self {
        self.update_target = target;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wait_forever_and_target_documents() {
        let config = CollectionConfig::default();
        assert_eq!(config.driver_timeout, None);
        assert_eq!(config.update_target, UpdateTarget::Document);
    }

    #[test]
    fn builder() {
        let config = CollectionConfig::new()
            .with_driver_timeout(Duration::from_millis(250))
            .with_update_target(UpdateTarget::LegacyCollectionId);

        assert_eq!(config.driver_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.update_target, UpdateTarget::LegacyCollectionId);
    }
}
