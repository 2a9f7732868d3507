//! Runtime configuration for a range cache.
//!
//! Only presentation and scheduling live here. There is no retry, backoff
//! or timeout setting; loaders own those.

/// Default label attached to tracing events.
pub const DEFAULT_LABEL: &str = "rangecache";

/// Range cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Name attached to every tracing event this cache emits.
    pub label: String,
    /// Drive new requests on the ambient tokio runtime as soon as they are
    /// created, rather than waiting for somebody to await the handle.
    pub eager: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            eager: true,
        }
    }

    /// Set the tracing label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Enable or disable eager driving of new requests.
    ///
    /// With eager mode off, or with no tokio runtime on the calling thread,
    /// loads make progress only while a handle is being awaited.
    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }
}
