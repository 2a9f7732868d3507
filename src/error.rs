//! Error types for range cache operations.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// An opaque loader failure.
///
/// Stored once and replayed verbatim to every request waiting on the failed
/// sub-interval, so it is reference-counted rather than boxed.
#[derive(Clone)]
pub struct LoadError(Arc<dyn StdError + Send + Sync>);

impl LoadError {
    /// Wrap any error produced by a loader.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    /// A loader failure carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(MessageError(message.into())))
    }

    /// The loader's original error.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    /// True if both handles point at the same stored failure.
    pub fn same_as(&self, other: &LoadError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for LoadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for MessageError {}

/// Errors surfaced by the range cache.
///
/// Interval bounds are rendered with `Debug` so points need no `Display` impl.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The loader failed for a sub-interval of the request.
    #[error("loader failed: {0}")]
    Loader(LoadError),

    /// The request re-covers a previously failed interval and was not retried.
    #[error("interval [{start}, {end}] overlaps a previously failed load")]
    Poisoned { start: String, end: String },

    /// The exact interval has never been requested.
    #[error("no record for interval [{start}, {end}]")]
    NoRecord { start: String, end: String },

    /// The exact interval is still loading.
    #[error("interval [{start}, {end}] is still pending")]
    Pending { start: String, end: String },

    /// `start` sorts after `end`.
    #[error("invalid interval: start {start} is after end {end}")]
    InvalidInterval { start: String, end: String },

    /// The request was discarded by `abort` or eviction before it settled.
    #[error("request was aborted")]
    Aborted,
}

impl CacheError {
    pub(crate) fn poisoned<P: fmt::Debug>(start: &P, end: &P) -> Self {
        CacheError::Poisoned {
            start: format!("{:?}", start),
            end: format!("{:?}", end),
        }
    }

    pub(crate) fn no_record<P: fmt::Debug>(start: &P, end: &P) -> Self {
        CacheError::NoRecord {
            start: format!("{:?}", start),
            end: format!("{:?}", end),
        }
    }

    pub(crate) fn pending<P: fmt::Debug>(start: &P, end: &P) -> Self {
        CacheError::Pending {
            start: format!("{:?}", start),
            end: format!("{:?}", end),
        }
    }

    pub(crate) fn invalid_interval<P: fmt::Debug>(start: &P, end: &P) -> Self {
        CacheError::InvalidInterval {
            start: format!("{:?}", start),
            end: format!("{:?}", end),
        }
    }

    /// True for failures replayed from a loader, as opposed to cache policy.
    pub fn is_loader_error(&self) -> bool {
        matches!(self, CacheError::Loader(_))
    }
}

impl From<LoadError> for CacheError {
    fn from(err: LoadError) -> Self {
        CacheError::Loader(err)
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
