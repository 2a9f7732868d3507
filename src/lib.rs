// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! rangecache: a coalescing cache for range-indexed data
//!
//! Callers ask for the values between two points. The cache loads only what
//! it does not already hold, merges every loaded batch into one sorted,
//! point-deduplicated array per key, and lets overlapping concurrent
//! requests share in-flight loads instead of repeating them.
//!
//! # Features
//!
//! - **Interval algebra**: inclusive intervals over any totally ordered point type
//! - **Coalescing**: each sub-interval is fetched at most once while it is in flight
//! - **Partial and failed tracking**: incomplete loads are retried on narrower requests,
//!   failed regions reject until evicted
//! - **Status subscriptions**: callbacks fire whenever an overlapping interval changes
//!
//! # Example
//!
//! ```rust,no_run
//! use rangecache::prelude::*;
//!
//! # async fn demo() -> rangecache::Result<()> {
//! let cache = RangeCache::new(
//!     PointOrder::natural(),
//!     |entry: &(u64, String)| entry.0,
//!     |start: u64, end: u64, _stream: &'static str, _ctx: LoadContext| async move {
//!         Ok::<_, LoadError>((start..=end).map(|t| (t, format!("event {}", t))).collect())
//!     },
//! );
//!
//! let first = cache.read_async(100, 200, "events");
//! let second = cache.read_async(150, 250, "events"); // only [200, 250] is fetched
//! let (first, second) = futures::join!(first, second);
//! assert_eq!(first?.len(), 101);
//! assert_eq!(second?.len(), 101);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod index;
pub mod interval;
pub mod point;
pub mod subscription;

// Re-export commonly used types
pub use cache::{
    CacheStats, CancellationToken, LoadContext, LoadOutcome, Loader, RangeCache, RecordHandle,
    Subscription,
};
pub use classify::{classify, CachedIntervals, Classification, Status};
pub use config::CacheConfig;
pub use error::{CacheError, LoadError, Result};
pub use index::{is_partial_result, PointIndex, Slice, SortedValues};
pub use interval::{Interval, IntervalOps, Separated};
pub use point::PointOrder;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::{
        CancellationToken, LoadContext, LoadOutcome, Loader, RangeCache, Subscription,
    };
    pub use crate::classify::Status;
    pub use crate::config::CacheConfig;
    pub use crate::error::{CacheError, LoadError};
    pub use crate::index::{is_partial_result, Slice};
    pub use crate::interval::{Interval, IntervalOps};
    pub use crate::point::PointOrder;
}
