//! Exact-interval records and the outcomes handed back to callers.

use crate::error::{CacheError, Result};
use crate::index::Slice;
use crate::interval::Interval;
use futures::future::{BoxFuture, Shared};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Final state of a request once all of its sub-loads have settled.
#[derive(Debug)]
pub(crate) enum Settlement<V> {
    Resolved(Slice<V>),
    Rejected(CacheError),
    Aborted,
}

impl<V> Clone for Settlement<V> {
    fn clone(&self) -> Self {
        match self {
            Settlement::Resolved(slice) => Settlement::Resolved(slice.clone()),
            Settlement::Rejected(err) => Settlement::Rejected(err.clone()),
            Settlement::Aborted => Settlement::Aborted,
        }
    }
}

/// Cloneable handle to a pending request.
///
/// Every caller asking for the same exact interval while it loads gets a
/// clone of the same handle. Awaiting it yields the request's slice; an
/// aborted request yields [`CacheError::Aborted`].
pub struct RecordHandle<V> {
    inner: Shared<BoxFuture<'static, Settlement<V>>>,
}

impl<V> Clone for RecordHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> fmt::Debug for RecordHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordHandle").finish_non_exhaustive()
    }
}

impl<V> RecordHandle<V> {
    pub(crate) fn new(inner: Shared<BoxFuture<'static, Settlement<V>>>) -> Self {
        Self { inner }
    }

    pub(crate) fn shared(&self) -> Shared<BoxFuture<'static, Settlement<V>>> {
        self.inner.clone()
    }

    /// The settled outcome, if the handle has already completed.
    pub fn peek(&self) -> Option<LoadOutcome<V>> {
        self.inner.peek().map(|settlement| LoadOutcome::from(settlement.clone()))
    }
}

impl<V> Future for RecordHandle<V> {
    type Output = Result<Slice<V>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|settlement| match settlement {
            Settlement::Resolved(slice) => Ok(slice),
            Settlement::Rejected(err) => Err(err),
            Settlement::Aborted => Err(CacheError::Aborted),
        })
    }
}

/// What a synchronous `read` found or started.
#[derive(Debug)]
pub enum LoadOutcome<V> {
    /// Still loading; await the handle for the result.
    Pending(RecordHandle<V>),
    Resolved(Slice<V>),
    Rejected(CacheError),
    /// Discarded by `abort` or eviction before it settled.
    Aborted,
}

impl<V> Clone for LoadOutcome<V> {
    fn clone(&self) -> Self {
        match self {
            LoadOutcome::Pending(handle) => LoadOutcome::Pending(handle.clone()),
            LoadOutcome::Resolved(slice) => LoadOutcome::Resolved(slice.clone()),
            LoadOutcome::Rejected(err) => LoadOutcome::Rejected(err.clone()),
            LoadOutcome::Aborted => LoadOutcome::Aborted,
        }
    }
}

impl<V> LoadOutcome<V> {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadOutcome::Pending(_))
    }

    /// Wait for a final result.
    pub async fn into_result(self) -> Result<Slice<V>> {
        match self {
            LoadOutcome::Pending(handle) => handle.await,
            LoadOutcome::Resolved(slice) => Ok(slice),
            LoadOutcome::Rejected(err) => Err(err),
            LoadOutcome::Aborted => Err(CacheError::Aborted),
        }
    }
}

impl<V> From<Settlement<V>> for LoadOutcome<V> {
    fn from(settlement: Settlement<V>) -> Self {
        match settlement {
            Settlement::Resolved(slice) => LoadOutcome::Resolved(slice),
            Settlement::Rejected(err) => LoadOutcome::Rejected(err),
            Settlement::Aborted => LoadOutcome::Aborted,
        }
    }
}

pub(crate) enum RecordState<V> {
    Pending(RecordHandle<V>),
    Resolved(Slice<V>),
    Rejected(CacheError),
}

impl<V> RecordState<V> {
    pub fn outcome(&self) -> LoadOutcome<V> {
        match self {
            RecordState::Pending(handle) => LoadOutcome::Pending(handle.clone()),
            RecordState::Resolved(slice) => LoadOutcome::Resolved(slice.clone()),
            RecordState::Rejected(err) => LoadOutcome::Rejected(err.clone()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RecordState::Pending(_))
    }
}

/// Memoized result for one exact `(start, end)` request under a key.
pub(crate) struct Record<P, V> {
    pub id: u64,
    pub interval: Interval<P>,
    pub state: RecordState<V>,
}
