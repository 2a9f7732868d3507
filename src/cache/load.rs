//! Loader boundary: the trait callers implement, the context handed to each
//! invocation, and the cancellation token that lets `abort` stop it.

use crate::error::LoadError;
use crate::interval::Interval;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Fetches the values for one sub-interval.
///
/// The cache decides which sub-intervals to request; the loader only has to
/// return every value whose point lies within `[start, end]`, in any order.
/// Retries, timeouts and backoff are the loader's business. A loader that
/// knows its answer is incomplete calls [`LoadContext::mark_partial`] (or
/// returns through [`LoadContext::partial`]).
pub trait Loader<P, V, K>: Send + Sync {
    fn load(
        &self,
        start: P,
        end: P,
        params: K,
        ctx: LoadContext,
    ) -> BoxFuture<'static, Result<Vec<V>, LoadError>>;
}

impl<P, V, K, F, Fut> Loader<P, V, K> for F
where
    F: Fn(P, P, K, LoadContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<V>, LoadError>> + Send + 'static,
{
    fn load(
        &self,
        start: P,
        end: P,
        params: K,
        ctx: LoadContext,
    ) -> BoxFuture<'static, Result<Vec<V>, LoadError>> {
        Box::pin(self(start, end, params, ctx))
    }
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation signal shared between the cache and one load.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Completes once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking so a cancel in between isn't missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Per-invocation context handed to a [`Loader`].
#[derive(Debug, Clone)]
pub struct LoadContext {
    token: CancellationToken,
    partial: Arc<AtomicBool>,
}

impl LoadContext {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self {
            token,
            partial: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancelled when the request is aborted or its key evicted.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Flag the values this load returns as known-incomplete.
    pub fn mark_partial(&self) {
        self.partial.store(true, Ordering::Release);
    }

    /// Mark partial and hand the values back, for `return Ok(ctx.partial(values))`.
    pub fn partial<V>(&self, values: Vec<V>) -> Vec<V> {
        self.mark_partial();
        values
    }

    pub(crate) fn is_partial(&self) -> bool {
        self.partial.load(Ordering::Acquire)
    }
}

/// How one sub-interval load ended, as seen by everyone awaiting it.
#[derive(Debug, Clone)]
pub(crate) enum LoadSettlement {
    Loaded { partial: bool },
    Failed(LoadError),
    Aborted,
}

pub(crate) type LoadHandle = Shared<BoxFuture<'static, LoadSettlement>>;

/// One outstanding loader invocation for an exact sub-interval.
pub(crate) struct InFlightLoad<P> {
    pub id: u64,
    pub interval: Interval<P>,
    pub token: CancellationToken,
    pub handle: LoadHandle,
}
