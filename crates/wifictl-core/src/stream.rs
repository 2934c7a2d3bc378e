// ── Configuration streams ──
//
// Subscription to the computed configuration tree published by the
// engine runtime.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::ConfigTree;

/// Point-in-time access to the effective tree plus change
/// notification, either via [`changed`](Self::changed) or as a
/// `Stream`.
pub struct ConfigStream {
    current: Arc<ConfigTree>,
    receiver: watch::Receiver<Arc<ConfigTree>>,
}

impl ConfigStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<ConfigTree>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Tree captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<ConfigTree> {
        &self.current
    }

    pub fn latest(&self) -> Arc<ConfigTree> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next recomputed tree. `None` once the engine is
    /// gone.
    pub async fn changed(&mut self) -> Option<Arc<ConfigTree>> {
        self.receiver.changed().await.ok()?;
        let tree = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&tree);
        Some(tree)
    }

    pub fn into_stream(self) -> ConfigWatchStream {
        ConfigWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding every published tree, starting with the
/// current one.
pub struct ConfigWatchStream {
    inner: WatchStream<Arc<ConfigTree>>,
}

impl Stream for ConfigWatchStream {
    type Item = Arc<ConfigTree>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
