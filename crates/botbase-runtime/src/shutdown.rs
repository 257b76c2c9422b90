//! One-shot shutdown signal shared by every loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug)]
struct Inner {
    fired: AtomicBool,
    tx: watch::Sender<bool>,
}

/// A broadcast signal that fires at most once.
///
/// Clones share the same signal. Once fired it is never observed as open
/// again.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Creates an unfired signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Fires the signal. Returns true only for the call that fired it.
    pub fn signal(&self) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.tx.send_replace(true);
        true
    }

    /// Returns true once the signal has fired.
    pub fn is_signaled(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Returns a read-only handle for loops to observe.
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.inner.tx.subscribe(),
        }
    }
}

/// Read-only view of a [`ShutdownSignal`].
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Non-blocking poll.
    pub fn is_signaled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the signal fires.
    pub async fn wait(&mut self) {
        // Err: every ShutdownSignal was dropped and nothing can fire it.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}
