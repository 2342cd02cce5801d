//! View-scoped cancellation.
//!
//! A page owns a [`ViewScope`] and hands [`ScopeToken`]s to the loads it
//! starts. Cancelling or dropping the scope makes those loads resolve as
//! cancelled; their results are never written anywhere.

use std::future::Future;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("view scope cancelled")]
pub struct Cancelled;

#[derive(Debug)]
pub struct ViewScope {
    tx: watch::Sender<bool>,
}

impl ViewScope {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> ScopeToken {
        ScopeToken {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle held by an in-flight load.
#[derive(Debug, Clone)]
pub struct ScopeToken {
    rx: Option<watch::Receiver<bool>>,
}

impl ScopeToken {
    /// A token that is never cancelled.
    pub fn detached() -> Self {
        Self { rx: None }
    }

    /// Cancelled explicitly, or its scope is gone.
    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => {
                let cancelled = *rx.borrow();
                cancelled || rx.has_changed().is_err()
            }
            None => false,
        }
    }

    /// Resolves once the scope is cancelled or dropped. Never resolves for
    /// a detached token.
    pub async fn cancelled(&self) {
        match &self.rx {
            Some(rx) => wait_cancelled(&mut rx.clone()).await,
            None => std::future::pending().await,
        }
    }

    /// Drive `fut` unless the scope ends first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        let Some(rx) = &self.rx else {
            return Ok(fut.await);
        };
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        let mut rx = rx.clone();
        tokio::select! {
            out = fut => Ok(out),
            () = wait_cancelled(&mut rx) => Err(Cancelled),
        }
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // Sender dropped: the scope ended.
        if rx.changed().await.is_err() {
            return;
        }
    }
}
