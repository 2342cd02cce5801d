//! Search-as-you-type.
//!
//! Keystrokes go into a channel; a query is only sent upstream once the
//! input has been quiet for the debounce window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use shiori_api::CatalogAdapter;
use shiori_core::view::ListItem;

use crate::{PageError, Runtime, ScopeToken};

enum Step<T> {
    Input(Option<T>),
    Settled,
}

/// Wait for the next value that is not followed by another within `window`.
///
/// Each new value restarts the wait. If the channel closes mid-wait, the
/// latest value is still returned once its window elapses. Returns `None`
/// when the channel is closed and drained.
pub async fn next_settled<T>(rx: &mut mpsc::Receiver<T>, window: Duration) -> Option<T> {
    let mut latest = rx.recv().await?;
    loop {
        let sleep = tokio::time::sleep(window);
        tokio::pin!(sleep);
        let step = tokio::select! {
            value = rx.recv() => Step::Input(value),
            () = &mut sleep => Step::Settled,
        };
        match step {
            Step::Input(Some(value)) => latest = value,
            Step::Input(None) => {
                sleep.await;
                return Some(latest);
            }
            Step::Settled => return Some(latest),
        }
    }
}

#[derive(Debug)]
pub struct SearchOutcome {
    pub query: String,
    pub result: Result<Vec<ListItem>, PageError>,
}

/// A debounced search bound to one view.
///
/// Dropping the session stops the background task.
pub struct SearchSession {
    input: Option<mpsc::Sender<String>>,
    results: mpsc::Receiver<SearchOutcome>,
    task: JoinHandle<()>,
}

impl SearchSession {
    pub fn spawn<A>(runtime: Arc<Runtime<A>>, token: ScopeToken) -> Self
    where
        A: CatalogAdapter + 'static,
    {
        let window = runtime.debounce_window();
        let (input, mut keystrokes) = mpsc::channel::<String>(32);
        let (outcomes, results) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            loop {
                let settled = tokio::select! {
                    query = next_settled(&mut keystrokes, window) => query,
                    () = token.cancelled() => None,
                };
                let Some(query) = settled else {
                    break;
                };
                tracing::debug!(query = %query, "search input settled");
                let result = runtime.search(&query, &token).await;
                if matches!(result, Err(PageError::Cancelled)) && token.is_cancelled() {
                    break;
                }
                if outcomes.send(SearchOutcome { query, result }).await.is_err() {
                    break;
                }
            }
        });

        Self {
            input: Some(input),
            results,
            task,
        }
    }

    /// Feed the current contents of the search box. Returns `false` once
    /// the session has stopped.
    pub async fn input(&self, text: impl Into<String>) -> bool {
        match &self.input {
            Some(input) => input.send(text.into()).await.is_ok(),
            None => false,
        }
    }

    /// Stop accepting input. A pending query still runs; after its outcome
    /// [`next_result`](Self::next_result) yields `None`.
    pub fn close(&mut self) {
        self.input = None;
    }

    pub async fn next_result(&mut self) -> Option<SearchOutcome> {
        self.results.recv().await
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::{sleep, Instant};

    use super::*;
    use crate::testing::{entry, runtime, FakeCatalog};
    use crate::ViewScope;

    #[tokio::test(start_paused = true)]
    async fn test_next_settled_keeps_latest() {
        let (tx, mut rx) = mpsc::channel(4);
        let start = Instant::now();
        let reader = tokio::spawn(async move {
            let value = next_settled(&mut rx, Duration::from_millis(500)).await;
            (value, next_settled(&mut rx, Duration::from_millis(500)).await)
        });

        tx.send(1).await.unwrap();
        sleep(Duration::from_millis(200)).await;
        tx.send(2).await.unwrap();
        drop(tx);

        let (first, second) = reader.await.unwrap();
        assert_eq!(first, Some(2));
        assert_eq!(second, None);
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_settle_into_one_search() {
        let rt = Arc::new(runtime(FakeCatalog::new(vec![
            entry(1, "Frieren", "TV"),
            entry(2, "Made in Abyss", "TV"),
        ])));
        let mut session = SearchSession::spawn(Arc::clone(&rt), ScopeToken::detached());
        let start = Instant::now();

        for (i, text) in ["f", "fr", "fri", "frie"].into_iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(100)).await;
            }
            assert!(session.input(text).await);
        }

        let outcome = session.next_result().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(800) && elapsed < Duration::from_millis(810));
        assert_eq!(outcome.query, "frie");
        assert_eq!(outcome.result.unwrap().len(), 1);
        assert_eq!(rt.adapter().searches(), vec!["frie".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_longer_than_window_search_each_time() {
        let rt = Arc::new(runtime(FakeCatalog::new(vec![entry(1, "Frieren", "TV")])));
        let mut session = SearchSession::spawn(Arc::clone(&rt), ScopeToken::detached());

        session.input("fri").await;
        assert_eq!(session.next_result().await.unwrap().query, "fri");
        session.input("abyss").await;
        let second = session.next_result().await.unwrap();
        assert_eq!(second.query, "abyss");
        assert!(second.result.unwrap().is_empty());
        assert_eq!(rt.adapter().searches().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending_query() {
        let rt = Arc::new(runtime(FakeCatalog::new(vec![entry(1, "Frieren", "TV")])));
        let mut session = SearchSession::spawn(Arc::clone(&rt), ScopeToken::detached());

        session.input("frieren").await;
        session.close();
        assert!(!session.input("late").await);
        assert_eq!(session.next_result().await.unwrap().query, "frieren");
        assert!(session.next_result().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_scope_ends_session() {
        let rt = Arc::new(runtime(FakeCatalog::new(vec![])));
        let scope = ViewScope::new();
        let mut session = SearchSession::spawn(rt, scope.token());

        scope.cancel();
        assert!(session.next_result().await.is_none());
    }
}
