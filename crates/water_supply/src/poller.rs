use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::Backend,
    collections::CollectionSet,
    store::{Refresh, Store},
};

/// Handle to a background task refreshing a store at a fixed interval.
/// The first refresh happens immediately.
pub struct Poller {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn<B, C>(name: &'static str, store: Arc<Store<B, C>>, every: Duration) -> Self
    where
        B: Backend,
        C: CollectionSet,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(name, store, every, token.clone()));
        Self { token, handle }
    }

    /// Stops polling and waits for a refresh in flight to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(why) = self.handle.await {
            log::error!("Poller task failed: {}", why);
        }
    }
}

async fn run<B, C>(
    name: &'static str,
    store: Arc<Store<B, C>>,
    every: Duration,
    token: CancellationToken,
) where
    B: Backend,
    C: CollectionSet,
{
    let mut interval = time::interval(every);
    // a refresh that outlives the interval must not be followed by a burst
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    log::info!("Refreshing {} every {:?}.", name, every);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        match store.refresh().await {
            Refresh::Completed(report) if !report.failures.is_empty() => {
                let failed: Vec<_> = report
                    .failures
                    .iter()
                    .map(|failure| failure.collection)
                    .collect();
                log::warn!(
                    "Refreshed {} with failures in: {}.",
                    name,
                    failed.join(", ")
                );
            }
            Refresh::Completed(report) => {
                log::debug!("Refreshed {} (#{}).", name, report.sequence);
            }
            Refresh::Skipped => {
                log::debug!("Skipped refreshing {}, previous refresh still running.", name);
            }
        }
    }
    log::info!("Stopped refreshing {}.", name);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        collections::FinanceCollections,
        memory::{MemoryBackend, ResponseMode},
    };

    #[tokio::test]
    async fn polls_until_stopped() {
        let backend = Arc::new(
            MemoryBackend::new(ResponseMode::Bare)
                .with_collection("/partners", json!([{"id": "P1", "name": "Affinity Water"}]))
                .with_collection("/invoices", json!([]))
                .with_collection("/mutual-aid/transactions", json!([])),
        );
        let store = Arc::new(Store::<_, FinanceCollections>::new(backend.clone()));

        let poller = Poller::spawn("finance", store.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(70)).await;
        poller.stop().await;

        assert!(store.is_loaded().await);
        assert_eq!(store.snapshot().await.partners.len(), 1);
        let polls = backend.requests().await.len();
        assert!(polls >= 6, "{polls} requests");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.requests().await.len(), polls);
    }
}
