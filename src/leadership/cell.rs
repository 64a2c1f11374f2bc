//! Lazily constructed, shared election instance.
//!
//! Health checks, the scheduler gate and the serving loop can all ask the
//! same [`ElectionCell`] for the election; concurrent first callers race on
//! a single construction and everyone gets the same `Arc`.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::election::LeaderElection;
use super::error::LeadershipResult;

#[derive(Default)]
pub struct ElectionCell {
    cell: OnceCell<Arc<LeaderElection>>,
}

impl ElectionCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the election, running `init` if nobody has built it yet.
    ///
    /// A failed `init` leaves the cell empty so a later caller can retry.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> LeadershipResult<Arc<LeaderElection>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LeadershipResult<LeaderElection>>,
    {
        self.cell
            .get_or_try_init(|| async move { init().await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<LeaderElection>> {
        self.cell.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leadership::{ElectionError, ElectionSettings};
    use crate::storage::MemoryAdapter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tests that concurrent first use builds exactly one election.
    ///
    /// # Purpose
    /// Several entry points may ask for the election at the same moment.
    ///
    /// # Steps
    /// 1. Spawn sixteen tasks that all initialize the same cell.
    /// 2. Count constructor calls.
    /// 3. Verify one construction and one shared instance.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_constructs_once() {
        let cell = Arc::new(ElectionCell::new());
        let constructions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cell = Arc::clone(&cell);
            let constructions = Arc::clone(&constructions);
            handles.push(tokio::spawn(async move {
                cell.get_or_try_init(|| async move {
                    constructions.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(LeaderElection::new(
                        Arc::new(MemoryAdapter::new()),
                        ElectionSettings::default(),
                    ))
                })
                .await
                .unwrap()
            }));
        }

        let mut elections = Vec::new();
        for handle in handles {
            elections.push(handle.await.unwrap());
        }

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert!(elections.iter().all(|e| Arc::ptr_eq(e, &elections[0])));
        assert!(Arc::ptr_eq(&cell.get().unwrap(), &elections[0]));
    }

    #[tokio::test]
    async fn test_failed_init_can_be_retried() {
        let cell = ElectionCell::new();
        let result = cell
            .get_or_try_init(|| async { Err(ElectionError::NoCandidates) })
            .await;
        assert!(result.is_err());
        assert!(cell.get().is_none());

        let election = cell
            .get_or_try_init(|| async {
                Ok(LeaderElection::with_id(
                    "node",
                    Arc::new(MemoryAdapter::new()),
                    ElectionSettings::default(),
                ))
            })
            .await
            .unwrap();
        assert_eq!(election.id(), "node");
    }
}
