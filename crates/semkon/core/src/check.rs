//! Proof checking with a bounded worker pool.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{SemkonError, SemkonResult};
use crate::oracle::{CheckRequest, Oracle};
use crate::orchestrator::ScanProgress;
use crate::types::{CorrectnessExplanation, PropertyLocation};

/// Default number of concurrent checks.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Judges proofs against the repository through an [`Oracle`].
#[derive(Clone)]
pub struct Checker {
    oracle: Arc<dyn Oracle>,
    root: PathBuf,
    concurrency: usize,
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker")
            .field("oracle", &self.oracle.name())
            .field("root", &self.root)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Checker {
    pub fn new(oracle: Arc<dyn Oracle>, root: impl Into<PathBuf>) -> Self {
        Self {
            oracle,
            root: root.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Pool size; values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Check a single location.
    pub async fn check(&self, location: &PropertyLocation) -> SemkonResult<CorrectnessExplanation> {
        info!(location = %location, "checking");
        let request = CheckRequest::new(&self.root, location.clone());
        let verdict = self
            .oracle
            .check(&request)
            .await
            .map_err(|e| SemkonError::oracle(location, e))?;
        debug!(location = %location, verdict = %verdict.correctness, "checked");
        Ok(verdict)
    }

    /// Check every location; the output is index-aligned with the input.
    ///
    /// Workers pull from a shared queue and write into the slot of the
    /// location's original position, so completion order never affects the
    /// result order. The first failure aborts the remaining work.
    pub async fn check_all(
        &self,
        locations: &[PropertyLocation],
        progress: &dyn ScanProgress,
    ) -> SemkonResult<Vec<CorrectnessExplanation>> {
        let total = locations.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let queue = Arc::new(Mutex::new(
            locations.iter().cloned().enumerate().collect::<VecDeque<_>>(),
        ));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pool = JoinSet::new();

        let workers = self.concurrency.min(total);
        debug!(workers, total, "starting check pool");
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let checker = self.clone();
            pool.spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, location)) = next else {
                        break;
                    };
                    let result = checker.check(&location).await;
                    let failed = result.is_err();
                    if tx.send((index, result)).is_err() || failed {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut slots: Vec<Option<CorrectnessExplanation>> = vec![None; total];
        while let Some((index, result)) = rx.recv().await {
            // Returning here drops the pool, which aborts in-flight checks.
            let verdict = result?;
            progress.check_finished(&locations[index], &verdict);
            slots[index] = Some(verdict);
        }

        while let Some(joined) = pool.join_next().await {
            joined.map_err(|e| SemkonError::Join(e.to_string()))?;
        }

        slots
            .into_iter()
            .zip(locations)
            .map(|(slot, location)| {
                slot.ok_or_else(|| SemkonError::Join(format!("no verdict produced for {location}")))
            })
            .collect()
    }
}
