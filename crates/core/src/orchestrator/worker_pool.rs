//! Fixed worker pool: `bound` workers pulling items from one shared queue.
//!
//! A single producer feeds the queue and stops as soon as the run is
//! cancelled; items it never handed out are dropped. The pool never grows
//! past the smaller of the bound and the batch size.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, trace};

use super::state::RunState;
use super::strategy::AdmissionStrategy;

type SharedQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Spawns `worker_count(bound, items)` long-lived workers plus one producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPoolStrategy;

#[async_trait]
impl AdmissionStrategy for WorkerPoolStrategy {
    fn name(&self) -> &'static str {
        "worker_pool"
    }

    async fn dispatch(&self, items: Vec<String>, bound: usize, state: Arc<RunState>) {
        let (tx, rx) = mpsc::channel::<String>(1);
        let queue: SharedQueue = Arc::new(Mutex::new(rx));
        let mut tasks = JoinSet::new();

        let workers = worker_count(bound, items.len());
        debug!("Starting {} workers for {} items", workers, items.len());
        for worker_id in 0..workers {
            tasks.spawn(worker_loop(worker_id, Arc::clone(&queue), Arc::clone(&state)));
        }

        let producer_state = Arc::clone(&state);
        tasks.spawn(async move {
            for id in items {
                tokio::select! {
                    biased;
                    _ = producer_state.cancelled() => {
                        debug!("Producer stopped by cancellation");
                        break;
                    }
                    sent = tx.send(id) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            // Dropping `tx` closes the queue so idle workers exit.
        });

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                state.record_join_error(e).await;
            }
        }
    }
}

/// Workers to start: one per item at most, never more than `bound`.
fn worker_count(bound: usize, items: usize) -> usize {
    bound.min(items)
}

/// Pull, fetch, record, repeat. Exits on an empty closed queue, on
/// cancellation, or after its own fetch fails.
async fn worker_loop(worker_id: usize, queue: SharedQueue, state: Arc<RunState>) {
    trace!("Worker {} started", worker_id);

    loop {
        let next = tokio::select! {
            biased;
            _ = state.cancelled() => break,
            next = next_item(&queue) => next,
        };

        let Some(id) = next else {
            break;
        };

        if !state.fetch_and_record(&id).await {
            break;
        }
    }

    trace!("Worker {} stopped", worker_id);
}

async fn next_item(queue: &SharedQueue) -> Option<String> {
    queue.lock().await.recv().await
}
