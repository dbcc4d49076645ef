//! Background worker that writes clicks back to the store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::domain::flush_job::FlushJob;

/// Processes one flush job. Implementations own their deadlines and never fail.
#[async_trait]
pub trait FlushHandler: Send + Sync {
    async fn flush(&self, job: FlushJob);
}

/// Drains `rx`, running up to `concurrency` flushes at once.
///
/// Returns after every sender is dropped and all in-flight flushes have
/// finished, which is what lets shutdown drain pending write-backs.
pub async fn run_flush_worker(
    mut rx: mpsc::Receiver<FlushJob>,
    handler: Arc<dyn FlushHandler>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    info!(concurrency, "Flush worker started");

    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let handler = handler.clone();
        in_flight.spawn(async move {
            debug!(code = %job.code, "Flushing clicks");
            handler.flush(job).await;
            drop(permit);
        });

        while let Some(result) = in_flight.try_join_next() {
            if let Err(e) = result {
                error!("Flush task failed: {}", e);
            }
        }
    }

    while let Some(result) = in_flight.join_next().await {
        if let Err(e) = result {
            error!("Flush task failed: {}", e);
        }
    }

    info!("Flush worker stopped");
}
