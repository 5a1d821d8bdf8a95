/// L2 block downloader.
///
/// Fetches confirmed blocks from an `L2BlockSource` in a background task and
/// hands them to the client in ordered batches.
///
/// ## Backpressure
///
/// At most `queue_size` blocks are buffered ahead of the consumer. Each
/// buffered block holds one semaphore permit; permits are returned when the
/// consumer takes the batch, which lets the producer fetch more.
///
/// ## Cancellation
///
/// Every run owns a `CancellationToken`. `stop()` cancels it, which both ends
/// the producer task and wakes any consumer suspended in `next_batch()`.
/// After `stop()` the downloader can be started again from any height.
use std::sync::Arc;
use std::time::Duration;

use containers::{BlockNumber, L2Block};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::config::P2pConfig;
use crate::block_source::L2BlockSource;

type BatchReceiver = Arc<AsyncMutex<mpsc::UnboundedReceiver<Vec<L2Block>>>>;

struct DownloaderRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    queue: BatchReceiver,
    capacity: Arc<Semaphore>,
}

pub struct L2BlockDownloader<S: L2BlockSource> {
    block_source: Arc<S>,
    queue_size: usize,
    check_interval: Duration,
    run: Mutex<Option<DownloaderRun>>,
}

impl<S: L2BlockSource> L2BlockDownloader<S> {
    pub fn new(block_source: Arc<S>, queue_size: usize, check_interval: Duration) -> Self {
        Self {
            block_source,
            queue_size: queue_size.max(1),
            check_interval,
            run: Mutex::new(None),
        }
    }

    pub fn from_config(block_source: Arc<S>, config: &P2pConfig) -> Self {
        Self::new(block_source, config.l2_queue_size, config.check_interval)
    }

    pub fn is_running(&self) -> bool {
        self.run.lock().is_some()
    }

    /// Start downloading from block `from`.
    ///
    /// Must be called from within a tokio runtime. Starting an already
    /// running downloader is a no-op.
    pub fn start(&self, from: BlockNumber) {
        let mut run = self.run.lock();
        if run.is_some() {
            warn!(from, "Block downloader already running");
            return;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let capacity = Arc::new(Semaphore::new(self.queue_size));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(produce_batches(
            self.block_source.clone(),
            from,
            sender,
            capacity.clone(),
            self.check_interval,
            cancel.clone(),
        ));

        debug!(from, queue_size = self.queue_size, "Started block downloader");

        *run = Some(DownloaderRun {
            cancel,
            task,
            queue: Arc::new(AsyncMutex::new(receiver)),
            capacity,
        });
    }

    /// Stop the producer task and wake up any pending `next_batch()` call.
    ///
    /// Blocks still sitting in the queue are dropped.
    pub async fn stop(&self) {
        let run = self.run.lock().take();
        let Some(run) = run else {
            return;
        };

        run.cancel.cancel();
        if let Err(err) = run.task.await {
            warn!("Block downloader task failed: {err}");
        }
        debug!("Stopped block downloader");
    }

    /// Wait for the next batch of blocks.
    ///
    /// Resolves with an empty batch if the downloader is not running or is
    /// stopped while waiting.
    pub async fn next_batch(&self) -> Vec<L2Block> {
        let (cancel, queue, capacity) = {
            let run = self.run.lock();
            match run.as_ref() {
                Some(run) => (run.cancel.clone(), run.queue.clone(), run.capacity.clone()),
                None => return Vec::new(),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Vec::new(),
            batch = async { queue.lock().await.recv().await } => match batch {
                Some(blocks) => {
                    capacity.add_permits(blocks.len());
                    blocks
                }
                None => Vec::new(),
            },
        }
    }
}

async fn produce_batches<S: L2BlockSource>(
    block_source: Arc<S>,
    mut next: BlockNumber,
    sender: mpsc::UnboundedSender<Vec<L2Block>>,
    capacity: Arc<Semaphore>,
    check_interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        // Wait for room in the queue before asking for more blocks
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = capacity.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        let limit = 1 + capacity.available_permits();

        let fetched = tokio::select! {
            _ = cancel.cancelled() => break,
            fetched = block_source.get_blocks(next, limit) => fetched,
        };

        match fetched {
            Ok(mut blocks) if !blocks.is_empty() => {
                blocks.truncate(limit);
                permit.forget();

                // Only the consumer returns permits, so these are available
                let extra = (blocks.len() - 1) as u32;
                if extra > 0 {
                    match capacity.acquire_many(extra).await {
                        Ok(permits) => permits.forget(),
                        Err(_) => break,
                    }
                }

                let last = blocks[blocks.len() - 1].number;
                trace!(from = next, to = last, "Downloaded blocks");
                next = last + 1;

                if sender.send(blocks).is_err() {
                    break;
                }
                continue;
            }
            Ok(_) => drop(permit),
            Err(err) => {
                drop(permit);
                warn!(from = next, "Failed to fetch blocks: {err:#}");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(check_interval) => {}
        }
    }
}
