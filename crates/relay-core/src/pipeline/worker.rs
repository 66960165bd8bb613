//! Delivery workers and the pool that owns them.

use parking_lot::Mutex;
use shared_types::{CanonicalId, CopyId, InboundMessage, RecipientId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{retract_with_retry, RateGate};
use crate::domain::{BroadcastLedger, CacheError, Completion, PipelineConfig, RelayCache};
use crate::ports::outbound::{MessageFormatter, Transport, TransportError};

/// Delivery of one canonical message to one recipient.
#[derive(Clone, Debug)]
pub struct DeliveryJob {
    pub canonical_id: CanonicalId,
    pub recipient: RecipientId,
    pub message: Arc<InboundMessage>,
    /// Canonical message the original replied to.
    pub reply_to: Option<CanonicalId>,
}

/// How a job ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered(CopyId),
    /// Broadcast no longer live; nothing sent.
    Cancelled,
    /// Transport gave up; counted toward completion.
    Failed,
    /// Delivered, then removed again: the message was deleted meanwhile or
    /// the recipient already held a copy.
    Retracted(CopyId),
}

/// Shared state the workers deliver against.
pub struct DeliveryContext<T, F> {
    pub transport: Arc<T>,
    pub formatter: Arc<F>,
    pub cache: Arc<RelayCache>,
    pub ledger: Arc<BroadcastLedger>,
}

type JobQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<DeliveryJob>>>;

/// Count of submitted jobs that have not finished yet.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let idle = self.idle.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Worker pool over a shared unbounded queue.
pub struct DeliveryPipeline {
    sender: Mutex<Option<mpsc::UnboundedSender<DeliveryJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    in_flight: Arc<InFlight>,
    worker_count: usize,
}

impl DeliveryPipeline {
    /// Spawn the workers on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<T, F>(config: &PipelineConfig, context: Arc<DeliveryContext<T, F>>) -> Self
    where
        T: Transport,
        F: MessageFormatter,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: JobQueue = Arc::new(tokio::sync::Mutex::new(receiver));
        let in_flight = Arc::new(InFlight::default());
        let worker_count = config.workers.max(1);

        let workers = (0..worker_count)
            .map(|worker_id| {
                let gate = RateGate::per_worker(config);
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&context),
                    gate,
                    Arc::clone(&in_flight),
                ))
            })
            .collect();

        info!(
            "[pipeline] Started {} delivery workers, {:?} between sends per worker",
            worker_count,
            config.send_interval()
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            in_flight,
            worker_count,
        }
    }

    /// Queue a job. Returns false once the pipeline has shut down.
    pub fn submit(&self, job: DeliveryJob) -> bool {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return false;
        };
        self.in_flight.begin();
        if sender.send(job).is_err() {
            self.in_flight.finish();
            return false;
        }
        true
    }

    /// Resolves once every submitted job has finished.
    pub async fn drained(&self) {
        self.in_flight.wait_idle().await;
    }

    /// Number of jobs submitted but not finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Close the queue, let workers finish what is queued, and join them.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                error!("[pipeline] Delivery worker ended abnormally: {}", e);
            }
        }
        info!("[pipeline] Delivery workers stopped");
    }
}

async fn run_worker<T, F>(
    worker_id: usize,
    queue: JobQueue,
    context: Arc<DeliveryContext<T, F>>,
    gate: RateGate,
    in_flight: Arc<InFlight>,
) where
    T: Transport,
    F: MessageFormatter,
{
    debug!("[pipeline] Worker {} started", worker_id);
    loop {
        let job = queue.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        let outcome = deliver(&context, &gate, &job).await;
        debug!(
            "[pipeline] Worker {} finished {} for {}: {:?}",
            worker_id, job.canonical_id, job.recipient, outcome
        );
        in_flight.finish();
    }
    debug!("[pipeline] Worker {} stopped", worker_id);
}

/// Run one job to completion.
pub async fn deliver<T, F>(
    context: &DeliveryContext<T, F>,
    gate: &RateGate,
    job: &DeliveryJob,
) -> JobOutcome
where
    T: Transport,
    F: MessageFormatter,
{
    if !context.ledger.is_live(job.canonical_id) {
        return JobOutcome::Cancelled;
    }

    let reply_copy = job.reply_to.and_then(|target| {
        context
            .cache
            .lookup_delivered_copy(job.recipient, target)
            .ok()
    });
    let payload = context.formatter.format(&job.message, job.recipient, reply_copy);

    loop {
        gate.acquire().await;
        match context.transport.send(job.recipient, payload.clone()).await {
            Ok(copy) => return record(context, job, copy).await,
            Err(TransportError::RateLimited { retry_after }) => {
                warn!(
                    "[pipeline] Throttled sending {} to {}, retrying in {:?}",
                    job.canonical_id, job.recipient, retry_after
                );
                tokio::time::sleep(retry_after).await;
                if !context.ledger.is_live(job.canonical_id) {
                    return JobOutcome::Cancelled;
                }
            }
            Err(e) => {
                warn!(
                    "[pipeline] Giving up on {} for {}: {}",
                    job.canonical_id, job.recipient, e
                );
                complete(context, job.canonical_id);
                return JobOutcome::Failed;
            }
        }
    }
}

async fn record<T, F>(context: &DeliveryContext<T, F>, job: &DeliveryJob, copy: CopyId) -> JobOutcome
where
    T: Transport,
    F: MessageFormatter,
{
    match context
        .cache
        .record_delivery(job.recipient, job.canonical_id, copy)
    {
        Ok(()) => {
            complete(context, job.canonical_id);
            JobOutcome::Delivered(copy)
        }
        Err(CacheError::CanonicalNotFound(_)) => {
            // Deleted while this copy was in flight
            retract_unmapped(context, job, copy).await;
            JobOutcome::Retracted(copy)
        }
        Err(e) => {
            warn!("[pipeline] {}", e);
            retract_unmapped(context, job, copy).await;
            complete(context, job.canonical_id);
            JobOutcome::Retracted(copy)
        }
    }
}

/// Remove a copy nothing maps to.
async fn retract_unmapped<T, F>(context: &DeliveryContext<T, F>, job: &DeliveryJob, copy: CopyId)
where
    T: Transport,
    F: MessageFormatter,
{
    if let Err(e) = retract_with_retry(context.transport.as_ref(), job.recipient, copy).await {
        warn!(
            "[pipeline] Could not retract unmapped copy {} of {} for {}: {}",
            copy, job.canonical_id, job.recipient, e
        );
    }
}

fn complete<T, F>(context: &DeliveryContext<T, F>, id: CanonicalId) {
    match context.ledger.record_completion(id) {
        Completion::Finished => info!("[pipeline] Broadcast {} complete", id),
        Completion::Pending { sent, total } => {
            debug!("[pipeline] Broadcast {} at {}/{}", id, sent, total)
        }
        Completion::Untracked => {}
    }
}
