use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};
use wordcount_model::DocumentKey;

use crate::error::{Result, WordCountError};
use crate::orchestration::config::ParserConfig;
use crate::orchestration::messages::{DocumentEvent, ScanDocument};
use crate::orchestration::recipient::Recipient;
use crate::parsing::{DocumentFetcher, Tokenizer};

const TARGET: &str = "wordcount::parser";

type ScanQueue = Arc<Mutex<mpsc::UnboundedReceiver<ScanDocument>>>;

/// Fixed-size pool of parsing workers sharing one scan queue.
///
/// Each request produces zero or more `WordsFound` batches of at most
/// `chunk_size` tokens followed by exactly one terminal event, all delivered
/// to the request's `reply_to` recipient. The worker count bounds how many
/// fetches are in flight; excess requests wait in the queue.
#[derive(Clone)]
pub struct ParserPool {
    queue: mpsc::UnboundedSender<ScanDocument>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    shutdown: CancellationToken,
    worker_count: usize,
}

impl fmt::Debug for ParserPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserPool")
            .field("worker_count", &self.worker_count)
            .field("running", &!self.shutdown.is_cancelled())
            .finish()
    }
}

impl ParserPool {
    pub fn spawn(
        config: &ParserConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        tokenizer: Arc<dyn Tokenizer>,
        shutdown: CancellationToken,
    ) -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        let receiver: ScanQueue = Arc::new(Mutex::new(receiver));
        let worker_count = config.worker_count.max(1);

        let workers = (0..worker_count)
            .map(|worker_id| {
                let worker = ParserWorker {
                    worker_id,
                    fetcher: Arc::clone(&fetcher),
                    tokenizer: Arc::clone(&tokenizer),
                    chunk_size: config.chunk_size.max(1),
                    fetch_timeout: config.fetch_timeout(),
                    shutdown: shutdown.clone(),
                };
                let span = info_span!(target: TARGET, "parser_worker", worker_id);
                tokio::spawn(worker.run(Arc::clone(&receiver)).instrument(span))
            })
            .collect();

        Self {
            queue,
            workers: Arc::new(Mutex::new(workers)),
            shutdown,
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Queues a scan. When the pool has shut down the caller immediately
    /// receives `DocumentScanFailed`, so it never waits on a dead pool.
    pub fn scan(&self, request: ScanDocument) {
        if self.shutdown.is_cancelled() {
            reject(request);
            return;
        }
        if let Err(mpsc::error::SendError(request)) = self.queue.send(request) {
            reject(request);
        }
    }

    /// Stops every worker. In-flight fetches are abandoned and report a
    /// cancellation to their callers.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Waits for all workers to exit after [`ParserPool::shutdown`].
    pub async fn join(&self) {
        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            if let Err(err) = worker.await {
                warn!(target: TARGET, error = %err, "parser worker panicked");
            }
        }
    }
}

fn reject(request: ScanDocument) {
    warn!(target: TARGET, document = %request.document, "parser pool is shut down; rejecting scan");
    let _ = request.reply_to.tell(DocumentEvent::DocumentScanFailed {
        document: request.document,
        reason: WordCountError::Cancelled("parser pool is shut down".into()).to_string(),
    });
}

struct ParserWorker {
    worker_id: usize,
    fetcher: Arc<dyn DocumentFetcher>,
    tokenizer: Arc<dyn Tokenizer>,
    chunk_size: usize,
    fetch_timeout: Duration,
    shutdown: CancellationToken,
}

impl ParserWorker {
    async fn run(self, queue: ScanQueue) {
        debug!(target: TARGET, worker_id = self.worker_id, "parser worker started");
        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => None,
                request = async {
                    let mut rx = queue.lock().await;
                    rx.recv().await
                } => request,
            };

            let Some(request) = next else {
                break;
            };
            self.process(request).await;
        }
        debug!(target: TARGET, worker_id = self.worker_id, "parser worker stopped");
    }

    async fn process(&self, request: ScanDocument) {
        let ScanDocument { document, reply_to } = request;
        debug!(target: TARGET, worker_id = self.worker_id, document = %document, "scanning document");

        let terminal = match self.scan(&document).await {
            Ok(tokens) => {
                if !self.emit(&document, tokens, &reply_to) {
                    return;
                }
                DocumentEvent::EndOfDocumentReached { document }
            }
            Err(err) => {
                warn!(
                    target: TARGET,
                    document = %document,
                    transient = err.is_transient(),
                    error = %err,
                    "document scan failed"
                );
                DocumentEvent::DocumentScanFailed {
                    document,
                    reason: err.to_string(),
                }
            }
        };

        if reply_to.tell(terminal).is_err() {
            debug!(target: TARGET, worker_id = self.worker_id, "scan requester went away");
        }
    }

    async fn scan(&self, document: &DocumentKey) -> Result<Vec<String>> {
        let fetcher = Arc::clone(&self.fetcher);
        let target = document.clone();
        let mut fetch = tokio::spawn(async move { fetcher.fetch(&target).await });

        let fetched = tokio::select! {
            _ = self.shutdown.cancelled() => {
                Err(WordCountError::Cancelled("parser pool shutting down".into()))
            }
            joined = time::timeout(self.fetch_timeout, &mut fetch) => match joined {
                Err(_) => Err(WordCountError::Timeout(self.fetch_timeout)),
                Ok(Err(e)) => Err(WordCountError::Internal(format!("fetch task failed: {e}"))),
                Ok(Ok(result)) => result,
            },
        };
        // No-op once the fetch has completed.
        fetch.abort();
        let content = fetched?;

        let tokenizer = Arc::clone(&self.tokenizer);
        tokio::task::spawn_blocking(move || tokenizer.tokenize(&content))
            .await
            .map_err(|e| WordCountError::Parse(format!("tokenizer task failed: {e}")))?
    }

    /// Sends `tokens` in batches. Returns false once the requester is gone.
    fn emit(
        &self,
        document: &DocumentKey,
        tokens: Vec<String>,
        reply_to: &Recipient<DocumentEvent>,
    ) -> bool {
        let mut tokens = tokens.into_iter();
        loop {
            let batch: Vec<String> = tokens.by_ref().take(self.chunk_size).collect();
            if batch.is_empty() {
                return true;
            }
            let event = DocumentEvent::WordsFound {
                document: document.clone(),
                tokens: batch,
            };
            if reply_to.tell(event).is_err() {
                debug!(target: TARGET, document = %document, "scan requester went away; dropping output");
                return false;
            }
        }
    }
}
