use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;
use wordcount_model::{DocumentKey, ProcessingStatus, WordFrequencyTable, merge_word_counts};

use super::parser::ParserPool;
use super::registry::AggregatorRegistry;
use crate::error::{Result, WordCountError};
use crate::orchestration::config::JobConfig;
use crate::orchestration::events::{JobEvent, JobEventPayload, JobEventPublisher};
use crate::orchestration::messages::{
    AggregatorCommand, AggregatorKey, CountsTabulatedForDocument, CountsTabulatedForDocuments,
    DocumentEvent, JobMessage, ScanDocument,
};
use crate::orchestration::recipient::{Recipient, RecipientId, SubscriberSet};

const TARGET: &str = "wordcount::job";

/// Unique identifier for word count jobs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared services a job drives.
#[derive(Clone, Debug)]
pub struct JobDependencies {
    pub registry: AggregatorRegistry,
    pub parsers: ParserPool,
    pub events: Arc<dyn JobEventPublisher>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Per-job context that outlives state transitions.
struct JobContext {
    job_id: JobId,
    address: RecipientId,
    sender: mpsc::UnboundedSender<JobMessage>,
    deps: JobDependencies,
    deadline: Duration,
}

impl JobContext {
    fn aggregator_key(&self, document: DocumentKey) -> AggregatorKey {
        AggregatorKey::new(self.job_id, document)
    }

    fn publish(&self, payload: JobEventPayload) {
        self.deps.events.publish(JobEvent::new(self.job_id, payload));
    }

    fn arm_deadline(&self, cancel: CancellationToken) {
        let sender = self.sender.clone();
        let deadline = self.deadline;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = time::sleep(deadline) => {
                    let _ = sender.send(JobMessage::JobTimeout);
                }
            }
        });
    }
}

enum JobState {
    Idle { stash: VecDeque<JobMessage> },
    Running(RunningJob),
}

struct RunningJob {
    documents: Vec<DocumentKey>,
    statuses: BTreeMap<DocumentKey, ProcessingStatus>,
    results: HashMap<DocumentKey, WordFrequencyTable>,
    subscribers: SubscriberSet<CountsTabulatedForDocuments>,
    deadline: CancellationToken,
    started_at: Instant,
}

/// Coordinates one batch from `Start` to the merged result.
///
/// While idle every message is stashed in arrival order. `ScanDocuments`
/// starts parsing and aggregation for each key, arms the job deadline and
/// replays the stash. The job finishes once every document is terminal or the
/// deadline fires, publishes the merged counts to each subscriber exactly
/// once and then stops; later messages are discarded with the mailbox.
pub struct JobOrchestrator {
    ctx: JobContext,
    state: JobState,
}

impl fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("JobOrchestrator");
        s.field("job_id", &self.ctx.job_id);
        match &self.state {
            JobState::Idle { stash } => s.field("state", &"idle").field("stashed", &stash.len()),
            JobState::Running(job) => s
                .field("state", &"running")
                .field("documents", &job.documents.len())
                .field("subscribers", &job.subscribers.len()),
        };
        s.finish()
    }
}

impl JobOrchestrator {
    /// Spawns an idle job. It waits for `Start` until `shutdown` fires or
    /// every [`JobHandle`] is dropped; once running it always finishes on its
    /// own.
    pub fn spawn(deps: JobDependencies, config: &JobConfig, shutdown: CancellationToken) -> JobHandle {
        let job_id = JobId::new();
        let (sender, mailbox) = mpsc::unbounded_channel();
        let released = CancellationToken::new();
        let job = JobOrchestrator {
            ctx: JobContext {
                job_id,
                address: RecipientId::new(),
                sender: sender.clone(),
                deps,
                deadline: config.deadline(),
            },
            state: JobState::Idle {
                stash: VecDeque::new(),
            },
        };

        let span = info_span!(target: TARGET, "job", job_id = %job_id);
        tokio::spawn(job.run(mailbox, shutdown, released.clone()).instrument(span));
        JobHandle {
            job_id,
            sender,
            _release: Arc::new(released.drop_guard()),
        }
    }

    fn is_idle(&self) -> bool {
        matches!(self.state, JobState::Idle { .. })
    }

    /// The job holds its own sender, so a closed mailbox never ends the loop.
    /// An idle job instead stops on shutdown or once `released` fires, which
    /// happens when the last handle is dropped. Queued messages win both
    /// races, so a `Start` sent just before the handle went away still runs.
    async fn run(
        mut self,
        mut mailbox: mpsc::UnboundedReceiver<JobMessage>,
        shutdown: CancellationToken,
        released: CancellationToken,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                message = mailbox.recv() => message,
                _ = shutdown.cancelled(), if self.is_idle() => {
                    debug!(target: TARGET, job_id = %self.ctx.job_id, "runtime shutting down; dropping idle job");
                    None
                }
                _ = released.cancelled(), if self.is_idle() => {
                    debug!(target: TARGET, job_id = %self.ctx.job_id, "every handle dropped before start; dropping idle job");
                    None
                }
            };

            let Some(message) = next else {
                break;
            };
            if self.handle(message) == Flow::Stop {
                break;
            }
        }
        debug!(target: TARGET, job_id = %self.ctx.job_id, "job stopped");
    }

    fn handle(&mut self, message: JobMessage) -> Flow {
        match &mut self.state {
            JobState::Idle { stash } => match message {
                JobMessage::ScanDocuments(batch) => {
                    let stash = std::mem::take(stash);
                    self.start(batch, stash)
                }
                other => {
                    debug!(target: TARGET, kind = other.kind(), "job idle; stashing message");
                    stash.push_back(other);
                    Flow::Continue
                }
            },
            JobState::Running(job) => job.handle(&self.ctx, message),
        }
    }

    fn start(&mut self, batch: Vec<DocumentKey>, stash: VecDeque<JobMessage>) -> Flow {
        let mut seen = HashSet::new();
        let documents: Vec<DocumentKey> = batch
            .into_iter()
            .filter(|document| seen.insert(document.clone()))
            .collect();

        info!(
            target: TARGET,
            job_id = %self.ctx.job_id,
            documents = documents.len(),
            stashed = stash.len(),
            "starting job"
        );

        let deadline = CancellationToken::new();
        let mut job = RunningJob {
            statuses: documents
                .iter()
                .map(|document| (document.clone(), ProcessingStatus::Processing))
                .collect(),
            documents,
            results: HashMap::new(),
            subscribers: SubscriberSet::new(),
            deadline: deadline.clone(),
            started_at: Instant::now(),
        };

        self.ctx.publish(JobEventPayload::Started {
            documents: job.documents.clone(),
        });

        let scan_replies: Recipient<DocumentEvent> =
            Recipient::with_id(self.ctx.address, self.ctx.sender.clone());
        let completion_replies: Recipient<CountsTabulatedForDocument> =
            Recipient::with_id(self.ctx.address, self.ctx.sender.clone());

        for document in job.documents.clone() {
            let key = self.ctx.aggregator_key(document.clone());
            let subscribe = AggregatorCommand::SubscribeOnCompletion {
                key: key.clone(),
                requester: completion_replies.clone(),
            };
            if let Err(err) = self.ctx.deps.registry.route(&key, subscribe) {
                error!(target: TARGET, document = %document, error = %err, "could not subscribe to aggregator");
                job.transition(&self.ctx, &document, ProcessingStatus::FailedError);
                continue;
            }
            self.ctx.deps.parsers.scan(ScanDocument {
                document,
                reply_to: scan_replies.clone(),
            });
        }

        self.ctx.arm_deadline(deadline);
        self.state = JobState::Running(job);

        let JobState::Running(job) = &mut self.state else {
            return Flow::Stop;
        };
        for message in stash {
            if job.handle(&self.ctx, message) == Flow::Stop {
                return Flow::Stop;
            }
        }
        job.finalize_if_complete(&self.ctx)
    }
}

impl RunningJob {
    fn handle(&mut self, ctx: &JobContext, message: JobMessage) -> Flow {
        match message {
            JobMessage::Document(DocumentEvent::WordsFound { document, tokens }) => {
                if self.accepts(&document, "words_found") {
                    let key = ctx.aggregator_key(document);
                    self.relay(ctx, AggregatorCommand::WordsFound { key, tokens })
                } else {
                    Flow::Continue
                }
            }
            JobMessage::Document(DocumentEvent::EndOfDocumentReached { document }) => {
                if self.accepts(&document, "end_of_document") {
                    let key = ctx.aggregator_key(document);
                    self.relay(ctx, AggregatorCommand::EndOfDocumentReached { key })
                } else {
                    Flow::Continue
                }
            }
            JobMessage::Document(DocumentEvent::DocumentScanFailed { document, reason }) => {
                if !self.accepts(&document, "scan_failed") {
                    return Flow::Continue;
                }
                error!(target: TARGET, job_id = %ctx.job_id, document = %document, reason = %reason, "document scan failed");
                self.transition(ctx, &document, ProcessingStatus::FailedError);
                self.finalize_if_complete(ctx)
            }
            JobMessage::CountsTabulated(CountsTabulatedForDocument { document, counts }) => {
                if !self.accepts(&document, "counts_tabulated") {
                    return Flow::Continue;
                }
                debug!(target: TARGET, document = %document, distinct_words = counts.len(), "document counts received");
                self.results.insert(document.clone(), counts);
                self.transition(ctx, &document, ProcessingStatus::Completed);
                self.finalize_if_complete(ctx)
            }
            JobMessage::JobTimeout => {
                let pending: Vec<DocumentKey> = self
                    .statuses
                    .iter()
                    .filter(|(_, status)| !status.is_terminal())
                    .map(|(document, _)| document.clone())
                    .collect();
                warn!(
                    target: TARGET,
                    job_id = %ctx.job_id,
                    pending = pending.len(),
                    elapsed = ?self.started_at.elapsed(),
                    "job deadline reached; forcing completion"
                );
                for document in &pending {
                    self.transition(ctx, document, ProcessingStatus::FailedTimeout);
                }
                self.finalize(ctx, true);
                Flow::Stop
            }
            JobMessage::SubscribeToAllCounts(requester) => {
                if !self.subscribers.insert(requester) {
                    debug!(target: TARGET, "subscriber already registered");
                }
                Flow::Continue
            }
            JobMessage::ScanDocuments(batch) => {
                warn!(
                    target: TARGET,
                    job_id = %ctx.job_id,
                    rejected = batch.len(),
                    "job already running; rejecting second start"
                );
                Flow::Continue
            }
        }
    }

    /// True when `document` belongs to this batch and has not reached a
    /// terminal status yet.
    fn accepts(&self, document: &DocumentKey, kind: &'static str) -> bool {
        match self.statuses.get(document) {
            None => {
                warn!(target: TARGET, document = %document, kind, "message for a document outside the batch; ignoring");
                false
            }
            Some(status) if status.is_terminal() => {
                debug!(target: TARGET, document = %document, %status, kind, "document already terminal; ignoring");
                false
            }
            Some(_) => true,
        }
    }

    fn relay(&mut self, ctx: &JobContext, command: AggregatorCommand) -> Flow {
        let key = command.key().clone();
        match ctx.deps.registry.route(&key, command) {
            Ok(()) => Flow::Continue,
            Err(err) => {
                error!(target: TARGET, document = %key.document, error = %err, "could not reach aggregator");
                self.transition(ctx, &key.document, ProcessingStatus::FailedError);
                self.finalize_if_complete(ctx)
            }
        }
    }

    fn transition(&mut self, ctx: &JobContext, document: &DocumentKey, next: ProcessingStatus) {
        let Some(status) = self.statuses.get_mut(document) else {
            return;
        };
        match status.advance(next) {
            Ok(()) => ctx.publish(JobEventPayload::DocumentStatusChanged {
                document: document.clone(),
                status: next,
            }),
            Err(err) => warn!(target: TARGET, document = %document, error = %err, "status change rejected"),
        }
    }

    fn finalize_if_complete(&mut self, ctx: &JobContext) -> Flow {
        if self.statuses.values().all(ProcessingStatus::is_terminal) {
            self.finalize(ctx, false);
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn finalize(&mut self, ctx: &JobContext, forced: bool) {
        self.deadline.cancel();

        for document in &self.documents {
            let status = self.statuses[document];
            let words = self
                .results
                .get(document)
                .map(WordFrequencyTable::total_words)
                .unwrap_or(0);
            info!(target: TARGET, job_id = %ctx.job_id, document = %document, %status, words, "document summary");
        }

        let counts = merge_word_counts(
            self.documents
                .iter()
                .filter(|document| self.statuses[*document] == ProcessingStatus::Completed)
                .filter_map(|document| self.results.get(document)),
        );
        let tally = |wanted: ProcessingStatus| self.statuses.values().filter(|s| **s == wanted).count();
        let completed = tally(ProcessingStatus::Completed);
        let failed = tally(ProcessingStatus::FailedError);
        let timed_out = tally(ProcessingStatus::FailedTimeout);

        let report = CountsTabulatedForDocuments {
            documents: self.documents.clone(),
            statuses: self.statuses.clone(),
            counts,
        };
        let delivered = self.subscribers.notify_all(&report);

        info!(
            target: TARGET,
            job_id = %ctx.job_id,
            completed,
            failed,
            timed_out,
            distinct_words = report.counts.len(),
            delivered,
            forced,
            elapsed = ?self.started_at.elapsed(),
            "job finished"
        );
        ctx.publish(JobEventPayload::Finished {
            completed,
            failed,
            timed_out,
            distinct_words: report.counts.len(),
            forced,
        });
    }
}

/// Client side of a job. Dropping every clone before `start` lets the idle
/// job stop.
#[derive(Clone, Debug)]
pub struct JobHandle {
    job_id: JobId,
    sender: mpsc::UnboundedSender<JobMessage>,
    _release: Arc<DropGuard>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.job_id
    }

    /// Submits the batch. Only the first start of a job is honoured.
    pub fn start(&self, documents: Vec<DocumentKey>) -> Result<()> {
        self.send(JobMessage::ScanDocuments(documents))
    }

    pub fn subscribe_with(&self, requester: Recipient<CountsTabulatedForDocuments>) -> Result<()> {
        self.send(JobMessage::SubscribeToAllCounts(requester))
    }

    /// Registers a fresh subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<CountsTabulatedForDocuments>> {
        let (requester, receiver) = Recipient::channel();
        self.subscribe_with(requester)?;
        Ok(receiver)
    }

    /// Waits for the merged outcome. Fails with `JobTerminated` when the job
    /// has already published its result or was dropped while idle.
    pub async fn results(&self) -> Result<CountsTabulatedForDocuments> {
        let mut receiver = self.subscribe()?;
        receiver.recv().await.ok_or(WordCountError::JobTerminated)
    }

    pub fn is_finished(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, message: JobMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| WordCountError::JobTerminated)
    }
}
