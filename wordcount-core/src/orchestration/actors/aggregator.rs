use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, warn};
use wordcount_model::{DocumentKey, WordCounts, WordFrequencyTable};

use crate::orchestration::messages::{AggregatorCommand, AggregatorKey, CountsTabulatedForDocument};
use crate::orchestration::recipient::SubscriberSet;

const TARGET: &str = "wordcount::aggregator";

/// Deterministic name for the aggregator owning `key`.
pub fn aggregator_name(key: &AggregatorKey) -> String {
    format!(
        "word-counter-{}-{}",
        key.job_id,
        urlencoding::encode(key.document.as_str())
    )
}

enum AggregatorState {
    Collecting {
        counts: WordCounts,
        subscribers: SubscriberSet<CountsTabulatedForDocument>,
    },
    Finalized {
        snapshot: WordFrequencyTable,
    },
}

/// Accumulates token counts for exactly one document of one job and
/// finalizes once.
///
/// `Collecting` accepts token batches and queues completion subscribers.
/// `EndOfDocumentReached` freezes the table, answers every queued subscriber
/// and moves to `Finalized`, where subscribers are answered immediately with
/// the same snapshot and further token batches are dropped. The aggregator
/// terminates after an inactivity window in either state.
pub struct DocumentAggregator {
    key: AggregatorKey,
    name: String,
    idle_timeout: Duration,
    state: AggregatorState,
}

impl fmt::Debug for DocumentAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, pending) = match &self.state {
            AggregatorState::Collecting { subscribers, .. } => ("collecting", subscribers.len()),
            AggregatorState::Finalized { .. } => ("finalized", 0),
        };
        f.debug_struct("DocumentAggregator")
            .field("name", &self.name)
            .field("state", &state)
            .field("pending_subscribers", &pending)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl DocumentAggregator {
    pub fn new(key: AggregatorKey, idle_timeout: Duration) -> Self {
        Self {
            name: aggregator_name(&key),
            key,
            idle_timeout,
            state: AggregatorState::Collecting {
                counts: WordCounts::new(),
                subscribers: SubscriberSet::new(),
            },
        }
    }

    pub fn key(&self) -> &AggregatorKey {
        &self.key
    }

    pub fn document(&self) -> &DocumentKey {
        &self.key.document
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, AggregatorState::Finalized { .. })
    }

    /// The frozen table, once finalized.
    pub fn snapshot(&self) -> Option<&WordFrequencyTable> {
        match &self.state {
            AggregatorState::Finalized { snapshot } => Some(snapshot),
            AggregatorState::Collecting { .. } => None,
        }
    }

    pub fn handle(&mut self, command: AggregatorCommand) {
        if command.key() != &self.key {
            warn!(
                target: TARGET,
                aggregator = %self.name,
                received = %command.key(),
                kind = command.kind(),
                "received message for another document; dropping"
            );
            return;
        }

        if self.is_finalized() {
            self.handle_finalized(command);
        } else {
            self.handle_collecting(command);
        }
    }

    fn handle_collecting(&mut self, command: AggregatorCommand) {
        let AggregatorState::Collecting {
            counts,
            subscribers,
        } = &mut self.state
        else {
            return;
        };

        match command {
            AggregatorCommand::WordsFound { tokens, .. } => {
                debug!(
                    target: TARGET,
                    document = %self.key.document,
                    tokens = tokens.len(),
                    "ingesting token batch"
                );
                counts.add_tokens(tokens);
            }
            AggregatorCommand::SubscribeOnCompletion { requester, .. } => {
                subscribers.insert(requester);
            }
            AggregatorCommand::EndOfDocumentReached { .. } => self.finalize(),
        }
    }

    fn handle_finalized(&mut self, command: AggregatorCommand) {
        let AggregatorState::Finalized { snapshot } = &self.state else {
            return;
        };

        match command {
            AggregatorCommand::SubscribeOnCompletion { requester, .. } => {
                let reply = CountsTabulatedForDocument {
                    document: self.key.document.clone(),
                    counts: snapshot.clone(),
                };
                if requester.tell(reply).is_err() {
                    debug!(target: TARGET, document = %self.key.document, "late subscriber went away");
                }
            }
            other => {
                warn!(
                    target: TARGET,
                    document = %self.key.document,
                    kind = other.kind(),
                    "document already finalized; ignoring"
                );
            }
        }
    }

    fn finalize(&mut self) {
        let previous = std::mem::replace(
            &mut self.state,
            AggregatorState::Finalized {
                snapshot: WordFrequencyTable::empty(),
            },
        );
        let AggregatorState::Collecting {
            counts,
            mut subscribers,
        } = previous
        else {
            self.state = previous;
            return;
        };

        let snapshot = counts.freeze();
        let reply = CountsTabulatedForDocument {
            document: self.key.document.clone(),
            counts: snapshot.clone(),
        };
        let delivered = subscribers.notify_all(&reply);
        debug!(
            target: TARGET,
            document = %self.key.document,
            distinct_words = snapshot.len(),
            delivered,
            "document finalized"
        );
        self.state = AggregatorState::Finalized { snapshot };
    }

    /// Mailbox loop. `evict` runs once the inactivity window expires (or the
    /// mailbox is orphaned) and must detach this instance from its registry;
    /// anything already queued is still handled before the task ends.
    pub(crate) async fn run<F>(
        mut self,
        mut mailbox: mpsc::UnboundedReceiver<AggregatorCommand>,
        evict: F,
    ) where
        F: FnOnce(),
    {
        loop {
            match time::timeout(self.idle_timeout, mailbox.recv()).await {
                Ok(Some(command)) => self.handle(command),
                Ok(None) => break,
                Err(_) => {
                    if self.is_finalized() {
                        debug!(target: TARGET, aggregator = %self.name, "idle after finalization; stopping");
                    } else {
                        warn!(target: TARGET, document = %self.key.document, "document timed out while collecting");
                    }
                    break;
                }
            }
        }

        evict();
        mailbox.close();
        while let Ok(command) = mailbox.try_recv() {
            self.handle(command);
        }
        debug!(target: TARGET, aggregator = %self.name, "terminated");
    }
}
