use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info_span, warn};
use super::aggregator::{DocumentAggregator, aggregator_name};
use crate::error::{Result, WordCountError};
use crate::orchestration::config::AggregatorConfig;
use crate::orchestration::messages::{AggregatorCommand, AggregatorKey};

const TARGET: &str = "wordcount::registry";
/// How many times a closed mailbox is replaced by a fresh aggregator before
/// routing gives up.
const MAX_RECREATE_ATTEMPTS: usize = 3;

#[derive(Clone)]
struct AggregatorSlot {
    generation: u64,
    mailbox: mpsc::UnboundedSender<AggregatorCommand>,
}

type SlotMap = DashMap<AggregatorKey, AggregatorSlot>;

/// Lazily creates and addresses one [`DocumentAggregator`] per
/// [`AggregatorKey`], so every job counts its documents in tables of its own.
///
/// Lookup-or-create is atomic per key, so concurrent routers converge on a
/// single live instance. An aggregator that goes idle removes its own slot
/// (guarded by its generation) before closing its mailbox; a router that
/// races with that sees the closed mailbox, drops the stale slot and creates
/// a fresh instance.
#[derive(Clone)]
pub struct AggregatorRegistry {
    slots: Arc<SlotMap>,
    generations: Arc<AtomicU64>,
    config: AggregatorConfig,
}

impl fmt::Debug for AggregatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatorRegistry")
            .field("live_aggregators", &self.slots.len())
            .field("idle_timeout", &self.config.idle_timeout())
            .finish()
    }
}

impl AggregatorRegistry {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            generations: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Routes `command` to the aggregator named by the command's own key.
    pub fn tell(&self, command: AggregatorCommand) -> Result<()> {
        let key = command.key().clone();
        self.route(&key, command)
    }

    /// Delivers `command` to the aggregator owning `key`, creating it when
    /// none is live.
    pub fn route(&self, key: &AggregatorKey, command: AggregatorCommand) -> Result<()> {
        let mut command = command;
        for _ in 0..MAX_RECREATE_ATTEMPTS {
            let slot = self.get_or_spawn(key);
            match slot.mailbox.send(command) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(returned)) => {
                    debug!(
                        target: TARGET,
                        job_id = %key.job_id,
                        document = %key.document,
                        generation = slot.generation,
                        "aggregator mailbox closed; recreating"
                    );
                    self.slots
                        .remove_if(key, |_, current| current.generation == slot.generation);
                    command = returned;
                }
            }
        }

        warn!(
            target: TARGET,
            job_id = %key.job_id,
            document = %key.document,
            kind = command.kind(),
            "could not reach a live aggregator"
        );
        Err(WordCountError::MailboxClosed)
    }

    /// Number of aggregators currently registered.
    pub fn live_aggregators(&self) -> usize {
        self.slots.len()
    }

    pub fn contains(&self, key: &AggregatorKey) -> bool {
        self.slots.contains_key(key)
    }

    fn get_or_spawn(&self, key: &AggregatorKey) -> AggregatorSlot {
        if let Some(slot) = self.slots.get(key) {
            return slot.clone();
        }

        self.slots
            .entry(key.clone())
            .or_insert_with(|| self.spawn(key))
            .clone()
    }

    fn spawn(&self, key: &AggregatorKey) -> AggregatorSlot {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let (mailbox, receiver) = mpsc::unbounded_channel();
        let aggregator = DocumentAggregator::new(key.clone(), self.config.idle_timeout());

        let slots: Weak<SlotMap> = Arc::downgrade(&self.slots);
        let owned = key.clone();
        let evict = move || {
            if let Some(slots) = slots.upgrade() {
                slots.remove_if(&owned, |_, current| current.generation == generation);
            }
        };

        let span = info_span!(target: TARGET, "aggregator", name = %aggregator_name(key), generation);
        tokio::spawn(aggregator.run(receiver, evict).instrument(span));
        debug!(target: TARGET, job_id = %key.job_id, document = %key.document, generation, "aggregator created");

        AggregatorSlot {
            generation,
            mailbox,
        }
    }
}
