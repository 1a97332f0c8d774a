use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;
use wordcount_model::DocumentKey;

use super::event_bus::InProcJobEventBus;
use crate::error::Result;
use crate::orchestration::actors::{
    AggregatorRegistry, JobDependencies, JobHandle, JobOrchestrator, ParserPool,
};
use crate::orchestration::config::OrchestratorConfig;
use crate::parsing::{DocumentFetcher, HtmlTextTokenizer, HttpFetcher, Tokenizer};

/// Owns the long-lived services shared by every job in one process: the
/// aggregator registry, the parser pool and the job event bus.
///
/// Must be created inside a tokio runtime; the parser workers are spawned
/// immediately.
pub struct WordCountRuntime {
    config: OrchestratorConfig,
    registry: AggregatorRegistry,
    parsers: ParserPool,
    events: Arc<InProcJobEventBus>,
    shutdown_token: CancellationToken,
}

impl fmt::Debug for WordCountRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordCountRuntime")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("parsers", &self.parsers)
            .field("events", &self.events)
            .field("shutdown_cancelled", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

impl WordCountRuntime {
    /// Runtime fetching over HTTP and tokenizing visible HTML text.
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.parser)?;
        Self::with_collaborators(config, Arc::new(fetcher), Arc::new(HtmlTextTokenizer))
    }

    pub fn with_collaborators(
        config: OrchestratorConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self> {
        config.validate()?;

        let shutdown_token = CancellationToken::new();
        let parsers = ParserPool::spawn(
            &config.parser,
            fetcher,
            tokenizer,
            shutdown_token.child_token(),
        );
        let registry = AggregatorRegistry::new(config.aggregator);
        let events = Arc::new(InProcJobEventBus::new(config.events.channel_capacity));

        info!(
            workers = config.parser.worker_count,
            chunk_size = config.parser.chunk_size,
            deadline_ms = config.job.deadline_ms,
            "word count runtime started"
        );

        Ok(Self {
            config,
            registry,
            parsers,
            events,
            shutdown_token,
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn events(&self) -> Arc<InProcJobEventBus> {
        Arc::clone(&self.events)
    }

    pub fn registry(&self) -> &AggregatorRegistry {
        &self.registry
    }

    /// Spawns an idle job that stashes messages until started.
    pub fn spawn_job(&self) -> JobHandle {
        let deps = JobDependencies {
            registry: self.registry.clone(),
            parsers: self.parsers.clone(),
            events: self.events.clone(),
        };
        JobOrchestrator::spawn(deps, &self.config.job, self.shutdown_token.child_token())
    }

    /// Spawns a job and immediately submits `documents`.
    pub fn start_job(&self, documents: Vec<DocumentKey>) -> Result<JobHandle> {
        let job = self.spawn_job();
        job.start(documents)?;
        Ok(job)
    }

    /// Stops the parser workers and drops idle jobs. Running jobs still
    /// finish: pending scans fail and the job deadline bounds the rest.
    pub async fn shutdown(&self) {
        info!("Initiating shutdown of word count runtime");
        self.shutdown_token.cancel();
        self.parsers.join().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}
