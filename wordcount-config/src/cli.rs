use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::models::WordCounterSettings;

#[derive(Debug, Parser)]
#[command(
    name = "wordcount",
    version,
    about = "Count word occurrences across a batch of documents"
)]
pub struct Cli {
    /// Document URIs to count, appended to any configured ones
    #[arg(value_name = "URIS")]
    pub uris: Vec<String>,

    /// Settings file (TOML or JSON); overrides $WORDCOUNT_CONFIG_PATH
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Job-wide deadline, e.g. "30s" or "2m"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub deadline: Option<Duration>,

    /// Number of parser workers (concurrent fetches)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-document fetch deadline, e.g. "5s"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub fetch_timeout: Option<Duration>,

    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Number of most frequent words to print in table output
    #[arg(long, value_name = "N", default_value_t = 25)]
    pub top: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    /// Applies command line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut WordCounterSettings) {
        settings.document_uris.extend(self.uris.iter().cloned());

        if let Some(deadline) = self.deadline {
            settings.orchestrator.job.deadline_ms = duration_ms(deadline);
        }
        if let Some(workers) = self.workers {
            settings.orchestrator.parser.worker_count = workers;
        }
        if let Some(timeout) = self.fetch_timeout {
            settings.orchestrator.parser.fetch_timeout_ms = duration_ms(timeout);
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
