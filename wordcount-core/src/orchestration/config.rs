use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WordCountError};

/// Global knobs that tune orchestrator behaviour.
///
/// All fields carry defaults so a configuration file only needs to mention
/// the values it wants to override.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Parser pool sizing, chunking and fetch deadline.
    pub parser: ParserConfig,
    /// Lifetime of per-document aggregators.
    pub aggregator: AggregatorConfig,
    /// Job-wide deadline.
    pub job: JobConfig,
    /// In-process event bus sizing.
    pub events: EventsConfig,
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.parser.worker_count == 0 {
            problems.push("parser.worker_count must be at least 1");
        }
        if self.parser.chunk_size == 0 {
            problems.push("parser.chunk_size must be at least 1");
        }
        if self.parser.fetch_timeout_ms == 0 {
            problems.push("parser.fetch_timeout_ms must be greater than zero");
        }
        if self.aggregator.idle_timeout_ms == 0 {
            problems.push("aggregator.idle_timeout_ms must be greater than zero");
        }
        if self.job.deadline_ms == 0 {
            problems.push("job.deadline_ms must be greater than zero");
        }
        if self.events.channel_capacity == 0 {
            problems.push("events.channel_capacity must be at least 1");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(WordCountError::InvalidConfig(problems.join("; ")))
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParserConfig {
    /// Number of parser workers. Bounds concurrent outbound fetches.
    pub worker_count: usize,
    /// Maximum tokens per `WordsFound` batch.
    pub chunk_size: usize,
    /// Per-fetch deadline (milliseconds).
    pub fetch_timeout_ms: u64,
    /// User agent sent by the HTTP fetcher.
    pub user_agent: String,
}

impl ParserConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            chunk_size: 20,
            fetch_timeout_ms: 5_000,
            user_agent: concat!("wordcount/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Inactivity window after which an aggregator terminates (milliseconds).
    pub idle_timeout_ms: u64,
}

impl AggregatorConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 2 * 60 * 1_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JobConfig {
    /// Deadline for a whole batch (milliseconds). Documents still processing
    /// when it fires are marked timed out.
    pub deadline_ms: u64,
}

impl JobConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self { deadline_ms: 30_000 }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.parser.worker_count, 5);
        assert_eq!(config.parser.chunk_size, 20);
        assert_eq!(config.job.deadline(), Duration::from_secs(30));
        assert_eq!(config.aggregator.idle_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn validate_reports_every_problem() {
        let mut config = OrchestratorConfig::default();
        config.parser.worker_count = 0;
        config.job.deadline_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("parser.worker_count"));
        assert!(err.contains("job.deadline_ms"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{ "parser": { "worker_count": 2 } }"#).unwrap();
        assert_eq!(config.parser.worker_count, 2);
        assert_eq!(config.parser.chunk_size, 20);
        assert_eq!(config.job, JobConfig::default());
    }
}
