use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wordcount_model::{DocumentKey, ProcessingStatus};

use super::actors::JobId;

/// Lifecycle notification emitted by a job orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub occurred_at: DateTime<Utc>,
    pub payload: JobEventPayload,
}

impl JobEvent {
    pub fn new(job_id: JobId, payload: JobEventPayload) -> Self {
        Self {
            job_id,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventPayload {
    Started {
        documents: Vec<DocumentKey>,
    },
    DocumentStatusChanged {
        document: DocumentKey,
        status: ProcessingStatus,
    },
    Finished {
        completed: usize,
        failed: usize,
        timed_out: usize,
        distinct_words: usize,
        /// True when the job deadline forced finalization.
        forced: bool,
    },
}

/// Sink for job lifecycle events. Publishing must not block the job.
pub trait JobEventPublisher: Send + Sync + fmt::Debug {
    fn publish(&self, event: JobEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopJobEventPublisher;

impl JobEventPublisher for NoopJobEventPublisher {
    fn publish(&self, _event: JobEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_are_tagged_by_type() {
        let document = DocumentKey::parse("http://example.com/a").unwrap();
        let event = JobEvent::new(
            JobId::new(),
            JobEventPayload::DocumentStatusChanged {
                document,
                status: ProcessingStatus::FailedTimeout,
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["payload"]["type"], "document_status_changed");
        assert_eq!(json["payload"]["document"], "http://example.com/a");
        assert_eq!(json["payload"]["status"], "failed_timeout");

        let back: JobEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.payload, event.payload);
    }
}
