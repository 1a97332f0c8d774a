//! Message protocol exchanged between the orchestration actors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use wordcount_model::{DocumentKey, ProcessingStatus, WordFrequencyTable};

use super::actors::JobId;
use super::recipient::Recipient;

/// Events a parser emits for one scanned document.
///
/// Zero or more `WordsFound` batches are always followed by exactly one of
/// `EndOfDocumentReached` or `DocumentScanFailed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentEvent {
    WordsFound {
        document: DocumentKey,
        tokens: Vec<String>,
    },
    EndOfDocumentReached {
        document: DocumentKey,
    },
    DocumentScanFailed {
        document: DocumentKey,
        reason: String,
    },
}

impl DocumentEvent {
    pub fn document(&self) -> &DocumentKey {
        match self {
            DocumentEvent::WordsFound { document, .. }
            | DocumentEvent::EndOfDocumentReached { document }
            | DocumentEvent::DocumentScanFailed { document, .. } => document,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentEvent::WordsFound { .. })
    }
}

/// Request for the parser pool; events are delivered to `reply_to`.
#[derive(Clone, Debug)]
pub struct ScanDocument {
    pub document: DocumentKey,
    pub reply_to: Recipient<DocumentEvent>,
}

/// Finalized counts for a single document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsTabulatedForDocument {
    pub document: DocumentKey,
    pub counts: WordFrequencyTable,
}

/// Merged outcome of a whole job, published once to every job subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsTabulatedForDocuments {
    /// Batch keys in submission order.
    pub documents: Vec<DocumentKey>,
    /// Terminal status of every document in the batch.
    pub statuses: BTreeMap<DocumentKey, ProcessingStatus>,
    /// Sum of the tables of every completed document.
    pub counts: WordFrequencyTable,
}

impl CountsTabulatedForDocuments {
    pub fn status_of(&self, document: &DocumentKey) -> Option<ProcessingStatus> {
        self.statuses.get(document).copied()
    }

    pub fn completed(&self) -> usize {
        self.statuses
            .values()
            .filter(|status| **status == ProcessingStatus::Completed)
            .count()
    }
}

/// Identity of one aggregator: a document as counted for one job.
///
/// Two jobs scanning the same document never share a table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregatorKey {
    pub job_id: JobId,
    pub document: DocumentKey,
}

impl AggregatorKey {
    pub fn new(job_id: JobId, document: DocumentKey) -> Self {
        Self { job_id, document }
    }
}

impl fmt::Display for AggregatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.job_id, self.document)
    }
}

/// Messages routed to a document aggregator through the registry.
#[derive(Clone, Debug)]
pub enum AggregatorCommand {
    WordsFound {
        key: AggregatorKey,
        tokens: Vec<String>,
    },
    EndOfDocumentReached {
        key: AggregatorKey,
    },
    /// `requester` receives the finalized table exactly once.
    SubscribeOnCompletion {
        key: AggregatorKey,
        requester: Recipient<CountsTabulatedForDocument>,
    },
}

impl AggregatorCommand {
    pub fn key(&self) -> &AggregatorKey {
        match self {
            AggregatorCommand::WordsFound { key, .. }
            | AggregatorCommand::EndOfDocumentReached { key }
            | AggregatorCommand::SubscribeOnCompletion { key, .. } => key,
        }
    }

    pub fn document(&self) -> &DocumentKey {
        &self.key().document
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AggregatorCommand::WordsFound { .. } => "words_found",
            AggregatorCommand::EndOfDocumentReached { .. } => "end_of_document",
            AggregatorCommand::SubscribeOnCompletion { .. } => "subscribe_on_completion",
        }
    }
}

/// Mailbox type of the job orchestrator.
#[derive(Clone, Debug)]
pub enum JobMessage {
    /// Starts the job for the given batch.
    ScanDocuments(Vec<DocumentKey>),
    /// Registers a subscriber for the merged result.
    SubscribeToAllCounts(Recipient<CountsTabulatedForDocuments>),
    /// Parser output, relayed here because the job is the scan reply target.
    Document(DocumentEvent),
    /// Aggregator completion reply.
    CountsTabulated(CountsTabulatedForDocument),
    /// Job-wide deadline fired.
    JobTimeout,
}

impl JobMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            JobMessage::ScanDocuments(_) => "scan_documents",
            JobMessage::SubscribeToAllCounts(_) => "subscribe_to_all_counts",
            JobMessage::Document(DocumentEvent::WordsFound { .. }) => "words_found",
            JobMessage::Document(DocumentEvent::EndOfDocumentReached { .. }) => {
                "end_of_document"
            }
            JobMessage::Document(DocumentEvent::DocumentScanFailed { .. }) => "scan_failed",
            JobMessage::CountsTabulated(_) => "counts_tabulated",
            JobMessage::JobTimeout => "job_timeout",
        }
    }
}

impl From<DocumentEvent> for JobMessage {
    fn from(event: DocumentEvent) -> Self {
        JobMessage::Document(event)
    }
}

impl From<CountsTabulatedForDocument> for JobMessage {
    fn from(counts: CountsTabulatedForDocument) -> Self {
        JobMessage::CountsTabulated(counts)
    }
}
