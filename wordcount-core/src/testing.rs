//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wordcount_model::DocumentKey;

use crate::error::{Result, WordCountError};
use crate::parsing::DocumentFetcher;

#[derive(Clone, Debug)]
pub enum FetchBehaviour {
    Content(String),
    Delayed(Duration, String),
    Fail(String),
    Hang,
    Panic(String),
}

#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    documents: Arc<Mutex<HashMap<DocumentKey, FetchBehaviour>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, document: &DocumentKey, behaviour: FetchBehaviour) -> Self {
        self.insert(document, behaviour);
        self
    }

    pub fn with_content(self, document: &DocumentKey, content: &str) -> Self {
        self.with(document, FetchBehaviour::Content(content.to_string()))
    }

    pub fn insert(&self, document: &DocumentKey, behaviour: FetchBehaviour) {
        self.documents
            .lock()
            .unwrap()
            .insert(document.clone(), behaviour);
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, document: &DocumentKey) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let behaviour = self.documents.lock().unwrap().get(document).cloned();
        match behaviour {
            Some(FetchBehaviour::Content(content)) => Ok(content),
            Some(FetchBehaviour::Delayed(delay, content)) => {
                tokio::time::sleep(delay).await;
                Ok(content)
            }
            Some(FetchBehaviour::Fail(reason)) => Err(WordCountError::Fetch(reason)),
            Some(FetchBehaviour::Hang) => std::future::pending().await,
            Some(FetchBehaviour::Panic(reason)) => panic!("{reason}"),
            None => Err(WordCountError::Fetch(format!("no such document: {document}"))),
        }
    }
}
