#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wordcount_core::orchestration::OrchestratorConfig;
use wordcount_core::parsing::{DocumentFetcher, WhitespaceTokenizer};
use wordcount_core::{Result, WordCountError, WordCountRuntime};
use wordcount_model::DocumentKey;

/// Canned document bodies keyed by URI.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    pages: Arc<Mutex<HashMap<DocumentKey, Page>>>,
}

#[derive(Clone, Debug)]
enum Page {
    Body(String),
    Slow(Duration, String),
    Broken(String),
    Unreachable,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, uri: &str, body: &str) -> Self {
        self.set(uri, Page::Body(body.into()))
    }

    pub fn slow_page(self, uri: &str, delay: Duration, body: &str) -> Self {
        self.set(uri, Page::Slow(delay, body.into()))
    }

    pub fn broken_page(self, uri: &str, reason: &str) -> Self {
        self.set(uri, Page::Broken(reason.into()))
    }

    pub fn unreachable_page(self, uri: &str) -> Self {
        self.set(uri, Page::Unreachable)
    }

    fn set(self, uri: &str, page: Page) -> Self {
        self.pages.lock().unwrap().insert(key(uri), page);
        self
    }
}

#[async_trait]
impl DocumentFetcher for MemoryFetcher {
    async fn fetch(&self, document: &DocumentKey) -> Result<String> {
        let page = self.pages.lock().unwrap().get(document).cloned();
        match page {
            Some(Page::Body(body)) => Ok(body),
            Some(Page::Slow(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(Page::Broken(reason)) => Err(WordCountError::Fetch(reason)),
            Some(Page::Unreachable) => std::future::pending().await,
            None => Err(WordCountError::Fetch(format!("404 for {document}"))),
        }
    }
}

pub fn key(uri: &str) -> DocumentKey {
    DocumentKey::parse(uri).expect("test uri should parse")
}

pub fn config(deadline: Duration, fetch_timeout: Duration) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.job.deadline_ms = deadline.as_millis() as u64;
    config.parser.fetch_timeout_ms = fetch_timeout.as_millis() as u64;
    config.parser.worker_count = 3;
    config.parser.chunk_size = 4;
    config
}

pub fn runtime(fetcher: MemoryFetcher, config: OrchestratorConfig) -> WordCountRuntime {
    WordCountRuntime::with_collaborators(config, Arc::new(fetcher), Arc::new(WhitespaceTokenizer))
        .expect("test runtime should build")
}
