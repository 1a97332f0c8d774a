use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use wordcount_model::DocumentKey;

use crate::error::{Result, WordCountError};
use crate::orchestration::config::ParserConfig;

/// Retrieves the raw content behind a document key.
#[async_trait]
pub trait DocumentFetcher: Send + Sync + fmt::Debug {
    async fn fetch(&self, document: &DocumentKey) -> Result<String>;
}

/// Fetches `http` and `https` documents with a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpFetcher {
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let timeout = config.fetch_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WordCountError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_error(&self, err: reqwest::Error) -> WordCountError {
        if err.is_timeout() {
            WordCountError::Timeout(self.timeout)
        } else {
            WordCountError::Fetch(err.to_string())
        }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, document: &DocumentKey) -> Result<String> {
        match document.scheme() {
            "http" | "https" => {}
            other => return Err(WordCountError::UnsupportedScheme(other.to_string())),
        }

        let response = self
            .client
            .get(document.as_url().clone())
            .send()
            .await
            .map_err(|e| self.map_error(e))?
            .error_for_status()
            .map_err(|e| self.map_error(e))?;

        let body = response.text().await.map_err(|e| self.map_error(e))?;
        debug!(target: "wordcount::parser", document = %document, bytes = body.len(), "fetched document");
        Ok(body)
    }
}
