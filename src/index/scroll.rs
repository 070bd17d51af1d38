use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::warn;

use super::{BatchProducer, IndexError, ResultBatch};
use crate::http::build_client;

static INDEX_ROOT: Lazy<String> =
    Lazy::new(|| std::env::var("INDEX_URL").unwrap_or_default());

const DEFAULT_PAGE_SIZE: usize = 250;
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// Scroll cursor over the variation index, delivering documents in ascending
/// item-id order. Transient transport failures are retried with backed-off,
/// jittered delays before they surface as errors.
pub struct ScrollClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
    scroll_id: Option<String>,
    fetched: u64,
    exhausted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrollResponse {
    #[serde(default)]
    scroll_id: Option<String>,
    #[serde(flatten)]
    batch: ResultBatch,
}

impl ScrollClient {
    pub fn from_env() -> Option<Self> {
        let base = INDEX_ROOT.trim();
        if base.is_empty() {
            return None;
        }
        Some(Self::new(base))
    }

    pub fn new(base_url: &str) -> Self {
        Self {
            http: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            scroll_id: None,
            fetched: 0,
            exhausted: false,
        }
    }

    async fn execute(&self) -> Result<ScrollResponse, IndexError> {
        let response = self
            .http
            .post(format!("{}/variations/_scroll", self.base_url))
            .json(&serde_json::json!({
                "size": self.page_size,
                "scrollId": self.scroll_id,
            }))
            .send()
            .await?
            .error_for_status()?;
        response
            .json::<ScrollResponse>()
            .await
            .map_err(|err| IndexError::Deserialize(err.to_string()))
    }
}

impl BatchProducer for ScrollClient {
    fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
    }

    async fn fetch_next(&mut self) -> Result<ResultBatch, IndexError> {
        let response = with_retries(MAX_RETRIES, || self.execute()).await?;
        if response.scroll_id.is_some() {
            self.scroll_id = response.scroll_id;
        }
        let batch = response.batch;
        self.fetched += batch.documents.len() as u64;
        self.exhausted = batch.documents.is_empty() || self.fetched >= batch.total;
        Ok(batch)
    }

    fn has_more(&self) -> bool {
        !self.exhausted
    }
}

fn is_retriable(err: &IndexError) -> bool {
    match err {
        IndexError::Http(err) => {
            err.is_timeout()
                || err.is_connect()
                || err.status().is_some_and(|status| status.is_server_error())
        }
        IndexError::Deserialize(_) => false,
    }
}

async fn with_retries<T, F, Fut>(max_retries: u32, mut operation: F) -> Result<T, IndexError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IndexError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = BACKOFF_BASE_MS.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                warn!(
                    target: "feed.index",
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient index error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_errors_are_not_retriable() {
        assert!(!is_retriable(&IndexError::Deserialize("bad json".into())));
    }

    #[tokio::test]
    async fn with_retries_stops_on_non_retriable_errors() {
        let mut calls = 0;
        let result: Result<(), IndexError> = with_retries(3, || {
            calls += 1;
            async { Err(IndexError::Deserialize("broken".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn with_retries_passes_through_success() {
        let result = with_retries(3, || async { Ok::<_, IndexError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
