pub mod scroll;

pub use scroll::ScrollClient;

use serde::Deserialize;
use thiserror::Error;

use crate::record::VariationRecord;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Deserialize(String),
}

/// One shard of the scrolled result set. Shard-level errors are data, not
/// failures: the pipeline logs them and keeps consuming.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultBatch {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub documents: Vec<VariationRecord>,
}

/// Upstream producer of item-ascending variation batches. The pipeline's
/// item-boundary cache refresh depends on that ordering.
#[allow(async_fn_in_trait)]
pub trait BatchProducer {
    fn set_page_size(&mut self, page_size: usize);
    async fn fetch_next(&mut self) -> Result<ResultBatch, IndexError>;
    fn has_more(&self) -> bool;
}
