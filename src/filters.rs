use crate::record::VariationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockFilter {
    #[default]
    All,
    PositiveOnly,
}

/// Run-wide filter criteria handed to the export: the row limit is enforced
/// by the pipeline itself, the stock filter by `FiltrationService`.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub limit: Option<u64>,
    pub stock: StockFilter,
}

impl FilterCriteria {
    pub fn from_env() -> Self {
        Self {
            limit: std::env::var("FEED_LIMIT")
                .ok()
                .and_then(|value| value.parse::<u64>().ok()),
            stock: match std::env::var("FEED_STOCK_FILTER").as_deref() {
                Ok("positive") => StockFilter::PositiveOnly,
                _ => StockFilter::All,
            },
        }
    }
}

/// Routine record exclusion, applied before any resolution work. A skip here
/// is an expected high-frequency outcome and is never logged.
#[derive(Debug, Clone)]
pub struct FiltrationService {
    stock: StockFilter,
}

impl FiltrationService {
    pub fn new(criteria: &FilterCriteria) -> Self {
        Self {
            stock: criteria.stock,
        }
    }

    pub fn should_skip(&self, record: &VariationRecord) -> bool {
        match self.stock {
            StockFilter::All => false,
            StockFilter::PositiveOnly => record.stock_net() <= 0.0,
        }
    }
}
