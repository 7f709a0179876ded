//! Deal dataset loading, validation and the process-wide load-once cache.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use salesdash_core::{is_known_product_category, Deal};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, info_span, warn};

pub const CRATE_NAME: &str = "salesdash-storage";

pub const DEFAULT_DATA_PATH: &str = "canonical_sales_data_final_corrected.csv";

/// Header columns the engine reads. Matching is exact and case-sensitive.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "Sales_Quarter",
    "Region",
    "Deal_Stage",
    "Deal_Value_USD",
    "Product_Category",
    "Lead_Source",
    "Salesperson_ID",
    "Time_to_Close_Days",
    "Customer_Satisfaction_Score",
    "Engagement_Score",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reading csv header: {0}")]
    Header(#[source] csv::Error),
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),
    #[error("parsing row at line {line}: {source}")]
    Row {
        line: usize,
        #[source]
        source: csv::Error,
    },
    #[error("row at line {line}: {field} must be a non-negative number, got {value}")]
    InvalidValue {
        line: usize,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_path: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("SALESDASH_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH)),
        }
    }
}

/// Immutable table of deals. Built once and only ever read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    deals: Vec<Deal>,
    content_hash: String,
}

impl Dataset {
    /// Build a dataset from already-parsed deals, enforcing the record invariants.
    pub fn from_deals(deals: Vec<Deal>) -> Result<Self, LoadError> {
        let deals = deals
            .into_iter()
            .enumerate()
            .map(|(idx, deal)| validate_deal(deal, idx + 2))
            .collect::<Result<Vec<_>, _>>()?;
        // No source bytes here, so fingerprint the rows themselves.
        let content_hash = sha256_hex(format!("{deals:?}").as_bytes());
        Ok(Self {
            deals,
            content_hash,
        })
    }

    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// Hex sha256 fingerprint: of the source CSV bytes for loaded datasets, or
    /// of the rows' `Debug` text for ones built with [`Dataset::from_deals`].
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn distinct_quarters(&self) -> Vec<String> {
        distinct_in_order(self.deals.iter().map(|d| d.sales_quarter.as_str()))
    }

    pub fn distinct_regions(&self) -> Vec<String> {
        distinct_in_order(self.deals.iter().map(|d| d.region.as_str()))
    }

    pub fn distinct_stages(&self) -> Vec<String> {
        distinct_in_order(self.deals.iter().map(|d| d.deal_stage.as_str()))
    }

    pub fn distinct_product_categories(&self) -> Vec<String> {
        distinct_in_order(self.deals.iter().map(|d| d.product_category.as_str()))
    }
}

fn distinct_in_order<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .filter(|label| seen.insert(*label))
        .map(ToString::to_string)
        .collect()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read and validate the deal CSV at `path`.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let span = info_span!("dataset_load", path = %path.display());
    let _guard = span.enter();

    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = load_dataset_from_reader(bytes.as_slice())?;
    info!(
        rows = dataset.len(),
        content_hash = dataset.content_hash(),
        "loaded deal dataset"
    );
    Ok(dataset)
}

/// Parse deals from any CSV source. The fingerprint covers the raw bytes read.
pub fn load_dataset_from_reader<R: Read>(mut reader: R) -> Result<Dataset, LoadError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| LoadError::Io {
            path: PathBuf::from("<reader>"),
            source,
        })?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes.as_slice());

    let headers = csv_reader.headers().map_err(LoadError::Header)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn(column));
        }
    }

    let mut deals = Vec::new();
    let mut unseen_categories = HashSet::new();
    for (idx, result) in csv_reader.deserialize::<Deal>().enumerate() {
        let line = idx + 2;
        let deal = result.map_err(|source| LoadError::Row { line, source })?;
        let deal = validate_deal(deal, line)?;
        if !is_known_product_category(&deal.product_category)
            && unseen_categories.insert(deal.product_category.clone())
        {
            warn!(category = %deal.product_category, "product category outside the known palette");
        }
        deals.push(deal);
    }

    Ok(Dataset {
        deals,
        content_hash: sha256_hex(&bytes),
    })
}

fn validate_deal(mut deal: Deal, line: usize) -> Result<Deal, LoadError> {
    if deal.deal_value_usd.is_nan() || deal.deal_value_usd < 0.0 {
        return Err(LoadError::InvalidValue {
            line,
            field: "Deal_Value_USD",
            value: deal.deal_value_usd,
        });
    }
    deal.time_to_close_days = present(deal.time_to_close_days);
    deal.customer_satisfaction_score = present(deal.customer_satisfaction_score);
    deal.engagement_score = present(deal.engagement_score);
    if let Some(days) = deal.time_to_close_days {
        if days < 0.0 {
            return Err(LoadError::InvalidValue {
                line,
                field: "Time_to_Close_Days",
                value: days,
            });
        }
    }
    Ok(deal)
}

// NaN cells are how exported spreadsheets spell "missing".
fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Memoized accessor: the dataset at `path` is read at most once and the
/// resulting `Arc` is handed to every caller afterwards. A failed load is not
/// cached.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    cell: OnceCell<Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<Dataset>, LoadError> {
        self.cell
            .get_or_try_init(|| load_dataset(&self.path).map(Arc::new))
            .cloned()
    }
}

static SHARED: Lazy<DatasetCache> =
    Lazy::new(|| DatasetCache::new(StorageConfig::from_env().data_path));

/// Process-wide dataset, located through `SALESDASH_DATA_PATH`.
pub fn shared_dataset() -> Result<Arc<Dataset>, LoadError> {
    SHARED.get()
}
