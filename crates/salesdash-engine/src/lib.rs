//! Filtering and aggregation engine behind the sales dashboard.
//!
//! Everything here is a pure function of a [`DealView`]: hosts re-run the
//! functions whenever the user's selection changes. The only I/O lives in
//! [`report`], which writes export artifacts on request.

mod accumulator;
pub mod display;
pub mod filter;
pub mod metrics;
pub mod report;
pub mod rollup;
pub mod snapshot;

pub use display::{format_optional, format_percent, format_usd, MetricColumns, MetricDisplay};
pub use filter::{filter, DealView, FilterSelection};
pub use metrics::{compute_metrics, MetricsSummary};
pub use report::{export_report, ExportSummary, ReportConfig};
pub use rollup::{
    category_average_deal_value, category_revenue_closed_won, largest_slice, leaderboard,
    lead_source_stage_pipeline, region_category_revenue, CategoryAverage, CategoryRevenue,
    LeadSourceStageValue, LeaderboardRow, RegionCategoryRevenue, LEADERBOARD_SIZE,
};
pub use snapshot::{split_views, DashboardSnapshot};

pub const CRATE_NAME: &str = "salesdash-engine";

#[cfg(test)]
pub(crate) mod test_support {
    use salesdash_core::{Deal, DealStage};
    use salesdash_storage::Dataset;

    pub fn deal(region: &str, stage: DealStage, value: f64) -> Deal {
        Deal {
            sales_quarter: "Q1-FY25".to_string(),
            region: region.to_string(),
            deal_stage: stage,
            deal_value_usd: value,
            product_category: "Kubernetes".to_string(),
            lead_source: "Referral".to_string(),
            salesperson_id: "SP-001".to_string(),
            time_to_close_days: None,
            customer_satisfaction_score: None,
            engagement_score: None,
        }
    }

    pub fn dataset(deals: Vec<Deal>) -> Dataset {
        Dataset::from_deals(deals).expect("valid test deals")
    }

    pub fn fixture() -> Dataset {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../fixtures/sample/deals.csv");
        salesdash_storage::load_dataset(path).expect("fixture loads")
    }

    pub fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }
}
