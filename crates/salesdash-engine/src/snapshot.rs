//! One-pass dashboard snapshot and the split between the main and stage views.

use salesdash_storage::Dataset;
use serde::Serialize;

use crate::filter::{filter, DealView, FilterSelection};
use crate::metrics::{compute_metrics, MetricsSummary};
use crate::rollup::{
    category_average_deal_value, category_revenue_closed_won, largest_slice, leaderboard,
    lead_source_stage_pipeline, region_category_revenue, CategoryAverage, CategoryRevenue,
    LeadSourceStageValue, LeaderboardRow, RegionCategoryRevenue,
};

/// Everything the dashboard draws for one selection, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub deal_count: usize,
    pub metrics: MetricsSummary,
    pub region_category_revenue: Vec<RegionCategoryRevenue>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub category_revenue: Vec<CategoryRevenue>,
    pub category_revenue_largest: Option<usize>,
    pub category_average: Vec<CategoryAverage>,
    pub lead_source_stage: Vec<LeadSourceStageValue>,
}

impl DashboardSnapshot {
    /// `view` is the quarter/region view; `stage_view` additionally carries the
    /// stage filter and only feeds the region x category breakdown.
    pub fn build(view: &DealView<'_>, stage_view: &DealView<'_>) -> Self {
        let category_revenue = category_revenue_closed_won(view);
        Self {
            deal_count: view.len(),
            metrics: compute_metrics(view),
            region_category_revenue: region_category_revenue(stage_view),
            leaderboard: leaderboard(view),
            category_revenue_largest: largest_slice(&category_revenue),
            category_revenue,
            category_average: category_average_deal_value(view),
            lead_source_stage: lead_source_stage_pipeline(view),
        }
    }

    pub fn from_selection(dataset: &Dataset, selection: &FilterSelection) -> Self {
        let (view, stage_view) = split_views(dataset, selection);
        Self::build(&view, &stage_view)
    }
}

/// The main view ignores the stage predicate; the stage view applies it on top.
pub fn split_views<'a>(
    dataset: &'a Dataset,
    selection: &FilterSelection,
) -> (DealView<'a>, DealView<'a>) {
    let view = filter(dataset, &selection.without_stages());
    let stage_view = match &selection.stages {
        Some(stages) => view.only_stages(stages),
        None => view.clone(),
    };
    (view, stage_view)
}
