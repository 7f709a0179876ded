//! Grouped roll-ups for charts and tables.
//!
//! Groups come out in ascending order of their key tuple. Serialized column
//! names follow the CSV header so hosts can label axes without a mapping.

use std::collections::BTreeMap;

use salesdash_core::{DealStage, StageBucket};
use serde::{Deserialize, Serialize};

use crate::accumulator::Accumulator;
use crate::filter::DealView;

pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCategoryRevenue {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    #[serde(rename = "Deal_Value_USD")]
    pub deal_value_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    #[serde(rename = "Salesperson_ID")]
    pub salesperson_id: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Total_Closed_Won")]
    pub total_closed_won: f64,
    #[serde(rename = "Average_Deal_Value")]
    pub average_deal_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSourceStageValue {
    #[serde(rename = "Lead_Source")]
    pub lead_source: String,
    #[serde(rename = "Deal_Stage")]
    pub deal_stage: DealStage,
    #[serde(rename = "Deal_Value_USD")]
    pub deal_value_usd: f64,
}

/// Closed-Won revenue of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRevenue {
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    #[serde(rename = "Deal_Value_USD")]
    pub deal_value_usd: f64,
}

/// Mean deal value of one category across every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAverage {
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    #[serde(rename = "Deal_Value_USD")]
    pub deal_value_usd: f64,
}

pub fn region_category_revenue(view: &DealView<'_>) -> Vec<RegionCategoryRevenue> {
    let mut groups: BTreeMap<(&str, &str), Accumulator> = BTreeMap::new();
    for deal in view.iter() {
        groups
            .entry((deal.region.as_str(), deal.product_category.as_str()))
            .or_default()
            .push(deal.deal_value_usd);
    }
    groups
        .into_iter()
        .map(|((region, category), acc)| RegionCategoryRevenue {
            region: region.to_string(),
            product_category: category.to_string(),
            deal_value_usd: acc.sum(),
        })
        .collect()
}

/// Top Closed-Won performers per (salesperson, region), best first.
pub fn leaderboard(view: &DealView<'_>) -> Vec<LeaderboardRow> {
    let mut groups: BTreeMap<(&str, &str), Accumulator> = BTreeMap::new();
    for deal in view.iter().filter(|d| d.bucket() == StageBucket::Won) {
        groups
            .entry((deal.salesperson_id.as_str(), deal.region.as_str()))
            .or_default()
            .push(deal.deal_value_usd);
    }

    let mut rows = groups
        .into_iter()
        .map(|((salesperson_id, region), acc)| LeaderboardRow {
            salesperson_id: salesperson_id.to_string(),
            region: region.to_string(),
            total_closed_won: acc.sum(),
            // Groups only exist once a value was pushed.
            average_deal_value: acc.mean().unwrap_or_default(),
        })
        .collect::<Vec<_>>();
    // Stable: equal totals keep group-key order.
    rows.sort_by(|a, b| b.total_closed_won.total_cmp(&a.total_closed_won));
    rows.truncate(LEADERBOARD_SIZE);
    rows
}

pub fn lead_source_stage_pipeline(view: &DealView<'_>) -> Vec<LeadSourceStageValue> {
    // Keyed on the stage label so ordering matches the text, not the enum.
    let mut groups: BTreeMap<(&str, &str), (DealStage, Accumulator)> = BTreeMap::new();
    for deal in view.iter() {
        groups
            .entry((deal.lead_source.as_str(), deal.deal_stage.as_str()))
            .or_insert_with(|| (deal.deal_stage, Accumulator::default()))
            .1
            .push(deal.deal_value_usd);
    }
    groups
        .into_iter()
        .map(|((lead_source, _), (deal_stage, acc))| LeadSourceStageValue {
            lead_source: lead_source.to_string(),
            deal_stage,
            deal_value_usd: acc.sum(),
        })
        .collect()
}

pub fn category_revenue_closed_won(view: &DealView<'_>) -> Vec<CategoryRevenue> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for deal in view.iter().filter(|d| d.bucket() == StageBucket::Won) {
        groups
            .entry(deal.product_category.as_str())
            .or_default()
            .push(deal.deal_value_usd);
    }
    groups
        .into_iter()
        .map(|(category, acc)| CategoryRevenue {
            product_category: category.to_string(),
            deal_value_usd: acc.sum(),
        })
        .collect()
}

pub fn category_average_deal_value(view: &DealView<'_>) -> Vec<CategoryAverage> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for deal in view.iter() {
        groups
            .entry(deal.product_category.as_str())
            .or_default()
            .push(deal.deal_value_usd);
    }
    groups
        .into_iter()
        .filter_map(|(category, acc)| {
            acc.mean().map(|mean| CategoryAverage {
                product_category: category.to_string(),
                deal_value_usd: mean,
            })
        })
        .collect()
}

/// Index of the biggest revenue slice, first one on ties.
pub fn largest_slice(rows: &[CategoryRevenue]) -> Option<usize> {
    rows.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, row)| match best {
            Some((_, value)) if value >= row.deal_value_usd => best,
            _ => Some((idx, row.deal_value_usd)),
        })
        .map(|(idx, _)| idx)
}
