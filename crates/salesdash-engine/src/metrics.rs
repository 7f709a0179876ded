use salesdash_core::StageBucket;
use serde::{Deserialize, Serialize};

use crate::accumulator::Accumulator;
use crate::filter::DealView;

/// Headline numbers for a view. Sums are zero on an empty view; the averages
/// are `None` ("not available") whenever no row carries the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_pipeline_value: f64,
    pub total_closed_won: f64,
    pub total_closed_lost: f64,
    /// Percentage of ALL rows in the view that are `Closed-Won`, open deals included.
    pub win_rate: f64,
    pub avg_time_to_close: Option<f64>,
    pub avg_csat: Option<f64>,
    pub avg_engagement: Option<f64>,
    pub total_deals: usize,
    pub closed_won_deals: usize,
}

pub fn compute_metrics(view: &DealView<'_>) -> MetricsSummary {
    let mut pipeline = Accumulator::default();
    let mut won = Accumulator::default();
    let mut lost = Accumulator::default();
    let mut time_to_close = Accumulator::default();
    let mut csat = Accumulator::default();
    let mut engagement = Accumulator::default();
    let mut closed_won_deals = 0usize;

    for deal in view.iter() {
        match deal.bucket() {
            StageBucket::Pipeline => pipeline.push(deal.deal_value_usd),
            StageBucket::Won => {
                won.push(deal.deal_value_usd);
                closed_won_deals += 1;
            }
            StageBucket::Lost => lost.push(deal.deal_value_usd),
        }
        time_to_close.push_present(deal.time_to_close_days);
        csat.push_present(deal.customer_satisfaction_score);
        engagement.push_present(deal.engagement_score);
    }

    let total_deals = view.len();
    let win_rate = if total_deals > 0 {
        closed_won_deals as f64 / total_deals as f64 * 100.0
    } else {
        0.0
    };

    MetricsSummary {
        total_pipeline_value: pipeline.sum(),
        total_closed_won: won.sum(),
        total_closed_lost: lost.sum(),
        win_rate,
        avg_time_to_close: time_to_close.mean(),
        avg_csat: csat.mean(),
        avg_engagement: engagement.mean(),
        total_deals,
        closed_won_deals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter, FilterSelection};
    use crate::test_support::{assert_close, dataset, deal, fixture};
    use salesdash_core::DealStage;

    #[test]
    fn three_deal_example() {
        let data = dataset(vec![
            deal("EU", DealStage::ClosedWon, 100.0),
            deal("EU", DealStage::Negotiation, 50.0),
            deal("US", DealStage::ClosedLost, 30.0),
        ]);
        let metrics = compute_metrics(&DealView::of(&data));
        assert_close(metrics.total_pipeline_value, 50.0);
        assert_close(metrics.total_closed_won, 100.0);
        assert_close(metrics.total_closed_lost, 30.0);
        assert_eq!((metrics.win_rate * 100.0).round() / 100.0, 33.33);
        assert_eq!(metrics.total_deals, 3);
        assert_eq!(metrics.closed_won_deals, 1);
    }

    #[test]
    fn empty_view_degrades_to_zero_and_not_available() {
        let data = fixture();
        let view = filter(&data, &FilterSelection::new(Vec::<String>::new(), Vec::<String>::new()));
        let metrics = compute_metrics(&view);
        assert_eq!(metrics.total_pipeline_value, 0.0);
        assert_eq!(metrics.total_closed_won, 0.0);
        assert_eq!(metrics.total_closed_lost, 0.0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.avg_time_to_close, None);
        assert_eq!(metrics.avg_csat, None);
        assert_eq!(metrics.avg_engagement, None);
        assert_eq!(metrics.total_deals, 0);
    }

    #[test]
    fn missing_values_are_excluded_from_means_not_zeroed() {
        let mut closed = deal("EU", DealStage::ClosedWon, 10.0);
        closed.time_to_close_days = Some(40.0);
        closed.customer_satisfaction_score = Some(4.0);
        let mut open = deal("EU", DealStage::Negotiation, 10.0);
        open.engagement_score = Some(6.0);
        let data = dataset(vec![closed, open]);

        let metrics = compute_metrics(&DealView::of(&data));
        assert_eq!(metrics.avg_time_to_close, Some(40.0));
        assert_eq!(metrics.avg_csat, Some(4.0));
        assert_eq!(metrics.avg_engagement, Some(6.0));
    }

    #[test]
    fn means_are_not_available_when_only_sums_exist() {
        let data = dataset(vec![deal("EU", DealStage::Negotiation, 75.0)]);
        let metrics = compute_metrics(&DealView::of(&data));
        assert_eq!(metrics.total_pipeline_value, 75.0);
        assert_eq!(metrics.avg_time_to_close, None);
    }

    #[test]
    fn buckets_partition_the_total_value() {
        let data = fixture();
        for quarter in data.distinct_quarters() {
            let view = filter(&data, &FilterSelection::new([quarter], data.distinct_regions()));
            let metrics = compute_metrics(&view);
            let total: f64 = view.iter().map(|d| d.deal_value_usd).sum();
            assert_close(
                metrics.total_pipeline_value + metrics.total_closed_won + metrics.total_closed_lost,
                total,
            );
        }
    }

    #[test]
    fn win_rate_uses_every_filtered_row_as_denominator() {
        let data = fixture();
        let metrics = compute_metrics(&DealView::of(&data));
        // 10 won out of 20, open pipeline deals included.
        assert_eq!(metrics.closed_won_deals, 10);
        assert_close(metrics.win_rate, 50.0);
        assert!((0.0..=100.0).contains(&metrics.win_rate));
    }

    #[test]
    fn fixture_means_match_hand_computation() {
        let data = fixture();
        let view = filter(&data, &FilterSelection::new(["Q1-FY25"], data.distinct_regions()));
        let metrics = compute_metrics(&view);
        assert_close(metrics.avg_time_to_close.unwrap(), (42.0 + 55.0 + 61.0) / 3.0);
        assert_close(metrics.avg_csat.unwrap(), (4.6 + 2.9 + 4.8) / 3.0);
        assert_close(metrics.avg_engagement.unwrap(), (8.1 + 6.4 + 3.8 + 9.0 + 5.5) / 5.0);
        assert_close(metrics.total_pipeline_value, 64000.0 + 47000.0);
    }
}
