use std::collections::BTreeSet;

use salesdash_core::Deal;
use salesdash_storage::Dataset;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The user's filter choices. An empty set selects nothing; `stages: None`
/// means the stage predicate is not applied at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub quarters: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    #[serde(default)]
    pub stages: Option<BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new<Q, R>(quarters: Q, regions: R) -> Self
    where
        Q: IntoIterator,
        Q::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            quarters: quarters.into_iter().map(Into::into).collect(),
            regions: regions.into_iter().map(Into::into).collect(),
            stages: None,
        }
    }

    /// Every quarter and region present in `dataset`, stages not applied.
    pub fn all(dataset: &Dataset) -> Self {
        Self::new(dataset.distinct_quarters(), dataset.distinct_regions())
    }

    pub fn with_stages<S>(mut self, stages: S) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        self.stages = Some(stages.into_iter().map(Into::into).collect());
        self
    }

    /// The same selection with the stage predicate dropped.
    pub fn without_stages(&self) -> Self {
        Self {
            quarters: self.quarters.clone(),
            regions: self.regions.clone(),
            stages: None,
        }
    }

    pub fn matches(&self, deal: &Deal) -> bool {
        self.quarters.contains(&deal.sales_quarter)
            && self.regions.contains(&deal.region)
            && self
                .stages
                .as_ref()
                .map_or(true, |stages| stages.contains(deal.deal_stage.as_str()))
    }
}

/// Ordered subset of a dataset's rows. Borrowed, so filtering never copies deals.
#[derive(Debug, Clone, PartialEq)]
pub struct DealView<'a> {
    rows: Vec<&'a Deal>,
}

impl<'a> DealView<'a> {
    /// Every row of `dataset`.
    pub fn of(dataset: &'a Dataset) -> Self {
        Self {
            rows: dataset.deals().iter().collect(),
        }
    }

    pub fn from_rows(rows: Vec<&'a Deal>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[&'a Deal] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Deal> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filter(&self, selection: &FilterSelection) -> DealView<'a> {
        self.retain(|deal| selection.matches(deal))
    }

    /// Stage-only narrowing, used by the regional breakdown on top of the main view.
    pub fn only_stages(&self, stages: &BTreeSet<String>) -> DealView<'a> {
        self.retain(|deal| stages.contains(deal.deal_stage.as_str()))
    }

    pub fn to_deals(&self) -> Vec<Deal> {
        self.rows.iter().map(|deal| (*deal).clone()).collect()
    }

    fn retain(&self, keep: impl Fn(&Deal) -> bool) -> DealView<'a> {
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|deal| keep(deal))
            .collect::<Vec<_>>();
        debug!(input = self.rows.len(), output = rows.len(), "filtered deal view");
        DealView { rows }
    }
}

/// Rows of `dataset` matching `selection`, in dataset order.
pub fn filter<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> DealView<'a> {
    DealView::of(dataset).filter(selection)
}
