//! Core domain model for the sales dashboard: deal records and stage taxonomy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "salesdash-core";

/// Product categories the dashboard palette knows about. The category column
/// itself is a free label; anything outside this list is still accepted.
pub const KNOWN_PRODUCT_CATEGORIES: [&str; 10] = [
    "Ubuntu OS",
    "Public Cloud",
    "Private Cloud",
    "Kubernetes",
    "Virtualisation",
    "Security and Support",
    "AI and Data",
    "Hardware",
    "IoT and edge",
    "Developer Tools",
];

pub fn is_known_product_category(label: &str) -> bool {
    KNOWN_PRODUCT_CATEGORIES.contains(&label)
}

/// Lifecycle state of a sales opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DealStage {
    #[serde(rename = "Prospecting")]
    Prospecting,
    #[serde(rename = "Qualification")]
    Qualification,
    #[serde(rename = "Proposal Sent")]
    ProposalSent,
    #[serde(rename = "Negotiation")]
    Negotiation,
    #[serde(rename = "Closed-Won")]
    ClosedWon,
    #[serde(rename = "Closed-Lost")]
    ClosedLost,
}

/// Which metric bucket a stage contributes to. Every stage maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageBucket {
    Pipeline,
    Won,
    Lost,
}

impl DealStage {
    pub const ALL: [DealStage; 6] = [
        DealStage::Prospecting,
        DealStage::Qualification,
        DealStage::ProposalSent,
        DealStage::Negotiation,
        DealStage::ClosedWon,
        DealStage::ClosedLost,
    ];

    /// Label exactly as it appears in the source data.
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStage::Prospecting => "Prospecting",
            DealStage::Qualification => "Qualification",
            DealStage::ProposalSent => "Proposal Sent",
            DealStage::Negotiation => "Negotiation",
            DealStage::ClosedWon => "Closed-Won",
            DealStage::ClosedLost => "Closed-Lost",
        }
    }

    pub fn bucket(&self) -> StageBucket {
        match self {
            DealStage::ClosedWon => StageBucket::Won,
            DealStage::ClosedLost => StageBucket::Lost,
            DealStage::Prospecting
            | DealStage::Qualification
            | DealStage::ProposalSent
            | DealStage::Negotiation => StageBucket::Pipeline,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.bucket() != StageBucket::Pipeline
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown deal stage `{0}`")]
pub struct UnknownStage(pub String);

impl FromStr for DealStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DealStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// One sales opportunity. Field names on the wire match the CSV header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(rename = "Sales_Quarter")]
    pub sales_quarter: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Deal_Stage")]
    pub deal_stage: DealStage,
    #[serde(rename = "Deal_Value_USD")]
    pub deal_value_usd: f64,
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    #[serde(rename = "Lead_Source")]
    pub lead_source: String,
    #[serde(rename = "Salesperson_ID")]
    pub salesperson_id: String,
    #[serde(rename = "Time_to_Close_Days", default)]
    pub time_to_close_days: Option<f64>,
    #[serde(rename = "Customer_Satisfaction_Score", default)]
    pub customer_satisfaction_score: Option<f64>,
    #[serde(rename = "Engagement_Score", default)]
    pub engagement_score: Option<f64>,
}

impl Deal {
    pub fn bucket(&self) -> StageBucket {
        self.deal_stage.bucket()
    }
}
