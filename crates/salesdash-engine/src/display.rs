//! Labels and number formatting for the key-metric widgets.

use serde::Serialize;

use crate::metrics::MetricsSummary;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDisplay {
    pub label: &'static str,
    pub value: String,
}

/// The two widget columns of the key-metrics panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricColumns {
    pub left: Vec<MetricDisplay>,
    pub right: Vec<MetricDisplay>,
}

/// `$1,234,567.89`
pub fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${}.{cents}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

impl MetricsSummary {
    pub fn display_columns(&self) -> MetricColumns {
        MetricColumns {
            left: vec![
                MetricDisplay {
                    label: "Total Value in Pipeline",
                    value: format_usd(self.total_pipeline_value),
                },
                MetricDisplay {
                    label: "Total Closed Won",
                    value: format_usd(self.total_closed_won),
                },
                MetricDisplay {
                    label: "Win Rate",
                    value: format_percent(self.win_rate),
                },
            ],
            right: vec![
                MetricDisplay {
                    label: "Total Closed Lost",
                    value: format_usd(self.total_closed_lost),
                },
                MetricDisplay {
                    label: "Average Time to Close (Days)",
                    value: format_optional(self.avg_time_to_close, 1),
                },
                MetricDisplay {
                    label: "Average CSAT Score",
                    value: format_optional(self.avg_csat, 2),
                },
                MetricDisplay {
                    label: "Average Engagement Score",
                    value: format_optional(self.avg_engagement, 2),
                },
            ],
        }
    }

    /// Both columns flattened, left first.
    pub fn display_rows(&self) -> Vec<MetricDisplay> {
        let MetricColumns { left, right } = self.display_columns();
        left.into_iter().chain(right).collect()
    }
}
