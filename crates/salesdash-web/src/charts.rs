//! Plotly figure JSON for the dashboard charts.

use salesdash_engine::{
    CategoryAverage, CategoryRevenue, LeadSourceStageValue, RegionCategoryRevenue,
};
use serde_json::{json, Value};

const CATEGORY_COLORS: [(&str, &str); 10] = [
    ("Ubuntu OS", "#636EFA"),
    ("Public Cloud", "#EF553B"),
    ("Private Cloud", "#00CC96"),
    ("Kubernetes", "#AB63FA"),
    ("Virtualisation", "#FFA15A"),
    ("Security and Support", "#19D3F3"),
    ("AI and Data", "#FF6692"),
    ("Hardware", "#B6E880"),
    ("IoT and edge", "#FF97FF"),
    ("Developer Tools", "#FECB52"),
];

const STAGE_COLORS: [(&str, &str); 4] = [
    ("Closed-Lost", "#ff5533"),
    ("Closed-Won", "#86f920"),
    ("Negotiation", "#ADD8E6"),
    ("Proposal Sent", "#fff933"),
];

pub fn category_color(category: &str) -> Option<&'static str> {
    CATEGORY_COLORS
        .iter()
        .find(|(label, _)| *label == category)
        .map(|(_, color)| *color)
}

pub fn stage_color(stage: &str) -> Option<&'static str> {
    STAGE_COLORS
        .iter()
        .find(|(label, _)| *label == stage)
        .map(|(_, color)| *color)
}

/// Labels in order of first appearance, which is how traces are legend-ordered.
fn first_seen<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for label in labels {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

fn bar_trace(name: &str, x: Vec<&str>, y: Vec<f64>, color: Option<&str>) -> Value {
    let mut trace = json!({
        "type": "bar",
        "name": name,
        "x": x,
        "y": y,
    });
    if let Some(color) = color {
        trace["marker"] = json!({ "color": color });
    }
    trace
}

fn layout(title: &str, x_title: &str, y_title: &str, barmode: Option<&str>) -> Value {
    let mut layout = json!({
        "title": title,
        "xaxis": { "title": x_title },
        "yaxis": { "title": y_title },
        "paper_bgcolor": "#ffffff",
        "plot_bgcolor": "#f8fafc",
    });
    if let Some(mode) = barmode {
        layout["barmode"] = json!(mode);
    }
    layout
}

/// Grouped bars: regions on x, one trace per product category.
pub fn region_category_figure(rows: &[RegionCategoryRevenue]) -> Value {
    let traces = first_seen(rows.iter().map(|r| r.product_category.as_str()))
        .into_iter()
        .map(|category| {
            let (x, y): (Vec<&str>, Vec<f64>) = rows
                .iter()
                .filter(|r| r.product_category == category)
                .map(|r| (r.region.as_str(), r.deal_value_usd))
                .unzip();
            bar_trace(category, x, y, category_color(category))
        })
        .collect::<Vec<_>>();
    json!({
        "data": traces,
        "layout": layout(
            "Total Revenue by Region and Product Category",
            "Region",
            "Total Revenue (USD)",
            Some("group"),
        ),
    })
}

/// Donut of Closed-Won revenue with the largest slice pulled out.
pub fn category_revenue_figure(rows: &[CategoryRevenue], largest: Option<usize>) -> Value {
    let pull = (0..rows.len())
        .map(|idx| if Some(idx) == largest { 0.1 } else { 0.0 })
        .collect::<Vec<_>>();
    let colors = rows
        .iter()
        .map(|r| category_color(&r.product_category))
        .collect::<Vec<_>>();
    let mut trace = json!({
        "type": "pie",
        "labels": rows.iter().map(|r| r.product_category.as_str()).collect::<Vec<_>>(),
        "values": rows.iter().map(|r| r.deal_value_usd).collect::<Vec<_>>(),
        "hole": 0.4,
        "pull": pull,
    });
    if colors.iter().all(Option::is_some) {
        trace["marker"] = json!({ "colors": colors });
    }
    json!({
        "data": [trace],
        "layout": {
            "title": "Revenue Distribution by Product Category (Closed-Won Only)",
            "paper_bgcolor": "#ffffff",
        },
    })
}

pub fn category_average_figure(rows: &[CategoryAverage]) -> Value {
    let traces = rows
        .iter()
        .map(|row| {
            bar_trace(
                &row.product_category,
                vec![row.product_category.as_str()],
                vec![row.deal_value_usd],
                category_color(&row.product_category),
            )
        })
        .collect::<Vec<_>>();
    json!({
        "data": traces,
        "layout": layout(
            "Average Deal Value by Product Category",
            "Product Category",
            "Average Deal Value (USD)",
            None,
        ),
    })
}

/// Stacked bars: lead sources on x, one trace per deal stage.
pub fn lead_source_figure(rows: &[LeadSourceStageValue]) -> Value {
    let traces = first_seen(rows.iter().map(|r| r.deal_stage.as_str()))
        .into_iter()
        .map(|stage| {
            let (x, y): (Vec<&str>, Vec<f64>) = rows
                .iter()
                .filter(|r| r.deal_stage.as_str() == stage)
                .map(|r| (r.lead_source.as_str(), r.deal_value_usd))
                .unzip();
            bar_trace(stage, x, y, stage_color(stage))
        })
        .collect::<Vec<_>>();
    json!({
        "data": traces,
        "layout": layout(
            "Pipeline Value by Lead Source and Deal Stage",
            "Lead Source",
            "Pipeline Value (USD)",
            Some("stack"),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdash_core::{DealStage, KNOWN_PRODUCT_CATEGORIES};

    fn revenue(category: &str, value: f64) -> CategoryRevenue {
        CategoryRevenue {
            product_category: category.to_string(),
            deal_value_usd: value,
        }
    }

    #[test]
    fn every_known_category_has_a_color() {
        for category in KNOWN_PRODUCT_CATEGORIES {
            assert!(category_color(category).is_some(), "{category}");
        }
        assert_eq!(category_color("Mainframe"), None);
        assert_eq!(stage_color("Closed-Won"), Some("#86f920"));
        assert_eq!(stage_color("Prospecting"), None);
    }

    #[test]
    fn region_category_has_one_trace_per_category() {
        let rows = vec![
            RegionCategoryRevenue {
                region: "APAC".into(),
                product_category: "Hardware".into(),
                deal_value_usd: 1.0,
            },
            RegionCategoryRevenue {
                region: "APAC".into(),
                product_category: "Mainframe".into(),
                deal_value_usd: 2.0,
            },
            RegionCategoryRevenue {
                region: "EMEA".into(),
                product_category: "Hardware".into(),
                deal_value_usd: 3.0,
            },
        ];
        let fig = region_category_figure(&rows);
        let data = fig["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["name"], "Hardware");
        assert_eq!(data[0]["x"], json!(["APAC", "EMEA"]));
        assert_eq!(data[0]["marker"]["color"], "#B6E880");
        assert!(data[1].get("marker").is_none());
        assert_eq!(fig["layout"]["barmode"], "group");
    }

    #[test]
    fn donut_pulls_only_the_largest_slice() {
        let rows = vec![revenue("Hardware", 5.0), revenue("Kubernetes", 9.0)];
        let fig = category_revenue_figure(&rows, Some(1));
        assert_eq!(fig["data"][0]["pull"], json!([0.0, 0.1]));
        assert_eq!(fig["data"][0]["hole"], 0.4);

        let empty = category_revenue_figure(&[], None);
        assert_eq!(empty["data"][0]["pull"], json!([]));
    }

    #[test]
    fn lead_source_stacks_by_stage() {
        let rows = vec![
            LeadSourceStageValue {
                lead_source: "Partner".into(),
                deal_stage: DealStage::ClosedWon,
                deal_value_usd: 4.0,
            },
            LeadSourceStageValue {
                lead_source: "Referral".into(),
                deal_stage: DealStage::ClosedWon,
                deal_value_usd: 6.0,
            },
        ];
        let fig = lead_source_figure(&rows);
        assert_eq!(fig["data"].as_array().unwrap().len(), 1);
        assert_eq!(fig["data"][0]["y"], json!([4.0, 6.0]));
        assert_eq!(fig["layout"]["barmode"], "stack");
    }
}
