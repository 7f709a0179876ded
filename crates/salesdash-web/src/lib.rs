//! Axum + Askama host for the sales dashboard.
//!
//! Every request re-runs the engine over the shared dataset with the selection
//! carried in the query string. Repeated `quarter`, `region` and `stage`
//! parameters select labels; a parameter that never appears means "all", and
//! a parameter that only appears with an empty value selects nothing.

pub mod charts;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use salesdash_core::{Deal, DealStage};
use salesdash_engine::{
    compute_metrics, format_optional, format_usd, leaderboard, split_views, DashboardSnapshot,
    FilterSelection, MetricDisplay,
};
use salesdash_storage::Dataset;
use tokio::net::TcpListener;
use tracing::info;

pub const CRATE_NAME: &str = "salesdash-web";

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("SALESDASH_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("SALESDASH_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        }
    }
}

type SelectionPairs = Query<Vec<(String, String)>>;

/// Build the filter selection from raw query pairs, defaulting absent keys to
/// every label present in the dataset.
pub fn selection_from_pairs(pairs: &[(String, String)], dataset: &Dataset) -> FilterSelection {
    let pick = |key: &str| -> Option<BTreeSet<String>> {
        let mut seen = false;
        let mut labels = BTreeSet::new();
        for (k, v) in pairs {
            if k == key {
                seen = true;
                if !v.is_empty() {
                    labels.insert(v.clone());
                }
            }
        }
        seen.then_some(labels)
    };

    FilterSelection {
        quarters: pick("quarter")
            .unwrap_or_else(|| dataset.distinct_quarters().into_iter().collect()),
        regions: pick("region")
            .unwrap_or_else(|| dataset.distinct_regions().into_iter().collect()),
        stages: pick("stage"),
    }
}

#[derive(Debug, Clone)]
struct FilterOption {
    label: String,
    checked: bool,
}

fn options(all: Vec<String>, selected: Option<&BTreeSet<String>>) -> Vec<FilterOption> {
    all.into_iter()
        .map(|label| FilterOption {
            checked: selected.map_or(true, |s| s.contains(&label)),
            label,
        })
        .collect()
}

#[derive(Debug, Clone)]
struct DealRow {
    sales_quarter: String,
    region: String,
    deal_stage: String,
    deal_value: String,
    product_category: String,
    lead_source: String,
    salesperson_id: String,
    time_to_close: String,
    csat: String,
    engagement: String,
}

impl DealRow {
    fn from_deal(deal: &Deal) -> Self {
        let blank = |v: Option<f64>, decimals: usize| match v {
            Some(_) => format_optional(v, decimals),
            None => String::new(),
        };
        Self {
            sales_quarter: deal.sales_quarter.clone(),
            region: deal.region.clone(),
            deal_stage: deal.deal_stage.to_string(),
            deal_value: format_usd(deal.deal_value_usd),
            product_category: deal.product_category.clone(),
            lead_source: deal.lead_source.clone(),
            salesperson_id: deal.salesperson_id.clone(),
            time_to_close: blank(deal.time_to_close_days, 0),
            csat: blank(deal.customer_satisfaction_score, 2),
            engagement: blank(deal.engagement_score, 2),
        }
    }
}

#[derive(Debug, Clone)]
struct LeaderboardDisplayRow {
    rank: usize,
    salesperson_id: String,
    region: String,
    total_closed_won: String,
    average_deal_value: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    deal_count: usize,
    total_rows: usize,
    quarter_options: Vec<FilterOption>,
    region_options: Vec<FilterOption>,
    stage_options: Vec<FilterOption>,
    left_metrics: Vec<MetricDisplay>,
    right_metrics: Vec<MetricDisplay>,
}

#[derive(Template)]
#[template(path = "deals_table_partial.html")]
struct DealsTablePartialTemplate {
    deals: Vec<DealRow>,
}

#[derive(Template)]
#[template(path = "leaderboard_partial.html")]
struct LeaderboardPartialTemplate {
    rows: Vec<LeaderboardDisplayRow>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/deals", get(deals_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/api/metrics", get(metrics_api_handler))
        .route("/api/snapshot", get(snapshot_api_handler))
        .route("/charts/region-category", get(region_category_chart_handler))
        .route("/charts/category-revenue", get(category_revenue_chart_handler))
        .route("/charts/category-average", get(category_average_chart_handler))
        .route("/charts/lead-source", get(lead_source_chart_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(config: &WebConfig, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.bind_addr.as_str(), config.port))
        .await
        .with_context(|| format!("binding {}:{}", config.bind_addr, config.port))?;
    info!(addr = %config.bind_addr, port = config.port, rows = state.dataset.len(), "serving dashboard");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>, Query(pairs): SelectionPairs) -> Response {
    let dataset = &state.dataset;
    let selection = selection_from_pairs(&pairs, dataset);
    let (view, _stage_view) = split_views(dataset, &selection);
    let columns = compute_metrics(&view).display_columns();

    let present = dataset.distinct_stages();
    let stage_labels = DealStage::ALL
        .iter()
        .map(|s| s.as_str().to_string())
        .filter(|label| present.contains(label))
        .collect::<Vec<_>>();

    render_html(IndexTemplate {
        deal_count: view.len(),
        total_rows: dataset.len(),
        quarter_options: options(dataset.distinct_quarters(), Some(&selection.quarters)),
        region_options: options(dataset.distinct_regions(), Some(&selection.regions)),
        stage_options: options(stage_labels, selection.stages.as_ref()),
        left_metrics: columns.left,
        right_metrics: columns.right,
    })
}

async fn deals_handler(State(state): State<Arc<AppState>>, Query(pairs): SelectionPairs) -> Response {
    let selection = selection_from_pairs(&pairs, &state.dataset);
    let (view, _) = split_views(&state.dataset, &selection);
    render_html(DealsTablePartialTemplate {
        deals: view.iter().map(DealRow::from_deal).collect(),
    })
}

async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): SelectionPairs,
) -> Response {
    let selection = selection_from_pairs(&pairs, &state.dataset);
    let (view, _) = split_views(&state.dataset, &selection);
    let rows = leaderboard(&view)
        .into_iter()
        .enumerate()
        .map(|(idx, row)| LeaderboardDisplayRow {
            rank: idx + 1,
            salesperson_id: row.salesperson_id,
            region: row.region,
            total_closed_won: format_usd(row.total_closed_won),
            average_deal_value: format_usd(row.average_deal_value),
        })
        .collect();
    render_html(LeaderboardPartialTemplate { rows })
}

fn snapshot_for(state: &AppState, pairs: &[(String, String)]) -> DashboardSnapshot {
    let selection = selection_from_pairs(pairs, &state.dataset);
    DashboardSnapshot::from_selection(&state.dataset, &selection)
}

async fn metrics_api_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): SelectionPairs,
) -> Response {
    Json(snapshot_for(&state, &pairs).metrics).into_response()
}

async fn snapshot_api_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): SelectionPairs,
) -> Response {
    Json(snapshot_for(&state, &pairs)).into_response()
}

async fn region_category_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): SelectionPairs,
) -> Response {
    let snapshot = snapshot_for(&state, &pairs);
    Json(charts::region_category_figure(&snapshot.region_category_revenue)).into_response()
}

async fn category_revenue_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): SelectionPairs,
) -> Response {
    let snapshot = snapshot_for(&state, &pairs);
    Json(charts::category_revenue_figure(
        &snapshot.category_revenue,
        snapshot.category_revenue_largest,
    ))
    .into_response()
}

async fn category_average_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): SelectionPairs,
) -> Response {
    let snapshot = snapshot_for(&state, &pairs);
    Json(charts::category_average_figure(&snapshot.category_average)).into_response()
}

async fn lead_source_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): SelectionPairs,
) -> Response {
    let snapshot = snapshot_for(&state, &pairs);
    Json(charts::lead_source_figure(&snapshot.lead_source_stage)).into_response()
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
