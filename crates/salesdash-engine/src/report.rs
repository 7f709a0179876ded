//! Report export: a markdown brief, a JSON snapshot and parquet tables per run.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field as ArrowField, Schema};
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use salesdash_core::Deal;
use salesdash_storage::{sha256_hex, Dataset};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::display::format_usd;
use crate::filter::FilterSelection;
use crate::rollup::{LeaderboardRow, RegionCategoryRevenue};
use crate::snapshot::{split_views, DashboardSnapshot};

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub reports_dir: PathBuf,
}

impl ReportConfig {
    pub fn from_env() -> Self {
        Self {
            reports_dir: std::env::var("SALESDASH_REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./reports")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub report_dir: PathBuf,
    pub deals: usize,
    pub manifest_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
struct ExportRecord<'a> {
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    dataset_fingerprint: &'a str,
    selection: &'a FilterSelection,
    snapshot: &'a DashboardSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParquetManifest {
    pub schema_version: u32,
    pub files: Vec<ParquetManifestFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParquetManifestFile {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Write one report run for `selection` under `reports_dir/<run_id>/`.
pub fn export_report(
    reports_dir: &Path,
    dataset: &Dataset,
    selection: &FilterSelection,
) -> Result<ExportSummary> {
    let run_id = Uuid::new_v4();
    let generated_at = Utc::now();
    let report_dir = reports_dir.join(run_id.to_string());
    std::fs::create_dir_all(&report_dir)
        .with_context(|| format!("creating {}", report_dir.display()))?;

    let (view, stage_view) = split_views(dataset, selection);
    let snapshot = DashboardSnapshot::build(&view, &stage_view);

    let brief = render_brief(run_id, generated_at, dataset, selection, &snapshot);
    std::fs::write(report_dir.join("dashboard_brief.md"), brief)
        .context("writing dashboard_brief.md")?;

    let record = ExportRecord {
        run_id,
        generated_at,
        dataset_fingerprint: dataset.content_hash(),
        selection,
        snapshot: &snapshot,
    };
    let json = serde_json::to_vec_pretty(&record).context("serializing dashboard snapshot")?;
    std::fs::write(report_dir.join("dashboard_snapshot.json"), json)
        .context("writing dashboard_snapshot.json")?;

    let manifest_path = export_parquet_snapshots(&report_dir, &view.to_deals(), &snapshot)?;

    info!(%run_id, deals = view.len(), dir = %report_dir.display(), "exported dashboard report");

    Ok(ExportSummary {
        run_id,
        generated_at,
        report_dir,
        deals: view.len(),
        manifest_path,
    })
}

fn render_brief(
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    dataset: &Dataset,
    selection: &FilterSelection,
    snapshot: &DashboardSnapshot,
) -> String {
    let join = |labels: &std::collections::BTreeSet<String>| {
        if labels.is_empty() {
            "(none)".to_string()
        } else {
            labels.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let stages = selection
        .stages
        .as_ref()
        .map(join)
        .unwrap_or_else(|| "(all)".to_string());

    let metrics = snapshot
        .metrics
        .display_rows()
        .into_iter()
        .map(|m| format!("- {}: {}", m.label, m.value))
        .collect::<Vec<_>>()
        .join("\n");

    let leaderboard = if snapshot.leaderboard.is_empty() {
        "No Closed-Won deals in this selection.".to_string()
    } else {
        let mut lines = vec![
            "| Salesperson_ID | Region | Total_Closed_Won | Average_Deal_Value |".to_string(),
            "|---|---|---:|---:|".to_string(),
        ];
        lines.extend(snapshot.leaderboard.iter().map(|row| {
            format!(
                "| {} | {} | {} | {} |",
                row.salesperson_id,
                row.region,
                format_usd(row.total_closed_won),
                format_usd(row.average_deal_value)
            )
        }));
        lines.join("\n")
    };

    format!(
        "# Canonical Sales Dashboard FY2025\n\n- Run ID: `{run_id}`\n- Generated: {generated_at}\n- Dataset fingerprint: `{}`\n- Quarters: {}\n- Regions: {}\n- Deal stages (regional breakdown): {stages}\n- Deals in view: {}\n\n## Key Metrics\n{metrics}\n\n## Salesperson Leaderboard\n{leaderboard}\n",
        dataset.content_hash(),
        join(&selection.quarters),
        join(&selection.regions),
        snapshot.deal_count,
    )
}

fn export_parquet_snapshots(
    report_dir: &Path,
    deals: &[Deal],
    snapshot: &DashboardSnapshot,
) -> Result<PathBuf> {
    let snapshot_dir = report_dir.join("snapshots");
    std::fs::create_dir_all(&snapshot_dir)
        .with_context(|| format!("creating {}", snapshot_dir.display()))?;

    let deals_path = snapshot_dir.join("deals.parquet");
    let region_category_path = snapshot_dir.join("region_category_revenue.parquet");
    let leaderboard_path = snapshot_dir.join("leaderboard.parquet");

    write_deals_parquet(&deals_path, deals)?;
    write_region_category_parquet(&region_category_path, &snapshot.region_category_revenue)?;
    write_leaderboard_parquet(&leaderboard_path, &snapshot.leaderboard)?;

    let manifest = ParquetManifest {
        schema_version: 1,
        files: vec![
            manifest_entry("deals", report_dir, &deals_path)?,
            manifest_entry("region_category_revenue", report_dir, &region_category_path)?,
            manifest_entry("leaderboard", report_dir, &leaderboard_path)?,
        ],
    };

    let manifest_path = snapshot_dir.join("manifest.json");
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing parquet manifest")?;
    std::fs::write(&manifest_path, bytes)
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    Ok(manifest_path)
}

fn write_parquet(path: &Path, batch: RecordBatch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    Ok(())
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> StringArray {
    StringArray::from(values.map(Some).collect::<Vec<_>>())
}

fn write_deals_parquet(path: &Path, deals: &[Deal]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("Sales_Quarter", DataType::Utf8, false),
        ArrowField::new("Region", DataType::Utf8, false),
        ArrowField::new("Deal_Stage", DataType::Utf8, false),
        ArrowField::new("Deal_Value_USD", DataType::Float64, false),
        ArrowField::new("Product_Category", DataType::Utf8, false),
        ArrowField::new("Lead_Source", DataType::Utf8, false),
        ArrowField::new("Salesperson_ID", DataType::Utf8, false),
        ArrowField::new("Time_to_Close_Days", DataType::Float64, true),
        ArrowField::new("Customer_Satisfaction_Score", DataType::Float64, true),
        ArrowField::new("Engagement_Score", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(string_column(deals.iter().map(|d| d.sales_quarter.as_str()))),
            Arc::new(string_column(deals.iter().map(|d| d.region.as_str()))),
            Arc::new(string_column(deals.iter().map(|d| d.deal_stage.as_str()))),
            Arc::new(Float64Array::from(
                deals.iter().map(|d| d.deal_value_usd).collect::<Vec<_>>(),
            )),
            Arc::new(string_column(deals.iter().map(|d| d.product_category.as_str()))),
            Arc::new(string_column(deals.iter().map(|d| d.lead_source.as_str()))),
            Arc::new(string_column(deals.iter().map(|d| d.salesperson_id.as_str()))),
            Arc::new(Float64Array::from(
                deals.iter().map(|d| d.time_to_close_days).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                deals
                    .iter()
                    .map(|d| d.customer_satisfaction_score)
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                deals.iter().map(|d| d.engagement_score).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building deals record batch")?;
    write_parquet(path, batch)
}

fn write_region_category_parquet(path: &Path, rows: &[RegionCategoryRevenue]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("Region", DataType::Utf8, false),
        ArrowField::new("Product_Category", DataType::Utf8, false),
        ArrowField::new("Deal_Value_USD", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(string_column(rows.iter().map(|r| r.region.as_str()))),
            Arc::new(string_column(rows.iter().map(|r| r.product_category.as_str()))),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.deal_value_usd).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building region_category_revenue record batch")?;
    write_parquet(path, batch)
}

fn write_leaderboard_parquet(path: &Path, rows: &[LeaderboardRow]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("Salesperson_ID", DataType::Utf8, false),
        ArrowField::new("Region", DataType::Utf8, false),
        ArrowField::new("Total_Closed_Won", DataType::Float64, false),
        ArrowField::new("Average_Deal_Value", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(string_column(rows.iter().map(|r| r.salesperson_id.as_str()))),
            Arc::new(string_column(rows.iter().map(|r| r.region.as_str()))),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.total_closed_won).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.average_deal_value).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building leaderboard record batch")?;
    write_parquet(path, batch)
}

fn manifest_entry(name: &str, report_dir: &Path, path: &Path) -> Result<ParquetManifestFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let rel = path
        .strip_prefix(report_dir)
        .unwrap_or(path)
        .display()
        .to_string();
    Ok(ParquetManifestFile {
        name: name.to_string(),
        path: rel,
        sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use tempfile::tempdir;

    #[test]
    fn export_writes_brief_snapshot_and_manifest() {
        let dir = tempdir().expect("tempdir");
        let data = fixture();
        let selection = FilterSelection::new(["Q4-FY25"], data.distinct_regions());

        let summary = export_report(dir.path(), &data, &selection).expect("export");
        assert_eq!(summary.deals, 5);
        assert!(summary.report_dir.starts_with(dir.path()));

        let brief = std::fs::read_to_string(summary.report_dir.join("dashboard_brief.md"))
            .expect("brief");
        assert!(brief.contains("- Quarters: Q4-FY25"));
        assert!(brief.contains("- Total Closed Won: $357,000.00"));
        assert!(brief.contains("| SP-303 | APAC | $143,000.00 | $143,000.00 |"));

        let snapshot: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(summary.report_dir.join("dashboard_snapshot.json"))
                .expect("snapshot"),
        )
        .expect("json");
        assert_eq!(snapshot["dataset_fingerprint"], data.content_hash());
        assert_eq!(snapshot["snapshot"]["deal_count"], 5);

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary.manifest_path).expect("manifest"))
                .expect("json");
        let files = manifest["files"].as_array().expect("files");
        assert_eq!(files.len(), 3);
        for file in files {
            let rel = file["path"].as_str().expect("path");
            let bytes = std::fs::read(summary.report_dir.join(rel)).expect("parquet exists");
            assert_eq!(file["sha256"], sha256_hex(&bytes));
        }
    }

    #[test]
    fn export_of_an_empty_selection_still_succeeds() {
        let dir = tempdir().expect("tempdir");
        let data = fixture();
        let selection = FilterSelection::new(Vec::<String>::new(), Vec::<String>::new());

        let summary = export_report(dir.path(), &data, &selection).expect("export");
        assert_eq!(summary.deals, 0);
        let brief = std::fs::read_to_string(summary.report_dir.join("dashboard_brief.md"))
            .expect("brief");
        assert!(brief.contains("- Win Rate: 0.00%"));
        assert!(brief.contains("- Average CSAT Score: N/A"));
        assert!(brief.contains("No Closed-Won deals in this selection."));
    }
}
