use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use salesdash_engine::{
    export_report, format_usd, DashboardSnapshot, FilterSelection, ReportConfig,
};
use salesdash_storage::{shared_dataset, Dataset, DatasetCache};
use salesdash_web::{AppState, WebConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "salesdash")]
#[command(about = "Sales deal dashboard command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the interactive dashboard.
    Serve {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print key metrics and the leaderboard for a selection.
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
        /// Print the whole dashboard snapshot as JSON instead.
        #[arg(long)]
        json: bool,
    },
    /// Write a report run (brief, snapshot JSON, parquet files).
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Omitted lists select every label present in the data.
#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long = "quarter")]
    quarters: Vec<String>,
    #[arg(long = "region")]
    regions: Vec<String>,
    /// Applies to the region x category breakdown only.
    #[arg(long = "stage")]
    stages: Vec<String>,
}

impl FilterArgs {
    fn load(&self) -> Result<Arc<Dataset>> {
        dataset_for(self.data.clone())
    }

    fn selection(&self, dataset: &Dataset) -> FilterSelection {
        let pick = |given: &[String], all: Vec<String>| {
            if given.is_empty() {
                all
            } else {
                given.to_vec()
            }
        };
        let selection = FilterSelection::new(
            pick(&self.quarters, dataset.distinct_quarters()),
            pick(&self.regions, dataset.distinct_regions()),
        );
        if self.stages.is_empty() {
            selection
        } else {
            selection.with_stages(self.stages.clone())
        }
    }
}

/// `--data` gets a cache of its own; otherwise the process-wide dataset from
/// `SALESDASH_DATA_PATH` is used.
fn dataset_for(flag: Option<PathBuf>) -> Result<Arc<Dataset>> {
    match flag {
        Some(path) => {
            let cache = DatasetCache::new(path);
            cache
                .get()
                .with_context(|| format!("loading {}", cache.path().display()))
        }
        None => shared_dataset().context("loading deal dataset"),
    }
}

fn print_summary(snapshot: &DashboardSnapshot, total_rows: usize) {
    println!("{} of {} deals", snapshot.deal_count, total_rows);
    for metric in snapshot.metrics.display_rows() {
        println!("{:<28} {}", metric.label, metric.value);
    }
    println!();
    println!("Top salespeople");
    if snapshot.leaderboard.is_empty() {
        println!("  (no closed-won deals)");
    }
    for (idx, row) in snapshot.leaderboard.iter().enumerate() {
        println!(
            "{:>3}. {:<10} {:<10} {:>16} {:>16}",
            idx + 1,
            row.salesperson_id,
            row.region,
            format_usd(row.total_closed_won),
            format_usd(row.average_deal_value)
        );
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        data: None,
        port: None,
    }) {
        Commands::Serve { data, port } => {
            let mut config = WebConfig::from_env();
            if let Some(port) = port {
                config.port = port;
            }
            let dataset = dataset_for(data)?;
            salesdash_web::serve(&config, AppState::new(dataset)).await?;
        }
        Commands::Summary { filters, json } => {
            let dataset = filters.load()?;
            let snapshot =
                DashboardSnapshot::from_selection(&dataset, &filters.selection(&dataset));
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_summary(&snapshot, dataset.len());
            }
        }
        Commands::Export { filters, out } => {
            let dataset = filters.load()?;
            let reports_dir = out.unwrap_or_else(|| ReportConfig::from_env().reports_dir);
            let summary = export_report(&reports_dir, &dataset, &filters.selection(&dataset))?;
            println!(
                "export complete: run_id={} deals={} report_dir={} manifest={}",
                summary.run_id,
                summary.deals,
                summary.report_dir.display(),
                summary.manifest_path.display()
            );
        }
    }

    Ok(())
}
