//! Cosmic planner command line front-end.
//!
//! Loads a catalog snapshot, builds a plan request from a JSON file and/or
//! flags, and prints the resulting observing plan.
//!
//! # Usage
//!
//! ```bash
//! cosmic-plan --catalog catalog.json --lat 40 --lon -105 --elevation 1600 \
//!     --start 2020-06-01T04:00:00Z --limiting-magnitude 12 --format text
//! ```
//!
//! # Environment Variables
//!
//! - `PLANNER_CONFIG`: planner TOML file (otherwise `planner.toml` is searched)
//! - `PLANNER_WORKERS`, `PLANNER_STEP_MINUTES`: configuration overrides
//! - `RUST_LOG`: log filter (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cosmic_planner::api::PlanRequest;
use cosmic_planner::config::PlannerConfig;
use cosmic_planner::db::LocalRepository;
use cosmic_planner::models::{ModifiedJulianDate, TargetCategory};
use cosmic_planner::services::{report, PlanAssembler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Parser)]
#[command(name = "cosmic-plan", version, about = "Build a ranked observing plan")]
struct Cli {
    /// Catalog snapshot (JSON)
    #[arg(long)]
    catalog: PathBuf,

    /// Plan request (JSON); flags below override its fields
    #[arg(long)]
    request: Option<PathBuf>,

    /// Planner configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Meters above sea level
    #[arg(long, allow_hyphen_values = true)]
    elevation: Option<f64>,

    /// Window start (RFC 3339)
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Window end (RFC 3339)
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    #[arg(long, allow_hyphen_values = true)]
    limiting_magnitude: Option<f64>,

    #[arg(long)]
    min_score: Option<f64>,

    #[arg(long)]
    max_entries: Option<usize>,

    /// Comma-separated catalog categories to search
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// Only score current-instant values, skip the peak scan
    #[arg(long)]
    no_peaks: bool,

    /// Precompute coarse asteroid tracks over the window before planning
    #[arg(long)]
    precompute_tracks: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the plan here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn build_request(&self) -> anyhow::Result<PlanRequest> {
        let mut request = match &self.request {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read request {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse request {}", path.display()))?
            }
            None => PlanRequest::default(),
        };

        if self.lat.is_some() {
            request.observer_lat = self.lat;
        }
        if self.lon.is_some() {
            request.observer_lon = self.lon;
        }
        if self.elevation.is_some() {
            request.elevation = self.elevation;
        }
        if self.start.is_some() {
            request.start_time = self.start;
        }
        if self.end.is_some() {
            request.end_time = self.end;
        }
        if self.limiting_magnitude.is_some() {
            request.limiting_magnitude = self.limiting_magnitude;
        }
        if let Some(min_score) = self.min_score {
            request.minimum_score = min_score;
        }
        if self.max_entries.is_some() {
            request.max_entries = self.max_entries;
        }
        if !self.categories.is_empty() {
            let categories = self
                .categories
                .iter()
                .map(|c| c.parse::<TargetCategory>().map_err(anyhow::Error::msg))
                .collect::<anyhow::Result<Vec<_>>>()?;
            request.categories = Some(categories);
        }
        if self.no_peaks {
            request.find_peaks = false;
        }
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = PlannerConfig::from_file(path)?;
            config.apply_env_overrides()?;
            config
        }
        None => PlannerConfig::load()?,
    };

    let repository = LocalRepository::from_json_file(&cli.catalog)
        .with_context(|| format!("Failed to load catalog {}", cli.catalog.display()))?;
    info!("Loaded {} catalog targets", repository.target_count());

    let request = cli.build_request()?;

    if cli.precompute_tracks {
        let start = ModifiedJulianDate::from_datetime(request.start_time.unwrap_or_else(Utc::now));
        let end = match request.end_time {
            Some(end) => ModifiedJulianDate::from_datetime(end),
            None => start.add_days(config.limits.default_window_hours / 24.0),
        };
        let tracks = repository.precompute_asteroid_tracks(start, end, 1.0, 8)?;
        info!("Precomputed {} asteroid tracks", tracks);
    }

    let assembler = PlanAssembler::new(Arc::new(repository), config);
    let plan = assembler
        .assemble_plan_with_cancel(&request, async {
            // Ctrl-C abandons the computation; a listener error never cancels.
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;

    let rendered = match cli.format {
        OutputFormat::Json => report::plan_to_json(&plan)?,
        OutputFormat::Text => report::render_plan(&plan),
    };
    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} plan entries to {}", plan.entries.len(), path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
