use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::Parser;
use env_logger::Env;
use itertools::Itertools;
use log::{error, info};

use treemetrics::{
    read_tree_csv, run_pipeline, write_records_csv, HttpImageryClient, PipelineConfig,
    TreeMetricsError, TreeRecord,
};

/// Update tree metrics from GPS coordinates and remote sensing imagery.
#[derive(Parser, Debug)]
#[command(name = "treemetrics", version, about)]
struct Cli {
    /// CSV file with the tree GPS coordinates (`longitude`, `latitude` columns)
    #[arg(long, default_value = "data/input/gps_example.csv")]
    start_csv: Utf8PathBuf,

    /// Where to store the enriched tree table
    #[arg(long, default_value = "data/output/output_example.csv")]
    final_csv: Utf8PathBuf,

    /// Species of the trees
    #[arg(long, default_value = "Paulownia")]
    species: String,

    /// Plantation date (YYYY-MM-DD)
    #[arg(long, default_value = "2023-09-15")]
    plantation_date: NaiveDate,

    /// Initial height of the trees (m)
    #[arg(long, default_value_t = 2.0)]
    initial_height: f64,

    /// Project developer name
    #[arg(long, default_value = "EcoTree Solution")]
    project_developer: String,

    /// Tree density per hectare
    #[arg(long, default_value_t = 400)]
    specie_tree_density: u32,

    /// Grid cell size (m)
    #[arg(long, default_value_t = 100.0)]
    grid_size: f64,

    /// NDVI value above which a pixel is canopy
    #[arg(long, default_value_t = 0.4)]
    ndvi_threshold: f64,

    /// Scenes must have a cloudy pixel percentage strictly below this value
    #[arg(long, default_value_t = 5.0)]
    max_cloud: f64,

    /// Maximum number of trees per remote request
    #[arg(long, default_value_t = 5000)]
    batch_size: usize,

    /// First acquisition date accepted for the NDVI scene
    #[arg(long, requires = "imagery_end")]
    imagery_start: Option<NaiveDate>,

    /// Last acquisition date accepted for the NDVI scene
    #[arg(long, requires = "imagery_start")]
    imagery_end: Option<NaiveDate>,

    /// As-of date of the metrics (defaults to today)
    #[arg(long)]
    update_date: Option<NaiveDate>,
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig, TreeMetricsError> {
        let mut builder = PipelineConfig::builder()
            .species(self.species.clone())
            .tree_density_per_ha(f64::from(self.specie_tree_density))
            .grid_size_m(self.grid_size)
            .ndvi_threshold(self.ndvi_threshold)
            .max_cloud_pct(self.max_cloud)
            .batch_size(self.batch_size);
        if let Some(date) = self.update_date {
            builder = builder.update_date(date);
        }
        if let (Some(start), Some(end)) = (self.imagery_start, self.imagery_end) {
            builder = builder.imagery_range(start, end);
        }
        builder.build()
    }
}

fn head_row(r: &TreeRecord) -> String {
    let opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{x:.2}"));
    format!(
        "{:>10.6} {:>10.6} age={:.2} height={} cover={} dbh={:.2} value={:.2} co2={:.2}",
        r.longitude,
        r.latitude,
        r.age,
        opt(r.current_height),
        opt(r.canopy_cover_percentage),
        r.current_dbh,
        r.current_estimated_value,
        r.current_co2_sequestration
    )
}

fn run(cli: &Cli) -> Result<(), TreeMetricsError> {
    let config = cli.config()?;
    info!("{config}");

    let points = read_tree_csv(
        &cli.start_csv,
        cli.initial_height,
        cli.plantation_date,
        &cli.project_developer,
    )?;
    let client = HttpImageryClient::from_env(config.retry)?;

    let output = run_pipeline(&client, &points, &config)?;
    write_records_csv(&cli.final_csv, &output.records)?;

    info!(
        "First rows:\n{}",
        output.records.iter().take(5).map(head_row).join("\n")
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
