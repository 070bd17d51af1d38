mod caches;
mod config;
mod filters;
mod http;
mod index;
mod metrics;
mod models;
mod pipeline;
mod pricing;
mod record;
mod resolve;
mod services;
mod sink;
mod units;

use std::fs::File;
use std::io::{self, BufWriter};

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use config::{ExportConfig, ExportSettings};
use filters::FilterCriteria;
use index::ScrollClient;
use pipeline::ExportPipeline;
use services::HttpCoreServices;
use sink::CsvSink;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target: "feed.main", "export failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ExportConfig::from_env()?;
    let settings = ExportSettings::from_env();
    let criteria = FilterCriteria::from_env();

    let services =
        HttpCoreServices::from_env().ok_or_else(|| eyre::eyre!("CATALOG_URL is not set"))?;
    let mut producer = ScrollClient::from_env().ok_or_else(|| eyre::eyre!("INDEX_URL is not set"))?;

    let mut pipeline = ExportPipeline::new(services, config, settings, criteria);

    let output = std::env::var("FEED_OUTPUT").unwrap_or_else(|_| "-".to_string());
    let report = if output == "-" {
        let stdout = io::stdout();
        let mut sink = CsvSink::new(stdout.lock());
        pipeline.run(&mut producer, &mut sink).await?
    } else {
        let file = File::create(&output)?;
        let mut sink = CsvSink::new(BufWriter::new(file));
        pipeline.run(&mut producer, &mut sink).await?
    };

    info!(
        target: "feed.main",
        run_id = %report.run_id,
        rows = report.rows_written,
        filtered = report.filtered,
        no_price = report.skipped_no_price,
        failures = report.row_failures,
        shards = report.shards,
        "feed export finished"
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
