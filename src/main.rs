use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{info, warn};

use deal_snapshot::config::{Args, Settings};
use deal_snapshot::{CsvSink, Origin, Pipeline, logger};

fn main() -> Result<()> {
    logger::init();
    let args = Args::parse();
    let settings = Settings::from_args(&args).context("invalid configuration")?;

    let pipeline = Pipeline::new(settings.sources, settings.placeholders);
    info!("sources in order: {}", pipeline.sources().collect::<Vec<_>>().join(", "));
    let harvest = pipeline.harvest();
    if harvest.origin == Origin::Placeholder {
        warn!("writing placeholder data; check the logs above for why every source failed");
    }

    let sink = CsvSink::new(&settings.output_dir, &settings.name);
    let (dated, latest) = sink
        .persist(&harvest.records, Local::now().date_naive())
        .context("failed to write snapshots")?;

    println!(
        "Scrape finished: {} records from {} -> {}, {}",
        harvest.records.len(),
        match &harvest.origin {
            Origin::Source(name) => name.as_str(),
            Origin::Placeholder => "placeholder data",
        },
        dated.display(),
        latest.display()
    );
    Ok(())
}
