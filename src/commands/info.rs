use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::csv_sink::CSV_HEADER;
use crate::core::sampler::collect_static_info;
use crate::platform::build_sources;

use super::run::resolve_config;

/// Print the static machine description as CSV, without sampling
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;
    config.validate().context("Invalid configuration")?;

    let mut sources = build_sources(&config);
    let info = collect_static_info(&mut sources);

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(CSV_HEADER)?;
    for sample in &info {
        writer.write_record(sample.to_record())?;
    }
    writer.flush()?;
    Ok(())
}
