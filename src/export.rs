use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::model::DensityReport;
use crate::util::ensure_directory;

const HEADER: [&str; 6] = ["Airline", "Last Stop", "INAD", "PAX", "Density (‰)", "Priority"];

pub(crate) fn format_density(density: Option<f64>) -> String {
    density.map_or_else(|| "N/A".to_string(), |value| format!("{value:.3}"))
}

/// Stage 3 rows in report order, then a `Threshold` trailer row.
pub fn write_density_csv<W: Write>(writer: W, report: &DensityReport) -> Result<()> {
    // The trailer has fewer fields than the header.
    let mut csv = WriterBuilder::new().flexible(true).from_writer(writer);

    csv.write_record(HEADER)
        .context("failed to write csv header")?;
    for route in &report.routes {
        csv.write_record([
            route.airline.clone(),
            route.last_stop.clone(),
            route.inad_count.to_string(),
            route.pax.to_string(),
            format_density(route.density),
            route.priority.as_str().to_string(),
        ])
        .with_context(|| format!("failed to write csv row for {}", route.route()))?;
    }
    csv.write_record(["Threshold".to_string(), format!("{:.3}", report.threshold)])
        .context("failed to write csv threshold row")?;

    csv.flush().context("failed to flush csv output")?;
    Ok(())
}

pub fn write_density_csv_file(path: &Path, report: &DensityReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create csv file: {}", path.display()))?;
    write_density_csv(file, report)
        .with_context(|| format!("failed to export {}", path.display()))
}
