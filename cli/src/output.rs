//! CSV output of experiment summaries

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

use campus_seir_core::ExperimentSummary;

/// One row of the daily mean series
#[derive(Debug, Serialize)]
struct DailyRow {
    date: NaiveDate,
    susceptible: f64,
    exposed: f64,
    exposed_ci95: f64,
    infectious: f64,
    infectious_ci95: f64,
    quarantined: f64,
    removed: f64,
    vaccinated: f64,
}

fn daily_rows(summary: &ExperimentSummary) -> impl Iterator<Item = DailyRow> + '_ {
    summary
        .dates
        .iter()
        .enumerate()
        .map(move |(day, date)| DailyRow {
            date: *date,
            susceptible: summary.mean_susceptible[day],
            exposed: summary.mean_exposed[day],
            exposed_ci95: summary.ci95_exposed[day],
            infectious: summary.mean_infectious[day],
            infectious_ci95: summary.ci95_infectious[day],
            quarantined: summary.mean_quarantined[day],
            removed: summary.mean_removed[day],
            vaccinated: summary.mean_vaccinated[day],
        })
}

/// Write one row per simulated day with a header
pub fn write_daily_csv(path: &Path, summary: &ExperimentSummary) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in daily_rows(summary) {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
