use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::ReconError;
use crate::records::{DiscrepancyRecord, DiseaseStatistic};

pub const RESULTS_FILE: &str = "results.csv";
pub const STATS_FILE: &str = "stats.csv";

/// Source of the two row sets that make up a report.
pub trait ReportDataLoader {
    fn fetch_discrepancies(&self, report_id: &str) -> Result<Vec<DiscrepancyRecord>, ReconError>;
    fn fetch_statistics(&self, report_id: &str) -> Result<Vec<DiseaseStatistic>, ReconError>;
    fn list_reports(&self) -> Result<Vec<String>, ReconError>;
}

/// Reads reports from an archive folder with one sub folder per report id,
/// each holding `results.csv` and `stats.csv`.
#[derive(Debug, Clone)]
pub struct ArchiveLoader {
    root: PathBuf,
}

impl ArchiveLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn report_dir(&self, report_id: &str) -> Result<PathBuf, ReconError> {
        let valid = !report_id.is_empty()
            && !report_id.contains(['/', '\\'])
            && report_id != "."
            && report_id != "..";
        let dir = self.root.join(report_id);
        if valid && dir.is_dir() {
            Ok(dir)
        } else {
            Err(ReconError::ReportNotFound(report_id.to_string()))
        }
    }
}

impl ReportDataLoader for ArchiveLoader {
    fn fetch_discrepancies(&self, report_id: &str) -> Result<Vec<DiscrepancyRecord>, ReconError> {
        let path = self.report_dir(report_id)?.join(RESULTS_FILE);
        read_discrepancies(&path)
    }

    fn fetch_statistics(&self, report_id: &str) -> Result<Vec<DiseaseStatistic>, ReconError> {
        let path = self.report_dir(report_id)?.join(STATS_FILE);
        read_statistics(&path)
    }

    /// Ids of complete reports, numeric ids first in numeric order.
    fn list_reports(&self) -> Result<Vec<String>, ReconError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.join(RESULTS_FILE).is_file() && path.join(STATS_FILE).is_file() {
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort_by_key(|id| {
            let number = id.parse::<u64>().ok();
            (number.is_none(), number.unwrap_or(0), id.clone())
        });
        debug!("Found {} reports in {}", ids.len(), self.root.display());
        Ok(ids)
    }
}

/// All cells of a csv file as strings, addressed by header name.
struct StringTable {
    columns: HashMap<String, Vec<String>>,
    nrows: usize,
}

impl StringTable {
    fn column(&self, name: &str) -> Result<&[String], ReconError> {
        self.columns
            .get(name)
            .map(|c| c.as_slice())
            .ok_or_else(|| ReconError::MissingColumn(name.to_string()))
    }
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    // Every column as string, identifiers like 0012001 keep their zeros.
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<String>, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|value| value.unwrap_or("").to_string())
        .collect())
}

fn read_table(path: &Path) -> Result<StringTable, ReconError> {
    if !path.is_file() {
        return Err(ReconError::LoadingFailed(format!(
            "{} is not a file",
            path.display()
        )));
    }
    let start_time = Instant::now();
    let df = load_csv(path)?.collect()?;
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    // Each column is converted in its own task.
    let columns: Result<Vec<(String, Vec<String>)>, PolarsError> = names
        .par_iter()
        .map(|name| {
            let header = name.trim_start_matches('\u{feff}').trim().to_string();
            load_column(&df, name).map(|data| (header, data))
        })
        .collect();

    let table = StringTable {
        columns: columns?.into_iter().collect(),
        nrows: df.height(),
    };
    info!(
        "Loading {} ({} rows) took {}ms",
        path.display(),
        table.nrows,
        start_time.elapsed().as_millis()
    );
    Ok(table)
}

fn parse_number<T: FromStr>(column: &str, value: &str) -> Result<T, ReconError> {
    value.trim().parse().map_err(|_| ReconError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
    })
}

pub fn read_discrepancies(path: &Path) -> Result<Vec<DiscrepancyRecord>, ReconError> {
    let table = read_table(path)?;
    let case_id = table.column("CaseID")?;
    let event_code = table.column("EventCode")?;
    let event_name = table.column("EventName")?;
    let case_class_status = table.column("CaseClassStatus")?;
    let mmwr_year = table.column("MMWRYear")?;
    let mmwr_week = table.column("MMWRWeek")?;
    let reason = table.column("Reason")?;
    let reason_id = table.column("ReasonID")?;

    (0..table.nrows)
        .map(|i| {
            Ok(DiscrepancyRecord {
                case_id: case_id[i].clone(),
                event_code: event_code[i].clone(),
                event_name: event_name[i].clone(),
                case_class_status: case_class_status[i].clone(),
                mmwr_year: parse_number("MMWRYear", &mmwr_year[i])?,
                mmwr_week: parse_number("MMWRWeek", &mmwr_week[i])?,
                reason: reason[i].clone(),
                reason_id: parse_number("ReasonID", &reason_id[i])?,
            })
        })
        .collect()
}

pub fn read_statistics(path: &Path) -> Result<Vec<DiseaseStatistic>, ReconError> {
    let table = read_table(path)?;
    let event_code = table.column("EventCode")?;
    let event_name = table.column("EventName")?;
    let total_cases = table.column("TotalCases")?;
    let total_duplicates = table.column("TotalDuplicates")?;
    let total_missing_from_cdc = table.column("TotalMissingFromCDC")?;
    let total_missing_from_state = table.column("TotalMissingFromState")?;
    let total_wrong_attributes = table.column("TotalWrongAttributes")?;

    (0..table.nrows)
        .map(|i| {
            Ok(DiseaseStatistic {
                event_code: event_code[i].clone(),
                event_name: event_name[i].clone(),
                total_cases: parse_number("TotalCases", &total_cases[i])?,
                total_duplicates: parse_number("TotalDuplicates", &total_duplicates[i])?,
                total_missing_from_cdc: parse_number(
                    "TotalMissingFromCDC",
                    &total_missing_from_cdc[i],
                )?,
                total_missing_from_state: parse_number(
                    "TotalMissingFromState",
                    &total_missing_from_state[i],
                )?,
                total_wrong_attributes: parse_number(
                    "TotalWrongAttributes",
                    &total_wrong_attributes[i],
                )?,
            })
        })
        .collect()
}
