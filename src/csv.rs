use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::ReconError;
use crate::records::{DiscrepancyRecord, DiseaseStatistic};

pub const DISCREPANCY_HEADER: &str =
    "CaseID,EventCode,EventName,CaseClassStatus,MMWRYear,MMWRWeek,Reason,ReasonID";
pub const STATISTIC_HEADER: &str = "EventCode,EventName,TotalCases,TotalDuplicates,TotalMissingFromCDC,TotalMissingFromState,TotalWrongAttributes";

pub const DISCREPANCY_FILE: &str = "Results.csv";
pub const STATISTIC_FILE: &str = "Statistics.csv";

// Text fields are always quoted, embedded quotes are doubled.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub fn discrepancy_line(r: &DiscrepancyRecord) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        quote(&r.case_id),
        quote(&r.event_code),
        quote(&r.event_name),
        quote(&r.case_class_status),
        r.mmwr_year,
        r.mmwr_week,
        quote(&r.reason),
        r.reason_id
    )
}

pub fn statistic_line(s: &DiseaseStatistic) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        quote(&s.event_code),
        quote(&s.event_name),
        s.total_cases,
        s.total_duplicates,
        s.total_missing_from_cdc,
        s.total_missing_from_state,
        s.total_wrong_attributes
    )
}

fn to_csv<R>(header: &str, rows: &[R], line: fn(&R) -> String) -> String {
    let body = rows.iter().map(line).collect::<Vec<String>>().join("\n");
    format!("{header}\n{body}")
}

/// Serializes the whole, unfiltered discrepancy set.
pub fn discrepancies_to_csv(rows: &[DiscrepancyRecord]) -> String {
    to_csv(DISCREPANCY_HEADER, rows, discrepancy_line)
}

/// Serializes the whole, unfiltered statistics set.
pub fn statistics_to_csv(rows: &[DiseaseStatistic]) -> String {
    to_csv(STATISTIC_HEADER, rows, statistic_line)
}

pub fn export(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf, ReconError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, contents)?;
    info!("Exported {} bytes to {}", contents.len(), path.display());
    Ok(path)
}
