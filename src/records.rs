use crate::table::ColumnSpec;

/// One case that differs between the state and the CDC dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscrepancyRecord {
    pub case_id: String,
    pub event_code: String,
    pub event_name: String,
    pub case_class_status: String,
    pub mmwr_year: i64,
    pub mmwr_week: i64,
    pub reason: String,
    pub reason_id: u8,
}

/// Aggregated discrepancy counts for one disease (event code).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiseaseStatistic {
    pub event_code: String,
    pub event_name: String,
    pub total_cases: u64,
    pub total_duplicates: u64,
    pub total_missing_from_cdc: u64,
    pub total_missing_from_state: u64,
    pub total_wrong_attributes: u64,
}

pub fn discrepancy_columns() -> Vec<ColumnSpec<DiscrepancyRecord>> {
    type C = ColumnSpec<DiscrepancyRecord>;
    vec![
        C::text("CaseID", "CaseID", |r| r.case_id.clone()),
        C::text("EventCode", "EventCode", |r| r.event_code.clone()),
        C::text("EventName", "EventName", |r| r.event_name.clone()),
        C::text("CaseClassStatus", "CaseClassStatus", |r| {
            r.case_class_status.clone()
        }),
        C::numeric("MMWRYear", "MMWRYear", |r| r.mmwr_year.to_string()),
        C::numeric("MMWRWeek", "MMWRWeek", |r| r.mmwr_week.to_string()),
        C::text("Reason", "Reason", |r| r.reason.clone()),
        C::numeric("ReasonID", "ReasonID", |r| r.reason_id.to_string()),
    ]
}

pub fn statistic_columns() -> Vec<ColumnSpec<DiseaseStatistic>> {
    type C = ColumnSpec<DiseaseStatistic>;
    vec![
        C::text("EventCode", "Event Code", |s| s.event_code.clone()),
        C::text("EventName", "Event Name", |s| s.event_name.clone()),
        C::numeric("TotalCases", "Total Cases", |s| s.total_cases.to_string()),
        C::numeric("TotalDuplicates", "Duplicates", |s| {
            s.total_duplicates.to_string()
        }),
        C::numeric("TotalMissingFromCDC", "Missing From CDC", |s| {
            s.total_missing_from_cdc.to_string()
        }),
        C::numeric("TotalMissingFromState", "Missing From State", |s| {
            s.total_missing_from_state.to_string()
        }),
        C::numeric("TotalWrongAttributes", "Wrong Attributes", |s| {
            s.total_wrong_attributes.to_string()
        }),
    ]
}

/// Report wide sums shown above the per disease table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTotals {
    pub cases_different: usize,
    pub total_cases: u64,
    pub total_duplicates: u64,
    pub total_missing_from_cdc: u64,
    pub total_missing_from_state: u64,
    pub total_wrong_attributes: u64,
}

impl ReportTotals {
    pub fn compute(discrepancies: &[DiscrepancyRecord], statistics: &[DiseaseStatistic]) -> Self {
        statistics.iter().fold(
            ReportTotals {
                cases_different: discrepancies.len(),
                ..Default::default()
            },
            |mut acc, s| {
                acc.total_cases += s.total_cases;
                acc.total_duplicates += s.total_duplicates;
                acc.total_missing_from_cdc += s.total_missing_from_cdc;
                acc.total_missing_from_state += s.total_missing_from_state;
                acc.total_wrong_attributes += s.total_wrong_attributes;
                acc
            },
        )
    }
}
