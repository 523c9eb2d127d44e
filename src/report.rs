use tracing::{error, info};

use crate::domain::{ReconError, ViewConfig};
use crate::drilldown::DrillDownController;
use crate::loader::ReportDataLoader;
use crate::records::ReportTotals;

/// Everything shown on the report screen for one selected report.
pub struct ReportView {
    report_id: Option<String>,
    controller: DrillDownController,
    totals: ReportTotals,
    show_disease_stats: bool,
    page_size: usize,
    facet_limit: usize,
}

impl ReportView {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            report_id: None,
            controller: DrillDownController::new(config.page_size, config.facet_limit),
            totals: ReportTotals::default(),
            show_disease_stats: false,
            page_size: config.page_size,
            facet_limit: config.facet_limit,
        }
    }

    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    pub fn controller(&self) -> &DrillDownController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DrillDownController {
        &mut self.controller
    }

    pub fn totals(&self) -> &ReportTotals {
        &self.totals
    }

    pub fn show_disease_stats(&self) -> bool {
        self.show_disease_stats
    }

    pub fn toggle_disease_stats(&mut self) {
        self.show_disease_stats = !self.show_disease_stats;
    }

    /// Fetches both row sets. On any failure the current view is kept as is.
    /// Selecting a different report starts from a fresh filter state.
    pub fn load(&mut self, loader: &dyn ReportDataLoader, report_id: &str) -> Result<(), ReconError> {
        let fetched = loader
            .fetch_discrepancies(report_id)
            .and_then(|d| loader.fetch_statistics(report_id).map(|s| (d, s)));
        let (discrepancies, statistics) = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                error!("Loading report {report_id} failed: {e}");
                return Err(e);
            }
        };

        if self.report_id.as_deref() != Some(report_id) {
            self.controller = DrillDownController::new(self.page_size, self.facet_limit);
        }
        self.totals = ReportTotals::compute(&discrepancies, &statistics);
        self.controller.set_rows(discrepancies, statistics);
        self.report_id = Some(report_id.to_string());
        info!(
            "Report {report_id}: {} discrepancies, {} diseases",
            self.totals.cases_different,
            self.controller.statistics().rows().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drilldown::ReasonKind;
    use crate::loader::ArchiveLoader;

    fn view() -> ReportView {
        ReportView::new(&ViewConfig::default())
    }

    #[test]
    fn load_fills_both_tables_and_totals() {
        let mut view = view();
        view.load(&ArchiveLoader::new("tests/fixtures/archive"), "7").unwrap();
        assert_eq!(view.report_id(), Some("7"));
        assert_eq!(view.controller().discrepancies().rows().len(), 6);
        assert_eq!(view.controller().discrepancies().pagination().page_size, 5);
        assert_eq!(view.totals().cases_different, 6);
        assert_eq!(view.totals().total_cases, 65);
        assert_eq!(view.totals().total_missing_from_cdc, 3);
    }

    #[test]
    fn failed_load_keeps_previous_state() {
        let loader = ArchiveLoader::new("tests/fixtures/archive");
        let mut view = view();
        view.load(&loader, "7").unwrap();
        view.controller_mut()
            .select_statistic("10140", "Measles", ReasonKind::MissingFromCdc);

        assert!(view.load(&loader, "9").is_err());
        assert!(view.load(&loader, "404").is_err());
        assert_eq!(view.report_id(), Some("7"));
        assert!(view.controller().is_drilled());
        assert_eq!(view.controller().discrepancies().filtered_row_count(), 3);
    }

    #[test]
    fn switching_reports_discards_view_state() {
        let loader = ArchiveLoader::new("tests/fixtures/archive");
        let mut view = view();
        view.load(&loader, "7").unwrap();
        view.controller_mut().set_discrepancy_global_filter("Mumps");
        view.controller_mut().statistics_mut().set_global_filter("Mumps");

        view.load(&loader, "7").unwrap();
        assert_eq!(view.controller().discrepancies().global_filter(), "Mumps");

        view.load(&loader, "12").unwrap();
        assert_eq!(view.controller().discrepancies().global_filter(), "");
        assert_eq!(view.controller().statistics().global_filter(), "");
    }
}
