use tracing::{debug, info};

use crate::records::{
    DiscrepancyRecord, DiseaseStatistic, discrepancy_columns, statistic_columns,
};
use crate::table::{PageNav, TableEngine};

/// Root cause of a discrepancy. The numeric codes are shared with the
/// reconciliation backend and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonKind {
    Duplicates,
    MissingFromCdc,
    WrongAttributes,
    MissingFromState,
}

impl ReasonKind {
    pub const ALL: [ReasonKind; 4] = [
        ReasonKind::Duplicates,
        ReasonKind::MissingFromCdc,
        ReasonKind::WrongAttributes,
        ReasonKind::MissingFromState,
    ];

    pub fn reason_id(self) -> u8 {
        match self {
            ReasonKind::Duplicates => 1,
            ReasonKind::MissingFromCdc => 2,
            ReasonKind::WrongAttributes => 3,
            ReasonKind::MissingFromState => 4,
        }
    }

    pub fn from_reason_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.reason_id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            ReasonKind::Duplicates => "Duplicates",
            ReasonKind::MissingFromCdc => "Missing From CDC",
            ReasonKind::WrongAttributes => "Wrong Attributes",
            ReasonKind::MissingFromState => "Missing From State",
        }
    }

    /// Statistics column holding the total for this reason.
    pub fn statistic_column(self) -> &'static str {
        match self {
            ReasonKind::Duplicates => "TotalDuplicates",
            ReasonKind::MissingFromCdc => "TotalMissingFromCDC",
            ReasonKind::WrongAttributes => "TotalWrongAttributes",
            ReasonKind::MissingFromState => "TotalMissingFromState",
        }
    }

    pub fn from_statistic_column(column_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.statistic_column() == column_id)
    }

    pub fn total(self, statistic: &DiseaseStatistic) -> u64 {
        match self {
            ReasonKind::Duplicates => statistic.total_duplicates,
            ReasonKind::MissingFromCdc => statistic.total_missing_from_cdc,
            ReasonKind::WrongAttributes => statistic.total_wrong_attributes,
            ReasonKind::MissingFromState => statistic.total_missing_from_state,
        }
    }
}

/// Why the discrepancy table shows its current subset.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillContext {
    pub disease_name: String,
    pub discrepancy_type: &'static str,
}

impl DrillContext {
    pub fn title(&self) -> String {
        format!("{} {}", self.disease_name, self.discrepancy_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrillState {
    Idle,
    Drilled(DrillContext),
}

/// Owns the discrepancy and statistics tables and is the only way to change
/// the discrepancy filters, so every change passes through the drill state.
pub struct DrillDownController {
    discrepancies: TableEngine<DiscrepancyRecord>,
    statistics: TableEngine<DiseaseStatistic>,
    state: DrillState,
}

impl DrillDownController {
    pub fn new(page_size: usize, facet_limit: usize) -> Self {
        let mut discrepancies = TableEngine::new("Report Discrepancies", discrepancy_columns())
            .with_facet_limit(facet_limit);
        let mut statistics =
            TableEngine::new("Disease Statistics", statistic_columns()).with_facet_limit(facet_limit);
        discrepancies.set_page_size(page_size);
        statistics.set_page_size(page_size);
        Self {
            discrepancies,
            statistics,
            state: DrillState::Idle,
        }
    }

    pub fn discrepancies(&self) -> &TableEngine<DiscrepancyRecord> {
        &self.discrepancies
    }

    pub fn statistics(&self) -> &TableEngine<DiseaseStatistic> {
        &self.statistics
    }

    /// The statistics table is independent of the drill state.
    pub fn statistics_mut(&mut self) -> &mut TableEngine<DiseaseStatistic> {
        &mut self.statistics
    }

    pub fn state(&self) -> &DrillState {
        &self.state
    }

    pub fn drill_context(&self) -> Option<&DrillContext> {
        match &self.state {
            DrillState::Idle => None,
            DrillState::Drilled(context) => Some(context),
        }
    }

    pub fn is_drilled(&self) -> bool {
        matches!(self.state, DrillState::Drilled(_))
    }

    pub fn set_rows(&mut self, discrepancies: Vec<DiscrepancyRecord>, statistics: Vec<DiseaseStatistic>) {
        self.discrepancies.set_rows(discrepancies);
        self.statistics.set_rows(statistics);
        self.leave_drill();
    }

    /// Filters the discrepancy table down to the rows behind one statistic.
    /// Does nothing if the event code is unknown or its total is zero.
    pub fn select_statistic(&mut self, event_code: &str, event_name: &str, kind: ReasonKind) -> bool {
        let Some(statistic) = self
            .statistics
            .rows()
            .iter()
            .find(|s| s.event_code == event_code)
        else {
            debug!("No statistic for event code {event_code}");
            return false;
        };
        if kind.total(statistic) == 0 {
            debug!("{event_code} has no {} to drill into", kind.label());
            return false;
        }

        self.discrepancies.clear_filters();
        self.discrepancies
            .set_column_filter("ReasonID", Some(&kind.reason_id().to_string()));
        self.discrepancies
            .set_column_filter("EventCode", Some(event_code));
        self.state = DrillState::Drilled(DrillContext {
            disease_name: event_name.to_string(),
            discrepancy_type: kind.label(),
        });
        info!(
            "Drilled into {event_code} {}: {} rows",
            kind.label(),
            self.discrepancies.filtered_row_count()
        );
        true
    }

    /// Resolves a cell of the current statistics page into a drill down.
    pub fn select_statistic_cell(&mut self, row_on_page: usize, column_id: &str) -> bool {
        let Some(kind) = ReasonKind::from_statistic_column(column_id) else {
            return false;
        };
        let Some(statistic) = self.statistics.get_visible_rows().get(row_on_page).copied() else {
            return false;
        };
        let event_code = statistic.event_code.clone();
        let event_name = statistic.event_name.clone();
        self.select_statistic(&event_code, &event_name, kind)
    }

    pub fn set_discrepancy_column_filter(&mut self, column_id: &str, value: Option<&str>) -> bool {
        let applied = self.discrepancies.set_column_filter(column_id, value);
        if applied {
            self.leave_drill();
        }
        applied
    }

    pub fn set_discrepancy_global_filter(&mut self, value: &str) {
        self.discrepancies.set_global_filter(value);
        self.leave_drill();
    }

    pub fn toggle_discrepancy_sort(&mut self, column_id: &str) -> bool {
        let applied = self.discrepancies.set_sort(column_id);
        if applied {
            self.leave_drill();
        }
        applied
    }

    pub fn clear_discrepancy_filters(&mut self) {
        self.discrepancies.clear_filters();
        self.leave_drill();
    }

    /// Paging through a drilled subset keeps the drill context.
    pub fn navigate_discrepancies(&mut self, nav: PageNav) -> bool {
        self.discrepancies.navigate(nav)
    }

    pub fn clear_statistic_filters(&mut self) {
        self.statistics.clear_filters();
    }

    fn leave_drill(&mut self) {
        if self.is_drilled() {
            debug!("Leaving drill down");
            self.state = DrillState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discrepancy(case_id: usize, event_code: &str, reason_id: u8) -> DiscrepancyRecord {
        DiscrepancyRecord {
            case_id: format!("C{case_id:04}"),
            event_code: event_code.to_string(),
            event_name: format!("Event {event_code}"),
            case_class_status: "Confirmed".to_string(),
            mmwr_year: 2023,
            mmwr_week: (case_id % 52) as i64 + 1,
            reason: format!("Reason {reason_id}"),
            reason_id,
        }
    }

    fn statistic(event_code: &str, event_name: &str, duplicates: u64, missing_cdc: u64) -> DiseaseStatistic {
        DiseaseStatistic {
            event_code: event_code.to_string(),
            event_name: event_name.to_string(),
            total_cases: 20,
            total_duplicates: duplicates,
            total_missing_from_cdc: missing_cdc,
            ..Default::default()
        }
    }

    // 12 discrepancies, three of them are A10 cases missing from CDC.
    fn controller() -> DrillDownController {
        let rows = vec![
            discrepancy(1, "A10", 2),
            discrepancy(2, "A10", 1),
            discrepancy(3, "B20", 2),
            discrepancy(4, "A10", 2),
            discrepancy(5, "B20", 3),
            discrepancy(6, "A10", 4),
            discrepancy(7, "C30", 2),
            discrepancy(8, "A10", 2),
            discrepancy(9, "C30", 1),
            discrepancy(10, "B20", 4),
            discrepancy(11, "A10", 3),
            discrepancy(12, "C30", 4),
        ];
        let stats = vec![
            statistic("A10", "Measles", 0, 3),
            statistic("B20", "Mumps", 5, 1),
        ];
        let mut controller = DrillDownController::new(5, 5000);
        controller.set_rows(rows, stats);
        controller
    }

    fn case_ids(controller: &DrillDownController) -> Vec<String> {
        controller
            .discrepancies()
            .filtered_rows()
            .into_iter()
            .map(|r| r.case_id.clone())
            .collect()
    }

    #[test]
    fn reason_mapping_is_fixed() {
        assert_eq!(ReasonKind::Duplicates.reason_id(), 1);
        assert_eq!(ReasonKind::MissingFromCdc.reason_id(), 2);
        assert_eq!(ReasonKind::WrongAttributes.reason_id(), 3);
        assert_eq!(ReasonKind::MissingFromState.reason_id(), 4);
        assert_eq!(ReasonKind::from_reason_id(4), Some(ReasonKind::MissingFromState));
        assert_eq!(ReasonKind::from_reason_id(0), None);
        assert_eq!(
            ReasonKind::from_statistic_column("TotalMissingFromState"),
            Some(ReasonKind::MissingFromState)
        );
    }

    #[test]
    fn drilling_shows_exactly_the_matching_rows() {
        let mut controller = controller();
        controller.set_discrepancy_global_filter("Reason");
        assert!(controller.select_statistic("A10", "Measles", ReasonKind::MissingFromCdc));

        assert_eq!(case_ids(&controller), vec!["C0001", "C0004", "C0008"]);
        assert_eq!(controller.discrepancies().get_visible_rows().len(), 3);
        assert_eq!(controller.discrepancies().global_filter(), "");
        assert_eq!(controller.discrepancies().column_filters().len(), 2);
        assert_eq!(controller.discrepancies().column_filter("ReasonID"), Some("2"));
        assert_eq!(controller.discrepancies().column_filter("EventCode"), Some("A10"));
        assert_eq!(
            controller.drill_context(),
            Some(&DrillContext {
                disease_name: "Measles".to_string(),
                discrepancy_type: "Missing From CDC",
            })
        );
        assert_eq!(controller.drill_context().unwrap().title(), "Measles Missing From CDC");
    }

    #[test]
    fn zero_totals_are_not_drillable() {
        let mut controller = controller();
        controller.set_discrepancy_column_filter("CaseClassStatus", Some("Conf"));
        assert!(!controller.select_statistic("A10", "Measles", ReasonKind::Duplicates));
        assert_eq!(*controller.state(), DrillState::Idle);
        assert_eq!(controller.discrepancies().column_filter("CaseClassStatus"), Some("Conf"));
        assert_eq!(controller.discrepancies().column_filters().len(), 1);

        assert!(!controller.select_statistic("Z99", "Unknown", ReasonKind::Duplicates));
    }

    #[test]
    fn duplicates_map_to_reason_one() {
        let mut controller = controller();
        assert!(controller.select_statistic("B20", "Mumps", ReasonKind::Duplicates));
        assert_eq!(controller.discrepancies().column_filter("ReasonID"), Some("1"));
        assert_eq!(controller.drill_context().unwrap().discrepancy_type, "Duplicates");
        assert!(case_ids(&controller).is_empty());
    }

    #[test]
    fn a_zero_click_keeps_an_existing_drill() {
        let mut controller = controller();
        controller.select_statistic("A10", "Measles", ReasonKind::MissingFromCdc);
        controller.select_statistic("A10", "Measles", ReasonKind::Duplicates);
        assert_eq!(controller.drill_context().unwrap().discrepancy_type, "Missing From CDC");
        assert_eq!(case_ids(&controller).len(), 3);
    }

    #[test]
    fn direct_interaction_leaves_the_drill() {
        let actions: [fn(&mut DrillDownController); 4] = [
            |c: &mut DrillDownController| {
                c.set_discrepancy_column_filter("ReasonID", Some("2"));
            },
            |c: &mut DrillDownController| c.set_discrepancy_global_filter("A10"),
            |c: &mut DrillDownController| {
                c.toggle_discrepancy_sort("CaseID");
            },
            |c: &mut DrillDownController| c.clear_discrepancy_filters(),
        ];
        for action in actions {
            let mut controller = controller();
            controller.select_statistic("A10", "Measles", ReasonKind::MissingFromCdc);
            assert!(controller.is_drilled());
            action(&mut controller);
            assert_eq!(*controller.state(), DrillState::Idle);
            assert!(controller.drill_context().is_none());
        }
    }

    #[test]
    fn filters_set_by_the_user_survive_leaving_the_drill() {
        let mut controller = controller();
        controller.select_statistic("A10", "Measles", ReasonKind::MissingFromCdc);
        controller.set_discrepancy_column_filter("CaseID", Some("C000"));
        assert!(!controller.is_drilled());
        assert_eq!(controller.discrepancies().column_filter("EventCode"), Some("A10"));
        assert_eq!(case_ids(&controller), vec!["C0001", "C0004", "C0008"]);
    }

    #[test]
    fn paging_and_statistics_changes_keep_the_drill() {
        let mut controller = controller();
        controller.select_statistic("A10", "Measles", ReasonKind::MissingFromCdc);
        controller.navigate_discrepancies(PageNav::Size(10));
        controller.navigate_discrepancies(PageNav::Next);
        controller.statistics_mut().set_global_filter("Mumps");
        controller.clear_statistic_filters();
        assert!(controller.is_drilled());
    }

    #[test]
    fn statistic_cells_resolve_to_drill_downs() {
        let mut controller = controller();
        assert!(!controller.select_statistic_cell(0, "EventName"));
        assert!(!controller.select_statistic_cell(0, "TotalDuplicates"));
        assert!(!controller.select_statistic_cell(7, "TotalMissingFromCDC"));
        assert!(controller.select_statistic_cell(1, "TotalMissingFromCDC"));
        assert_eq!(controller.drill_context().unwrap().title(), "Mumps Missing From CDC");
        assert_eq!(case_ids(&controller), vec!["C0003"]);
    }

    #[test]
    fn reloading_rows_resets_the_drill() {
        let mut controller = controller();
        controller.select_statistic("A10", "Measles", ReasonKind::MissingFromCdc);
        controller.set_rows(Vec::new(), Vec::new());
        assert!(!controller.is_drilled());
    }
}
