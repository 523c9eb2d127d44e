use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace, warn};

use crate::csv::{
    DISCREPANCY_FILE, STATISTIC_FILE, discrepancies_to_csv, discrepancy_line, export,
    statistic_line, statistics_to_csv,
};
use crate::debounce::DebouncedField;
use crate::domain::{Focus, HELP_TEXT, InputTarget, Message, ReconError, ViewConfig};
use crate::inputter::{InputResult, Inputter};
use crate::loader::ReportDataLoader;
use crate::report::ReportView;
use crate::table::{Facet, PAGE_SIZES, PageNav, Pagination, TableEngine};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
    HISTOGRAM,
    REPORTS,
}

/// Text input in progress, committed through a debounced field.
struct Editing {
    focus: Focus,
    target: InputTarget,
    field: DebouncedField,
    placeholder: String,
}

/// Reports of the archive, shown as a pick list.
pub struct ReportPicker {
    pub ids: Vec<String>,
    pub cursor: usize,
}

/// Facet values of one column, shown as a pick list.
pub struct FacetView {
    pub focus: Focus,
    pub column_id: &'static str,
    pub facet: Facet,
    pub cursor: usize,
}

pub struct Model {
    config: ViewConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    loader: Box<dyn ReportDataLoader>,
    view: ReportView,
    focus: Focus,
    cursor_row: usize,
    cursor_column: usize,
    input: Inputter,
    last_input: InputResult,
    editing: Option<Editing>,
    facet_view: Option<FacetView>,
    report_picker: Option<ReportPicker>,
    popup_message: String,
    clipboard: Option<Clipboard>,
    status_message: String,
    started: Instant,
    ui_size: (usize, usize),
}

impl Model {
    pub fn init(config: &ViewConfig, loader: Box<dyn ReportDataLoader>) -> Self {
        Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            loader,
            view: ReportView::new(config),
            focus: Focus::Discrepancies,
            cursor_row: 0,
            cursor_column: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            editing: None,
            facet_view: None,
            report_picker: None,
            popup_message: String::new(),
            clipboard: None,
            status_message: "Started reconview!".to_string(),
            started: Instant::now(),
            ui_size: (0, 0),
        }
    }

    pub fn open_report(&mut self, report_id: &str) -> Result<(), ReconError> {
        let start_time = Instant::now();
        self.view.load(self.loader.as_ref(), report_id)?;
        self.editing = None;
        self.facet_view = None;
        self.modus = Modus::TABLE;
        self.focus = Focus::Discrepancies;
        self.cursor_row = 0;
        self.cursor_column = 0;
        self.set_status_message(format!(
            "Loaded report {report_id} in {}ms",
            start_time.elapsed().as_millis()
        ));
        Ok(())
    }

    // -------------------- Accessors for rendering ---------------------- //

    pub fn view(&self) -> &ReportView {
        &self.view
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_column)
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn popup_message(&self) -> &str {
        &self.popup_message
    }

    pub fn facet_view(&self) -> Option<&FacetView> {
        self.facet_view.as_ref()
    }

    pub fn report_picker(&self) -> Option<&ReportPicker> {
        self.report_picker.as_ref()
    }

    pub fn ui_size(&self) -> (usize, usize) {
        self.ui_size
    }

    /// Prompt, placeholder and current text of an active input.
    pub fn input_line(&self) -> Option<(String, &str, &InputResult)> {
        let editing = self.editing.as_ref()?;
        let prompt = match &editing.target {
            InputTarget::GlobalFilter => "search".to_string(),
            InputTarget::ColumnFilter(column) => format!("filter {column}"),
            InputTarget::GotoPage => "go to page".to_string(),
        };
        Some((prompt, editing.placeholder.as_str(), &self.last_input))
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // -------------------- Update loop ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), ReconError> {
        let now = self.started.elapsed().as_millis() as u64;
        self.step(message, now)
    }

    /// Applies one message at logical time `now` (milliseconds).
    pub fn step(&mut self, message: Option<Message>, now: u64) -> Result<(), ReconError> {
        self.poll_input(now);

        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.cursor_row = self.cursor_row.saturating_sub(1),
                    Message::MoveDown => self.cursor_row += 1,
                    Message::MoveLeft => self.cursor_column = self.cursor_column.saturating_sub(1),
                    Message::MoveRight => self.cursor_column += 1,
                    Message::NextPage => self.navigate(PageNav::Next),
                    Message::PreviousPage => self.navigate(PageNav::Previous),
                    Message::FirstPage => self.navigate(PageNav::First),
                    Message::LastPage => self.navigate(PageNav::Last),
                    Message::GrowPageSize => self.step_page_size(true),
                    Message::ShrinkPageSize => self.step_page_size(false),
                    Message::ToggleSort => self.toggle_sort(),
                    Message::SearchAll => self.enter_cmd_mode(InputTarget::GlobalFilter),
                    Message::FilterColumn => {
                        if let Some(column) = self.current_column_id() {
                            self.enter_cmd_mode(InputTarget::ColumnFilter(column));
                        }
                    }
                    Message::ClearFilters => self.clear_filters(),
                    Message::SwitchTable => self.switch_table(),
                    Message::ToggleDiseaseStats => self.toggle_disease_stats(),
                    Message::Histogram => self.build_histogram_view(),
                    Message::Export => self.export_table(),
                    Message::CopyRow => self.copy_row(),
                    Message::GotoPage => self.enter_cmd_mode(InputTarget::GotoPage),
                    Message::Reports => self.build_report_picker(),
                    Message::Help => self.show_help(),
                    Message::Enter => self.drill_down(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::HISTOGRAM => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_histogram_selection(-1),
                    Message::MoveDown => self.move_histogram_selection(1),
                    Message::PreviousPage => self.move_histogram_selection(-10),
                    Message::NextPage => self.move_histogram_selection(10),
                    Message::Enter => self.apply_histogram_selection(),
                    Message::Exit => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::REPORTS => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_report_selection(-1),
                    Message::MoveDown => self.move_report_selection(1),
                    Message::Enter => self.apply_report_selection(),
                    Message::Exit | Message::Reports => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key, now),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        self.clamp_cursor();
        Ok(())
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        trace!("Status: {}", self.status_message);
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized! {:?} -> ({width}, {height})", self.ui_size);
        self.ui_size = (width, height);
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP | Modus::HISTOGRAM | Modus::REPORTS => {
                self.facet_view = None;
                self.report_picker = None;
                self.modus = self.previous_modus;
                self.previous_modus = Modus::TABLE;
            }
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    // -------------------- Focused table helpers ---------------------- //

    fn column_ids<R: Sync>(engine: &TableEngine<R>) -> Vec<&'static str> {
        engine.columns().iter().map(|c| c.id).collect()
    }

    fn current_column_id(&self) -> Option<&'static str> {
        let controller = self.view.controller();
        let ids = match self.focus {
            Focus::Discrepancies => Self::column_ids(controller.discrepancies()),
            Focus::Statistics => Self::column_ids(controller.statistics()),
        };
        ids.get(self.cursor_column).copied()
    }

    fn focused_shape(&self) -> (usize, usize) {
        let controller = self.view.controller();
        match self.focus {
            Focus::Discrepancies => {
                let engine = controller.discrepancies();
                (engine.page_indices().len(), engine.columns().len())
            }
            Focus::Statistics => {
                let engine = controller.statistics();
                (engine.page_indices().len(), engine.columns().len())
            }
        }
    }

    fn clamp_cursor(&mut self) {
        let (rows, columns) = self.focused_shape();
        self.cursor_row = std::cmp::min(self.cursor_row, rows.saturating_sub(1));
        self.cursor_column = std::cmp::min(self.cursor_column, columns.saturating_sub(1));
    }

    fn focused_pagination(&self) -> Pagination {
        let controller = self.view.controller();
        match self.focus {
            Focus::Discrepancies => controller.discrepancies().pagination(),
            Focus::Statistics => controller.statistics().pagination(),
        }
    }

    fn navigate(&mut self, nav: PageNav) {
        let controller = self.view.controller_mut();
        let applied = match self.focus {
            Focus::Discrepancies => controller.navigate_discrepancies(nav),
            Focus::Statistics => controller.statistics_mut().navigate(nav),
        };
        if !applied {
            self.set_status_message(format!("Cannot apply {nav:?}"));
        }
    }

    fn step_page_size(&mut self, grow: bool) {
        let current = self.focused_pagination().page_size;
        let position = PAGE_SIZES.iter().position(|&s| s == current).unwrap_or(0);
        let next = if grow {
            std::cmp::min(position + 1, PAGE_SIZES.len() - 1)
        } else {
            position.saturating_sub(1)
        };
        self.navigate(PageNav::Size(PAGE_SIZES[next]));
        self.set_status_message(format!("Showing {} rows per page", PAGE_SIZES[next]));
    }

    fn toggle_sort(&mut self) {
        let Some(column) = self.current_column_id() else {
            return;
        };
        let controller = self.view.controller_mut();
        match self.focus {
            Focus::Discrepancies => controller.toggle_discrepancy_sort(column),
            Focus::Statistics => controller.statistics_mut().set_sort(column),
        };
    }

    fn clear_filters(&mut self) {
        let controller = self.view.controller_mut();
        match self.focus {
            Focus::Discrepancies => controller.clear_discrepancy_filters(),
            Focus::Statistics => controller.clear_statistic_filters(),
        }
        self.set_status_message("Filters cleared");
    }

    fn switch_table(&mut self) {
        self.focus = match self.focus {
            Focus::Discrepancies => {
                if !self.view.show_disease_stats() {
                    self.view.toggle_disease_stats();
                }
                Focus::Statistics
            }
            Focus::Statistics => Focus::Discrepancies,
        };
        self.cursor_row = 0;
        self.cursor_column = 0;
    }

    fn toggle_disease_stats(&mut self) {
        self.view.toggle_disease_stats();
        if !self.view.show_disease_stats() && self.focus == Focus::Statistics {
            self.focus = Focus::Discrepancies;
            self.cursor_row = 0;
            self.cursor_column = 0;
        }
    }

    fn drill_down(&mut self) {
        if self.focus != Focus::Statistics {
            return;
        }
        let Some(column) = self.current_column_id() else {
            return;
        };
        let controller = self.view.controller_mut();
        if controller.select_statistic_cell(self.cursor_row, column) {
            let title = controller
                .drill_context()
                .map(|c| c.title())
                .unwrap_or_default();
            let count = controller.discrepancies().filtered_row_count();
            self.focus = Focus::Discrepancies;
            self.cursor_row = 0;
            self.cursor_column = 0;
            self.set_status_message(format!("{title}: {count} cases"));
        } else {
            self.set_status_message("Nothing to drill into");
        }
    }

    // -------------------- Filter input ---------------------- //

    fn filter_value(&self, focus: Focus, target: &InputTarget) -> String {
        let controller = self.view.controller();
        let value = match (focus, target) {
            (Focus::Discrepancies, InputTarget::GlobalFilter) => {
                Some(controller.discrepancies().global_filter())
            }
            (Focus::Statistics, InputTarget::GlobalFilter) => {
                Some(controller.statistics().global_filter())
            }
            (Focus::Discrepancies, InputTarget::ColumnFilter(column)) => {
                controller.discrepancies().column_filter(column)
            }
            (Focus::Statistics, InputTarget::ColumnFilter(column)) => {
                controller.statistics().column_filter(column)
            }
            (_, InputTarget::GotoPage) => None,
        };
        value.unwrap_or("").to_string()
    }

    fn facet(&self, focus: Focus, column: &str) -> Option<Facet> {
        let controller = self.view.controller();
        match focus {
            Focus::Discrepancies => controller.discrepancies().faceted_unique_values(column),
            Focus::Statistics => controller.statistics().faceted_unique_values(column),
        }
    }

    fn apply_filter(&mut self, focus: Focus, target: &InputTarget, value: &str) {
        debug!("Applying {target:?} = \"{value}\" on {focus:?}");
        if *target == InputTarget::GotoPage {
            self.goto_page(value);
            return;
        }
        let controller = self.view.controller_mut();
        match (focus, target) {
            (Focus::Discrepancies, InputTarget::GlobalFilter) => {
                controller.set_discrepancy_global_filter(value)
            }
            (Focus::Statistics, InputTarget::GlobalFilter) => {
                controller.statistics_mut().set_global_filter(value)
            }
            (Focus::Discrepancies, InputTarget::ColumnFilter(column)) => {
                controller.set_discrepancy_column_filter(column, Some(value));
            }
            (Focus::Statistics, InputTarget::ColumnFilter(column)) => {
                controller
                    .statistics_mut()
                    .set_column_filter(column, Some(value));
            }
            (_, InputTarget::GotoPage) => {}
        }
    }

    // Page numbers are 1 based, pages past the end land on the last page.
    fn goto_page(&mut self, value: &str) {
        match value.trim().parse::<usize>() {
            Ok(page) if page > 0 => {
                self.navigate(PageNav::Index(page - 1));
                self.cursor_row = 0;
                let pagination = self.focused_pagination();
                self.set_status_message(format!("Page {}", pagination.page_index + 1));
            }
            _ => self.set_status_message(format!("\"{value}\" is not a page number")),
        }
    }

    fn enter_cmd_mode(&mut self, target: InputTarget) {
        trace!("Entering command mode for {target:?} ...");
        let committed = self.filter_value(self.focus, &target);
        let placeholder = match &target {
            InputTarget::GlobalFilter => "Search all columns...".to_string(),
            InputTarget::ColumnFilter(column) => {
                let count = self.facet(self.focus, column).map(|f| f.count).unwrap_or(0);
                format!("Search... ({count})")
            }
            InputTarget::GotoPage => {
                let pagination = self.focused_pagination();
                format!("Page {}", pagination.page_index + 1)
            }
        };
        self.input.set(&committed);
        self.last_input = self.input.get();
        self.editing = Some(Editing {
            focus: self.focus,
            target,
            field: DebouncedField::new(&committed, self.config.debounce_window),
            placeholder,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
    }

    fn raw_input(&mut self, key: KeyEvent, now: u64) {
        let Some(editing) = self.editing.as_mut() else {
            return;
        };
        self.last_input = self.input.read(key);
        if self.last_input.canceled {
            trace!("Input canceled, keeping \"{}\"", editing.field.committed());
            self.leave_cmd_mode();
        } else if self.last_input.finished {
            editing.field.input(&self.last_input.input, now);
            let commit = editing.field.flush();
            let (focus, target) = (editing.focus, editing.target.clone());
            if let Some(value) = commit {
                self.apply_filter(focus, &target, &value);
            }
            self.leave_cmd_mode();
        } else {
            editing.field.input(&self.last_input.input, now);
        }
    }

    // Commits pending input once it went quiet. Filters changed by other
    // means are echoed back into the field first. Page numbers wait for Enter.
    fn poll_input(&mut self, now: u64) {
        let Some(editing) = self.editing.as_ref() else {
            return;
        };
        if editing.target == InputTarget::GotoPage {
            return;
        }
        let (focus, target) = (editing.focus, editing.target.clone());
        let current = self.filter_value(focus, &target);

        let Some(editing) = self.editing.as_mut() else {
            return;
        };
        if editing.field.committed() != current {
            editing.field.sync(&current);
            self.input.set(&current);
            self.last_input = self.input.get();
        }
        if let Some(value) = editing.field.poll(now) {
            self.apply_filter(focus, &target, &value);
        }
    }

    fn leave_cmd_mode(&mut self) {
        self.editing = None;
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::CMDINPUT;
    }

    // -------------------- Facet pick list ---------------------- //

    fn build_histogram_view(&mut self) {
        let Some(column_id) = self.current_column_id() else {
            return;
        };
        let Some(facet) = self.facet(self.focus, column_id) else {
            return;
        };
        self.set_status_message(format!("{} unique values in {column_id}", facet.count));
        self.facet_view = Some(FacetView {
            focus: self.focus,
            column_id,
            facet,
            cursor: 0,
        });
        self.previous_modus = self.modus;
        self.modus = Modus::HISTOGRAM;
    }

    fn move_histogram_selection(&mut self, step: i64) {
        if let Some(hist) = self.facet_view.as_mut() {
            let last = hist.facet.values.len().saturating_sub(1) as i64;
            hist.cursor = (hist.cursor as i64 + step).clamp(0, last) as usize;
        }
    }

    fn apply_histogram_selection(&mut self) {
        let Some(hist) = self.facet_view.take() else {
            return;
        };
        if let Some((value, _)) = hist.facet.values.get(hist.cursor) {
            self.apply_filter(hist.focus, &InputTarget::ColumnFilter(hist.column_id), value);
            self.cursor_row = 0;
        }
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::HISTOGRAM;
    }

    // -------------------- Report pick list ---------------------- //

    fn build_report_picker(&mut self) {
        let ids = match self.loader.list_reports() {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Listing reports failed: {e}");
                self.set_status_message(format!("Cannot list reports: {e}"));
                return;
            }
        };
        let cursor = self
            .view
            .report_id()
            .and_then(|current| ids.iter().position(|id| id == current))
            .unwrap_or(0);
        self.report_picker = Some(ReportPicker { ids, cursor });
        self.previous_modus = self.modus;
        self.modus = Modus::REPORTS;
    }

    fn move_report_selection(&mut self, step: i64) {
        if let Some(picker) = self.report_picker.as_mut() {
            let last = picker.ids.len().saturating_sub(1) as i64;
            picker.cursor = (picker.cursor as i64 + step).clamp(0, last) as usize;
        }
    }

    // A report that fails to load leaves the current one on screen.
    fn apply_report_selection(&mut self) {
        let Some(picker) = self.report_picker.take() else {
            return;
        };
        self.modus = Modus::TABLE;
        self.previous_modus = Modus::REPORTS;
        let Some(report_id) = picker.ids.get(picker.cursor) else {
            return;
        };
        if let Err(e) = self.open_report(report_id) {
            self.set_status_message(format!("Cannot open report {report_id}: {e}"));
        }
    }

    // -------------------- Export and clipboard ---------------------- //

    fn export_table(&mut self) {
        let controller = self.view.controller();
        let (file_name, contents) = match self.focus {
            Focus::Discrepancies => (
                DISCREPANCY_FILE,
                discrepancies_to_csv(controller.discrepancies().rows()),
            ),
            Focus::Statistics => (
                STATISTIC_FILE,
                statistics_to_csv(controller.statistics().rows()),
            ),
        };
        match export(&self.config.export_dir, file_name, &contents) {
            Ok(path) => self.set_status_message(format!("Exported {}", path.display())),
            Err(e) => {
                warn!("Export failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    fn selected_row_csv(&self) -> Option<String> {
        let controller = self.view.controller();
        match self.focus {
            Focus::Discrepancies => controller
                .discrepancies()
                .get_visible_rows()
                .get(self.cursor_row)
                .map(|r| discrepancy_line(r)),
            Focus::Statistics => controller
                .statistics()
                .get_visible_rows()
                .get(self.cursor_row)
                .map(|s| statistic_line(s)),
        }
    }

    fn clipboard(&mut self) -> Result<&mut Clipboard, ReconError> {
        if self.clipboard.is_none() {
            let clipboard =
                Clipboard::new().map_err(|e| ReconError::ClipboardError(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| ReconError::ClipboardError("unavailable".to_string()))
    }

    fn copy_row(&mut self) {
        let Some(line) = self.selected_row_csv() else {
            return;
        };
        let copied = self.clipboard().and_then(|c| {
            c.set_text(line)
                .map_err(|e| ReconError::ClipboardError(e.to_string()))
        });
        match copied {
            Ok(_) => {
                info!("Copied row to clipboard.");
                self.set_status_message("Copied row");
            }
            Err(e) => {
                warn!("Error copying to clipboard: {e}");
                self.set_status_message(format!("{e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ArchiveLoader;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn model_with(config: ViewConfig) -> Model {
        let loader = Box::new(ArchiveLoader::new("tests/fixtures/archive"));
        let mut model = Model::init(&config, loader);
        model.open_report("7").unwrap();
        model
    }

    fn model() -> Model {
        model_with(ViewConfig::default())
    }

    fn key(c: char) -> Message {
        Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn send(model: &mut Model, messages: &[Message], now: u64) {
        for m in messages {
            model.step(Some(m.clone()), now).unwrap();
        }
    }

    fn discrepancy_count(model: &Model) -> usize {
        model.view().controller().discrepancies().filtered_row_count()
    }

    #[test]
    fn enter_on_a_statistic_total_drills_down() {
        let mut model = model();
        send(&mut model, &[Message::SwitchTable], 0);
        assert!(model.view().show_disease_stats());
        assert_eq!(model.focus(), Focus::Statistics);

        for _ in 0..4 {
            send(&mut model, &[Message::MoveRight], 0);
        }
        assert_eq!(model.current_column_id(), Some("TotalMissingFromCDC"));
        send(&mut model, &[Message::Enter], 0);

        assert_eq!(model.focus(), Focus::Discrepancies);
        assert_eq!(discrepancy_count(&model), 3);
        assert_eq!(model.status_message(), "Measles Missing From CDC: 3 cases");
    }

    #[test]
    fn enter_on_a_zero_total_does_nothing() {
        let mut model = model();
        send(&mut model, &[Message::SwitchTable, Message::MoveDown], 0);
        for _ in 0..3 {
            send(&mut model, &[Message::MoveRight], 0);
        }
        send(&mut model, &[Message::Enter], 0);
        assert_eq!(model.focus(), Focus::Statistics);
        assert!(!model.view().controller().is_drilled());
        assert_eq!(discrepancy_count(&model), 6);
    }

    #[test]
    fn column_filter_commits_after_quiet_period() {
        let mut model = model();
        send(&mut model, &[Message::FilterColumn], 1000);
        assert!(model.raw_keyevents());
        assert_eq!(model.input_line().unwrap().1, "Search... (6)");

        send(&mut model, &[key('0'), key('0')], 1000);
        send(&mut model, &[key('6')], 1100);
        model.step(None, 1599).unwrap();
        assert_eq!(discrepancy_count(&model), 6);

        model.step(None, 1600).unwrap();
        assert_eq!(
            model.view().controller().discrepancies().column_filter("CaseID"),
            Some("006")
        );
        assert_eq!(discrepancy_count(&model), 1);
        assert!(model.raw_keyevents());
    }

    #[test]
    fn enter_commits_immediately_and_leaves_input() {
        let mut model = model();
        send(&mut model, &[Message::SearchAll, key('M'), key('u')], 0);
        send(&mut model, &[enter()], 10);
        assert!(!model.raw_keyevents());
        assert_eq!(model.view().controller().discrepancies().global_filter(), "Mu");
        assert_eq!(discrepancy_count(&model), 2);
    }

    #[test]
    fn escape_drops_pending_input() {
        let mut model = model();
        send(&mut model, &[Message::SearchAll, key('x')], 0);
        let esc = Message::RawKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        send(&mut model, &[esc], 10);
        model.step(None, 10_000).unwrap();
        assert_eq!(model.view().controller().discrepancies().global_filter(), "");
    }

    #[test]
    fn typing_into_a_drilled_table_leaves_the_drill() {
        let mut model = model();
        send(&mut model, &[Message::SwitchTable], 0);
        for _ in 0..4 {
            send(&mut model, &[Message::MoveRight], 0);
        }
        send(&mut model, &[Message::Enter], 0);
        assert!(model.view().controller().is_drilled());

        send(&mut model, &[Message::SearchAll, key('P')], 100);
        assert!(model.view().controller().is_drilled());
        model.step(None, 600).unwrap();
        assert!(!model.view().controller().is_drilled());
        assert_eq!(discrepancy_count(&model), 1);
    }

    #[test]
    fn histogram_selection_becomes_a_filter() {
        let mut model = model();
        send(&mut model, &[Message::MoveRight, Message::MoveRight, Message::Histogram], 0);
        let hist = model.facet_view().unwrap();
        assert_eq!(hist.column_id, "EventName");
        assert_eq!(
            hist.facet.values,
            vec![("Measles".to_string(), 4), ("Mumps".to_string(), 2)]
        );

        send(&mut model, &[Message::MoveDown, Message::MoveDown, Message::Enter], 0);
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(
            model.view().controller().discrepancies().column_filter("EventName"),
            Some("Mumps")
        );
        assert_eq!(discrepancy_count(&model), 2);
    }

    #[test]
    fn page_size_steps_through_allowed_sizes() {
        let mut model = model();
        send(&mut model, &[Message::GrowPageSize, Message::GrowPageSize], 0);
        let engine = model.view().controller().discrepancies();
        assert_eq!(engine.pagination().page_size, 20);
        let shrink = [
            Message::ShrinkPageSize,
            Message::ShrinkPageSize,
            Message::ShrinkPageSize,
        ];
        send(&mut model, &shrink, 0);
        let engine = model.view().controller().discrepancies();
        assert_eq!(engine.pagination().page_size, 5);
        assert_eq!(engine.page_count(), 2);
    }

    #[test]
    fn cursor_stays_on_the_page() {
        let mut model = model();
        send(&mut model, &[Message::LastPage], 0);
        for _ in 0..10 {
            send(&mut model, &[Message::MoveDown, Message::MoveRight], 0);
        }
        assert_eq!(model.cursor(), (0, 7));
    }

    #[test]
    fn export_writes_the_full_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model_with(ViewConfig::default().export_dir(dir.path()));
        send(&mut model, &[Message::SearchAll, key('Z'), key('Z')], 0);
        model.step(None, 1000).unwrap();
        assert_eq!(discrepancy_count(&model), 0);

        send(&mut model, &[Message::Export], 1000);
        let written = std::fs::read_to_string(dir.path().join(DISCREPANCY_FILE)).unwrap();
        assert_eq!(written.lines().count(), 7);
    }

    fn enter() -> Message {
        Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
    }

    fn page_index(model: &Model) -> usize {
        model.view().controller().discrepancies().pagination().page_index
    }

    #[test]
    fn goto_page_waits_for_enter_and_clamps() {
        let mut model = model();
        send(&mut model, &[Message::GotoPage, key('2')], 0);
        assert_eq!(model.input_line().unwrap().1, "Page 1");
        model.step(None, 10_000).unwrap();
        assert_eq!(page_index(&model), 0);

        send(&mut model, &[enter()], 10_000);
        assert_eq!(page_index(&model), 1);
        assert!(!model.raw_keyevents());

        send(&mut model, &[Message::FirstPage, Message::GotoPage, key('9'), enter()], 0);
        assert_eq!(page_index(&model), 1);

        send(&mut model, &[Message::GotoPage, key('0'), enter()], 0);
        assert_eq!(page_index(&model), 1);
        assert_eq!(model.status_message(), "\"0\" is not a page number");
    }

    #[test]
    fn switching_reports_keeps_view_on_failure() {
        let mut model = model();
        send(&mut model, &[Message::SearchAll, key('M'), key('u'), enter()], 0);
        assert_eq!(discrepancy_count(&model), 2);

        send(&mut model, &[Message::Reports], 0);
        assert_eq!(model.modus(), Modus::REPORTS);
        let picker = model.report_picker().unwrap();
        assert_eq!(picker.ids, vec!["7", "9", "12"]);
        assert_eq!(picker.cursor, 0);

        send(&mut model, &[Message::MoveDown, Message::Enter], 0);
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(model.view().report_id(), Some("7"));
        assert_eq!(model.view().controller().discrepancies().global_filter(), "Mu");
        assert_eq!(discrepancy_count(&model), 2);
        assert!(model.status_message().starts_with("Cannot open report 9"));

        send(&mut model, &[Message::Reports, Message::MoveDown, Message::MoveDown], 0);
        send(&mut model, &[Message::Enter], 0);
        assert_eq!(model.view().report_id(), Some("12"));
        assert_eq!(model.view().controller().discrepancies().global_filter(), "");
        assert_eq!(discrepancy_count(&model), 6);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = model();
        send(&mut model, &[Message::Help], 0);
        assert_eq!(model.modus(), Modus::POPUP);
        assert_eq!(model.popup_message(), HELP_TEXT);
        send(&mut model, &[Message::Exit], 0);
        assert_eq!(model.modus(), Modus::TABLE);
    }
}
