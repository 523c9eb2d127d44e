use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};

use crate::domain::{Focus, ViewConfig};
use crate::model::{Model, Modus};
use crate::table::{SortDirection, TableEngine};

const SELECTED_ROW: Style = Style::new().bg(Color::DarkGray);
const SELECTED_CELL: Style = Style::new().fg(Color::Black).bg(Color::Cyan);

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let view = model.view();
        let controller = view.controller();

        let stats_height = if view.show_disease_stats() {
            let page = controller.statistics().pagination().page_size as u16;
            Constraint::Length(page + 4)
        } else {
            Constraint::Length(0)
        };
        let [header, stats, discrepancies, input, status] = Layout::vertical([
            Constraint::Length(3),
            stats_height,
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_totals(model, frame, header);

        if view.show_disease_stats() {
            self.draw_table(
                controller.statistics(),
                " Disease Statistics ".to_string(),
                model.focus() == Focus::Statistics,
                model.cursor(),
                frame,
                stats,
            );
        }

        let title = controller
            .drill_context()
            .map(|c| c.title())
            .unwrap_or_else(|| "Report Discrepancies".to_string());
        self.draw_table(
            controller.discrepancies(),
            format!(" {title} "),
            model.focus() == Focus::Discrepancies,
            model.cursor(),
            frame,
            discrepancies,
        );

        Self::draw_input(model, frame, input);
        frame.render_widget(
            Paragraph::new(model.status_message().to_string()).dark_gray(),
            status,
        );

        match model.modus() {
            Modus::HISTOGRAM => Self::draw_histogram(model, frame),
            Modus::REPORTS => Self::draw_report_picker(model, frame),
            Modus::POPUP => Self::draw_popup(model.popup_message(), frame),
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn draw_totals(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let totals = model.view().totals();
        let report = model.view().report_id().unwrap_or("-");
        let line = Line::from(vec![
            " Cases different ".into(),
            Span::from(totals.cases_different.to_string()).yellow().bold(),
            " | Total cases ".into(),
            Span::from(totals.total_cases.to_string()).bold(),
            " | Duplicates ".into(),
            Span::from(totals.total_duplicates.to_string()).bold(),
            " | Missing from CDC ".into(),
            Span::from(totals.total_missing_from_cdc.to_string()).bold(),
            " | Missing from state ".into(),
            Span::from(totals.total_missing_from_state.to_string()).bold(),
            " | Wrong attributes ".into(),
            Span::from(totals.total_wrong_attributes.to_string()).bold(),
        ]);
        let block = Block::bordered().title(Line::from(Span::from(format!(" Report {report} ")).bold()));
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_table<R: Sync>(
        &self,
        engine: &TableEngine<R>,
        title: String,
        focused: bool,
        cursor: (usize, usize),
        frame: &mut Frame,
        area: Rect,
    ) {
        let headers: Vec<Cell> = engine
            .columns()
            .iter()
            .map(|c| {
                let marker = match engine.sort_direction(c.id) {
                    Some(SortDirection::Ascending) => " ▲",
                    Some(SortDirection::Descending) => " ▼",
                    None => "",
                };
                let filtered = if engine.column_filter(c.id).is_some() { "*" } else { "" };
                Cell::from(format!("{}{filtered}{marker}", c.header))
            })
            .collect();

        let cells = engine.page_cells();
        let mut widths: Vec<usize> = engine
            .columns()
            .iter()
            .map(|c| c.header.chars().count() + 3)
            .collect();
        for row in &cells {
            for (w, value) in widths.iter_mut().zip(row) {
                *w = (*w).max(value.chars().count());
            }
        }

        let rows: Vec<Row> = cells
            .into_iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let row_cells: Vec<Cell> = row
                    .into_iter()
                    .enumerate()
                    .map(|(col_idx, value)| {
                        let cell = Cell::from(value);
                        if focused && (row_idx, col_idx) == cursor {
                            cell.style(SELECTED_CELL)
                        } else {
                            cell
                        }
                    })
                    .collect();
                let row = Row::new(row_cells);
                if focused && row_idx == cursor.0 { row.style(SELECTED_ROW) } else { row }
            })
            .collect();

        let constraints = widths
            .iter()
            .map(|w| Constraint::Length(std::cmp::min(*w, self.max_column_width) as u16));

        let pagination = engine.pagination();
        let footer = format!(
            " Page {} of {} | Show {} | {} rows ",
            pagination.page_index + 1,
            std::cmp::max(engine.page_count(), 1),
            pagination.page_size,
            engine.filtered_row_count()
        );
        let border_style = if focused {
            Style::new().fg(Color::Cyan)
        } else {
            Style::new()
        };
        let block = Block::bordered()
            .border_style(border_style)
            .title(Line::from(Span::from(title).bold()))
            .title_bottom(Line::from(footer).right_aligned());

        let table = Table::new(rows, constraints)
            .column_spacing(1)
            .header(Row::new(headers).bold().underlined())
            .block(block);
        frame.render_widget(table, area);
    }

    fn draw_input(model: &Model, frame: &mut Frame, area: Rect) {
        let Some((prompt, placeholder, input)) = model.input_line() else {
            frame.render_widget(Paragraph::new(" ? for help".dark_gray()), area);
            return;
        };
        let prefix = format!("{prompt}: ");
        let text = if input.input.is_empty() {
            Span::from(placeholder.to_string()).dark_gray()
        } else {
            Span::from(input.input.clone())
        };
        frame.render_widget(Paragraph::new(Line::from(vec![Span::from(prefix.clone()).bold(), text])), area);

        let offset = (prefix.chars().count() + input.cursor_pos) as u16;
        frame.set_cursor_position((area.x + offset, area.y));
    }

    fn draw_histogram(model: &Model, frame: &mut Frame) {
        let Some(hist) = model.facet_view() else {
            return;
        };
        let area = popup_area(frame.area(), 50, 60);
        let items: Vec<ListItem> = hist
            .facet
            .values
            .iter()
            .map(|(value, count)| ListItem::new(format!("{count:>8}  {value}")))
            .collect();
        let title = format!(" {} ({} values) ", hist.column_id, hist.facet.count);
        let list = List::new(items)
            .block(Block::bordered().title(Span::from(title).bold()))
            .highlight_style(SELECTED_CELL);
        let mut state = ListState::default().with_selected(Some(hist.cursor));

        frame.render_widget(Clear, area);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_report_picker(model: &Model, frame: &mut Frame) {
        let Some(picker) = model.report_picker() else {
            return;
        };
        let current = model.view().report_id();
        let items: Vec<ListItem> = picker
            .ids
            .iter()
            .map(|id| {
                let marker = if Some(id.as_str()) == current { "*" } else { " " };
                ListItem::new(format!("{marker} Report {id}"))
            })
            .collect();
        let list = List::new(items)
            .block(Block::bordered().title(" Reports ".bold()))
            .highlight_style(SELECTED_CELL);
        let mut state = ListState::default().with_selected(Some(picker.cursor));

        frame.render_widget(Clear, popup_area(frame.area(), 30, 50));
        frame.render_stateful_widget(list, popup_area(frame.area(), 30, 50), &mut state);
    }

    fn draw_popup(message: &str, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, 70);
        let popup = Paragraph::new(message.to_string())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ".bold())
                    .title_bottom(Line::from(" <Esc> close ").centered()),
            );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}
