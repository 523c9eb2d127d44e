use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, trace};

/// Page sizes a table can be switched to.
pub const PAGE_SIZES: [usize; 7] = [5, 10, 20, 30, 40, 50, 100];

/// Maximum number of facet values handed out for autocompletion.
pub const FACET_LIMIT: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    Text,
    Numeric,
}

/// Plain description of one table column.
///
/// `accessor` produces the value that is filtered, sorted and faceted on.
/// `formatter` only changes how the value is displayed.
pub struct ColumnSpec<R> {
    pub id: &'static str,
    pub header: &'static str,
    pub accessor: fn(&R) -> String,
    pub formatter: Option<fn(&str) -> String>,
    pub kind: ColumnKind,
    pub sortable: bool,
    pub filterable: bool,
}

impl<R> ColumnSpec<R> {
    pub fn text(id: &'static str, header: &'static str, accessor: fn(&R) -> String) -> Self {
        Self {
            id,
            header,
            accessor,
            formatter: None,
            kind: ColumnKind::Text,
            sortable: true,
            filterable: true,
        }
    }

    pub fn numeric(id: &'static str, header: &'static str, accessor: fn(&R) -> String) -> Self {
        Self {
            kind: ColumnKind::Numeric,
            ..Self::text(id, header, accessor)
        }
    }

    pub fn with_formatter(mut self, formatter: fn(&str) -> String) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn display(&self, value: &str) -> String {
        match self.formatter {
            Some(f) => f(value),
            None => value.to_string(),
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortState {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Pagination request coming from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageNav {
    First,
    Previous,
    Next,
    Last,
    Index(usize),
    Size(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

/// Distinct values of one column. `values` is sorted and may be truncated,
/// `count` is always the number of distinct values.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub values: Vec<(String, usize)>,
    pub count: usize,
}

/// In memory table: rows, column definitions and the filter, sort and
/// pagination state that derive the visible page from them.
pub struct TableEngine<R> {
    name: String,
    columns: Vec<ColumnSpec<R>>,
    rows: Vec<R>,
    data: Vec<Vec<String>>, // Stringified cells, one vector per column
    column_filters: HashMap<&'static str, String>,
    global_filter: String,
    sort: Option<SortState>,
    pagination: Pagination,
    facet_limit: usize,
    visible: Vec<usize>, // Filtered and sorted indices into rows
}

impl<R: Sync> TableEngine<R> {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec<R>>) -> Self {
        let data = (0..columns.len()).map(|_| Vec::new()).collect();
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            data,
            column_filters: HashMap::new(),
            global_filter: String::new(),
            sort: None,
            pagination: Pagination {
                page_index: 0,
                page_size: PAGE_SIZES[1],
            },
            facet_limit: FACET_LIMIT,
            visible: Vec::new(),
        }
    }

    pub fn with_facet_limit(mut self, limit: usize) -> Self {
        self.facet_limit = limit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec<R>] {
        &self.columns
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn set_rows(&mut self, rows: Vec<R>) {
        let start_time = Instant::now();
        self.data = self
            .columns
            .par_iter()
            .map(|spec| rows.iter().map(spec.accessor).collect())
            .collect();
        self.rows = rows;
        self.pagination.page_index = 0;
        self.refresh();
        debug!(
            "{}: loaded {} rows in {}ms",
            self.name,
            self.rows.len(),
            start_time.elapsed().as_millis()
        );
    }

    pub fn column_filter(&self, column_id: &str) -> Option<&str> {
        self.column_filters.get(column_id).map(|s| s.as_str())
    }

    pub fn column_filters(&self) -> &HashMap<&'static str, String> {
        &self.column_filters
    }

    /// Sets or removes the filter of one column. An empty value removes it.
    /// Returns false if the column is unknown or not filterable.
    pub fn set_column_filter(&mut self, column_id: &str, value: Option<&str>) -> bool {
        let Some(spec) = self.columns.iter().find(|c| c.id == column_id) else {
            debug!("{}: ignoring filter on unknown column {column_id}", self.name);
            return false;
        };
        if !spec.filterable {
            debug!("{}: column {column_id} is not filterable", self.name);
            return false;
        }
        let id = spec.id;
        match value {
            Some(v) if !v.is_empty() => {
                self.column_filters.insert(id, v.to_string());
            }
            _ => {
                self.column_filters.remove(id);
            }
        }
        trace!("{}: column filters {:?}", self.name, self.column_filters);
        self.pagination.page_index = 0;
        self.refresh();
        true
    }

    pub fn global_filter(&self) -> &str {
        &self.global_filter
    }

    pub fn set_global_filter(&mut self, value: &str) {
        trace!("{}: global filter \"{value}\"", self.name);
        self.global_filter = value.to_string();
        self.pagination.page_index = 0;
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        trace!("{}: clearing filters", self.name);
        self.column_filters.clear();
        self.global_filter.clear();
        self.pagination.page_index = 0;
        self.refresh();
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn sort_direction(&self, column_id: &str) -> Option<SortDirection> {
        self.sort
            .as_ref()
            .filter(|s| s.column == column_id)
            .map(|s| s.direction)
    }

    /// Cycles the sort of a column: none, ascending, descending, none.
    /// Sorting a column drops the sort of any other column.
    pub fn set_sort(&mut self, column_id: &str) -> bool {
        let Some(spec) = self.columns.iter().find(|c| c.id == column_id) else {
            debug!("{}: ignoring sort on unknown column {column_id}", self.name);
            return false;
        };
        if !spec.sortable {
            return false;
        }
        let column = spec.id;
        self.sort = match self.sort_direction(column) {
            None => Some(SortState {
                column,
                direction: SortDirection::Ascending,
            }),
            Some(SortDirection::Ascending) => Some(SortState {
                column,
                direction: SortDirection::Descending,
            }),
            Some(SortDirection::Descending) => None,
        };
        trace!("{}: sort {:?}", self.name, self.sort);
        self.refresh();
        true
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        self.pagination.page_index = page_index;
        self.clamp_page_index();
    }

    /// Returns false if `page_size` is not one of `PAGE_SIZES`.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if !PAGE_SIZES.contains(&page_size) {
            debug!("{}: rejecting page size {page_size}", self.name);
            return false;
        }
        self.pagination.page_size = page_size;
        self.clamp_page_index();
        true
    }

    /// Applies a pagination request. Only page sizes can be rejected.
    pub fn navigate(&mut self, nav: PageNav) -> bool {
        match nav {
            PageNav::First => self.first_page(),
            PageNav::Previous => self.previous_page(),
            PageNav::Next => self.next_page(),
            PageNav::Last => self.last_page(),
            PageNav::Index(i) => self.set_page_index(i),
            PageNav::Size(n) => return self.set_page_size(n),
        }
        true
    }

    pub fn page_count(&self) -> usize {
        self.visible.len().div_ceil(self.pagination.page_size)
    }

    pub fn can_previous_page(&self) -> bool {
        self.pagination.page_index > 0
    }

    pub fn can_next_page(&self) -> bool {
        self.pagination.page_index + 1 < self.page_count()
    }

    pub fn next_page(&mut self) {
        if self.can_next_page() {
            self.set_page_index(self.pagination.page_index + 1);
        }
    }

    pub fn previous_page(&mut self) {
        self.set_page_index(self.pagination.page_index.saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.set_page_index(0);
    }

    pub fn last_page(&mut self) {
        self.set_page_index(self.page_count().saturating_sub(1));
    }

    /// Number of rows passing the filters, over all pages.
    pub fn filtered_row_count(&self) -> usize {
        self.visible.len()
    }

    /// Filtered and sorted rows before pagination.
    pub fn filtered_rows(&self) -> Vec<&R> {
        self.visible.iter().map(|&i| &self.rows[i]).collect()
    }

    /// Row indices of the current page.
    pub fn page_indices(&self) -> &[usize] {
        let Pagination {
            page_index,
            page_size,
        } = self.pagination;
        let begin = std::cmp::min(page_index * page_size, self.visible.len());
        let end = std::cmp::min(begin + page_size, self.visible.len());
        &self.visible[begin..end]
    }

    pub fn get_visible_rows(&self) -> Vec<&R> {
        self.page_indices().iter().map(|&i| &self.rows[i]).collect()
    }

    /// Display strings of the current page, one vector per row.
    pub fn page_cells(&self) -> Vec<Vec<String>> {
        self.page_indices()
            .iter()
            .map(|&ridx| {
                self.columns
                    .iter()
                    .zip(self.data.iter())
                    .map(|(spec, column)| spec.display(&column[ridx]))
                    .collect()
            })
            .collect()
    }

    pub fn cell(&self, row_idx: usize, column_id: &str) -> Option<&str> {
        let cidx = self.column_index(column_id)?;
        self.data.get(cidx)?.get(row_idx).map(|s| s.as_str())
    }

    /// Distinct values of `column_id` over the rows that pass every filter
    /// except the column's own one.
    pub fn faceted_unique_values(&self, column_id: &str) -> Option<Facet> {
        let cidx = self.column_index(column_id)?;
        let filters = self.active_filters(Some(cidx));
        let column = self.data.get(cidx)?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for ridx in 0..self.rows.len() {
            if self.row_matches(ridx, &filters) {
                *counts.entry(column[ridx].as_str()).or_insert(0) += 1;
            }
        }
        let count = counts.len();
        let mut values: Vec<(String, usize)> =
            counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        values.sort_unstable();
        values.truncate(self.facet_limit);
        trace!("{}: facet {column_id} has {count} values", self.name);
        Some(Facet { values, count })
    }

    fn active_filters(&self, skip_column: Option<usize>) -> Vec<(usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(cidx, _)| Some(*cidx) != skip_column)
            .filter_map(|(cidx, spec)| {
                self.column_filters
                    .get(spec.id)
                    .map(|value| (cidx, value.as_str()))
            })
            .collect()
    }

    fn row_matches(&self, ridx: usize, filters: &[(usize, &str)]) -> bool {
        let columns_match = filters
            .iter()
            .all(|&(cidx, term)| self.data[cidx][ridx].contains(term));
        columns_match
            && (self.global_filter.is_empty()
                || self
                    .data
                    .iter()
                    .any(|column| column[ridx].contains(self.global_filter.as_str())))
    }

    fn refresh(&mut self) {
        let start_time = Instant::now();
        let filters = self.active_filters(None);
        let mut visible: Vec<usize> = (0..self.rows.len())
            .into_par_iter()
            .filter(|&ridx| self.row_matches(ridx, &filters))
            .collect();

        if let Some(sort) = &self.sort
            && let Some(cidx) = self.column_index(sort.column)
            && let Some(column) = self.data.get(cidx)
        {
            let numeric = self.columns[cidx].kind == ColumnKind::Numeric;
            let ascending = sort.direction == SortDirection::Ascending;
            visible.sort_by(|&a, &b| compare_cells(&column[a], &column[b], numeric, ascending));
        }

        self.visible = visible;
        self.clamp_page_index();
        trace!(
            "{}: {} of {} rows visible, refresh took {}ms",
            self.name,
            self.visible.len(),
            self.rows.len(),
            start_time.elapsed().as_millis()
        );
    }

    fn clamp_page_index(&mut self) {
        let last = self.page_count().saturating_sub(1);
        self.pagination.page_index = std::cmp::min(self.pagination.page_index, last);
    }
}

// Parseable numbers come first in either direction, the rest compares as text.
fn compare_cells(a: &str, b: &str, numeric: bool, ascending: bool) -> Ordering {
    let directed = |o: Ordering| if ascending { o } else { o.reverse() };
    if !numeric {
        return directed(a.cmp(b));
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(a_float), Ok(b_float)) => {
            directed(a_float.partial_cmp(&b_float).unwrap_or(Ordering::Equal))
        }
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => directed(a.cmp(b)),
    }
}
