use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum ReconError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    ReportNotFound(String),
    MissingColumn(String),
    InvalidValue { column: String, value: String },
    ClipboardError(String),
}

impl From<Error> for ReconError {
    fn from(err: Error) -> Self {
        ReconError::IoError(err)
    }
}

impl From<PolarsError> for ReconError {
    fn from(err: PolarsError) -> Self {
        ReconError::PolarsError(err)
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconError::IoError(e) => write!(f, "io error: {e}"),
            ReconError::PolarsError(e) => write!(f, "could not read csv: {e}"),
            ReconError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            ReconError::ReportNotFound(id) => write!(f, "report {id} not found"),
            ReconError::MissingColumn(name) => write!(f, "missing column \"{name}\""),
            ReconError::InvalidValue { column, value } => {
                write!(f, "invalid value \"{value}\" in column \"{column}\"")
            }
            ReconError::ClipboardError(msg) => write!(f, "clipboard: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

#[derive(Debug, Clone, Setters)]
pub struct ViewConfig {
    pub event_poll_time: u64,
    pub debounce_window: u64,
    pub page_size: usize,
    pub facet_limit: usize,
    pub max_column_width: usize,
    #[setters(into)]
    pub export_dir: PathBuf,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            debounce_window: 500,
            page_size: 5,
            facet_limit: 5000,
            max_column_width: 40,
            export_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Discrepancies,
    Statistics,
}

/// What a text input currently edits.
#[derive(Debug, Clone, PartialEq)]
pub enum InputTarget {
    GlobalFilter,
    ColumnFilter(&'static str),
    GotoPage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    GrowPageSize,
    ShrinkPageSize,
    ToggleSort,
    SearchAll,
    FilterColumn,
    ClearFilters,
    SwitchTable,
    ToggleDiseaseStats,
    Histogram,
    GotoPage,
    Reports,
    Export,
    CopyRow,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
q          quit
Tab        switch between statistics and discrepancies
arrows     move selection
PgDn/PgUp  next / previous page
Home/End   first / last page
g          go to page
+ / -      larger / smaller page size
s          sort selected column (asc, desc, none)
/          search all columns
f          filter selected column
c          clear filters
Enter      drill into a statistic total
d          show / hide disease statistics
h          unique values of selected column
r          open another report
e          export table as csv
y          copy selected row
?          this help
Esc        close popup / cancel input";
