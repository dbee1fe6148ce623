use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// Crate wide error type. Core handlers are total and never produce one of
/// these; errors come from I/O, data loading and rejected drag results.
#[derive(Debug)]
pub enum TBError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    /// A drag result references a column or index that no longer matches the
    /// board. State is left unchanged when this is raised.
    StaleDrag(String),
}

impl From<Error> for TBError {
    fn from(err: Error) -> Self {
        TBError::IoError(err)
    }
}

impl From<PolarsError> for TBError {
    fn from(err: PolarsError) -> Self {
        TBError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct TBConfig {
    pub event_poll_time: u64,
    pub rows_per_page: usize,
    pub id_field: String,
    pub search_fields: Vec<String>,
    pub board_by: Option<String>,
}

impl Default for TBConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            rows_per_page: 5,
            id_field: "name".to_string(),
            search_fields: Vec::new(),
            board_by: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    SearchTable,
    RowsPerPage,
    JumpToPage,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    Exit,
    Help,
    SwitchView,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    SortColumn,
    ToggleSelect,
    SelectAll,
    CopyRow,
    Search,
    RowsPerPage,
    JumpToPage,
    GrabOrDrop,
    MoveColumnLeft,
    MoveColumnRight,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "
tb key bindings

Both views
  q           quit
  Tab         switch between table and board view
  ?           show this help
  Esc         close popup / cancel input

Table view
  Up/Down     move row cursor
  Left/Right  move column cursor
  n / p       next / previous page
  s           sort by the selected column (toggles asc/desc)
  Space       toggle selection of the current row
  a           select all filtered rows / clear selection
  y           copy current row to the clipboard
  /           search (Enter applies, Esc cancels)
  r           set rows per page
  g           jump to page

Board view
  Left/Right  move lane cursor
  Up/Down     move card cursor
  Enter       grab / drop the current card
  < / >       move the current lane left / right
";
