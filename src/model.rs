use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arboard::Clipboard;
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::board::{BoardState, Column as Lane, DragLocation, DragResult};
use crate::domain::{CMDMode, HELP_TEXT, Message, TBConfig, TBError};
use crate::prompt::{Prompt, PromptState};
use crate::table::{Record, TableState, Value};

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    Table,
    Board,
    Popup,
    CmdInput,
}

pub struct Model {
    config: TBConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    /// Field names in source column order, for display.
    fields: Vec<String>,
    /// The canonical record collection. The table engine derives from it,
    /// it never owns it.
    data: Vec<Record>,
    table: TableState,
    board: BoardState,
    /// (lane index, card index) cursor in the board view.
    board_cursor: (usize, usize),
    /// Whether the card under the cursor is grabbed. Cursor moves while
    /// grabbed are applied as drag results.
    grabbed: bool,
    cursor_field: usize,
    cursor_row: usize,
    clipboard: Option<Clipboard>,
    prompt: Prompt,
    cmd_mode: Option<CMDMode>,
    active_prompt: bool,
    last_prompt: PromptState,
    show_popup: bool,
    popup_message: String,
    status_message: String,
}

impl Model {
    pub fn init(config: &TBConfig) -> Self {
        Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            fields: Vec::new(),
            data: Vec::new(),
            table: TableState::new(
                config.id_field.clone(),
                config.rows_per_page,
                config.id_field.clone(),
                config.search_fields.clone(),
            ),
            board: BoardState::new(),
            board_cursor: (0, 0),
            grabbed: false,
            cursor_field: 0,
            cursor_row: 0,
            // Best effort: copying is unavailable in headless environments.
            clipboard: Clipboard::new().ok(),
            prompt: Prompt::default(),
            cmd_mode: None,
            active_prompt: false,
            last_prompt: PromptState::default(),
            show_popup: false,
            popup_message: String::new(),
            status_message: "Started tb!".to_string(),
        }
    }

    // -------------------- Data loading ---------------------- //

    pub fn load_data_file(&mut self, path: PathBuf) -> Result<(), TBError> {
        let file_type = Self::inspect_file(&path)?;
        let frame = match file_type {
            FileType::CSV => Self::load_csv(&path)?,
            FileType::PARQUET => Self::load_parquet(&path)?,
            FileType::ARROW => Self::load_arrow(&path)?,
        };

        let start_time = Instant::now();
        let df = frame.collect()?;

        // Materialize each column in its own thread; the typed values are
        // what the table engine sorts and searches on.
        let fields: Vec<String> =
            df.get_column_names().iter().map(|s| s.to_string()).collect();
        let columns: Result<Vec<(String, Vec<Value>)>, PolarsError> = fields
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();

        let mut records = vec![Record::new(); df.height()];
        for (name, values) in columns? {
            for (record, value) in records.iter_mut().zip(values) {
                record.set(name.clone(), value);
            }
        }
        info!(
            "Loaded {} records with {} fields in {}ms",
            records.len(),
            fields.len(),
            start_time.elapsed().as_millis()
        );

        self.set_records(fields, records);
        self.set_status_message(format!("Loaded {}", path.display()));
        Ok(())
    }

    /// Install a record collection, resetting view state and reseeding the
    /// board.
    pub fn set_records(&mut self, fields: Vec<String>, records: Vec<Record>) {
        let order_by = if fields.iter().any(|f| f == &self.config.id_field) {
            self.config.id_field.clone()
        } else {
            fields.first().cloned().unwrap_or_else(|| self.config.id_field.clone())
        };
        self.table = TableState::new(
            order_by,
            self.config.rows_per_page,
            self.config.id_field.clone(),
            self.config.search_fields.clone(),
        );
        self.board = Self::board_from_records(
            &records,
            &self.config.id_field,
            self.config.board_by.as_deref(),
        );
        self.fields = fields;
        self.data = records;
        self.cursor_field = 0;
        self.cursor_row = 0;
        self.board_cursor = (0, 0);
        self.grabbed = false;
    }

    /// Seed a board from the record collection. With a grouping field the
    /// lanes are its distinct values in first-appearance order; without
    /// one, everything starts in a Backlog lane.
    pub fn board_from_records(
        records: &[Record],
        id_field: &str,
        board_by: Option<&str>,
    ) -> BoardState {
        let mut board = BoardState::new();
        match board_by {
            Some(field) => {
                for record in records {
                    let value =
                        record.get(field).map(|v| v.to_string()).unwrap_or_default();
                    if board.column(&value).is_none() {
                        board.push_column(Lane::new(value.clone(), value.clone()));
                    }
                    if let Some(lane) = board.columns.get_mut(&value) {
                        lane.item_ids.push(record.identifier(id_field));
                    }
                }
            }
            None => {
                let mut backlog = Lane::new("backlog", "Backlog");
                backlog.item_ids =
                    records.iter().map(|r| r.identifier(id_field)).collect();
                board.push_column(backlog);
                board.push_column(Lane::new("in-progress", "In Progress"));
                board.push_column(Lane::new("done", "Done"));
            }
        }
        debug!(
            "Seeded board with {} lanes and {} cards",
            board.columns_order.len(),
            board.item_count()
        );
        board
    }

    fn inspect_file(path: &Path) -> Result<FileType, TBError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TBError::FileNotFound,
            ErrorKind::PermissionDenied => TBError::PermissionDenied,
            _ => TBError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TBError::LoadingFailed("Not a file!".into()));
        }
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(TBError::UnknownFileType),
        }
    }

    fn is_integer_type(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    fn load_column(df: &DataFrame, name: &str) -> Result<(String, Vec<Value>), PolarsError> {
        let column = df.column(name)?;
        let dtype = column.dtype().clone();

        let values = if Self::is_integer_type(&dtype) {
            let cast = column.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(Value::Int).unwrap_or(Value::Null))
                .collect()
        } else if matches!(dtype, DataType::Float32 | DataType::Float64) {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(Value::Float).unwrap_or(Value::Null))
                .collect()
        } else if dtype == DataType::Boolean {
            column
                .bool()?
                .into_iter()
                .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
                .collect()
        } else {
            let cast = column.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| match v {
                    Some(s) => Value::Str(
                        s.to_string().replace("\r\n", " ↵ ").replace("\n", " ↵ "),
                    ),
                    None => Value::Null,
                })
                .collect()
        };
        Ok((name.to_string(), values))
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }

    // -------------------- UI accessors ---------------------- //

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn data(&self) -> &[Record] {
        &self.data
    }

    pub fn table(&self) -> &TableState {
        &self.table
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn board_cursor(&self) -> (usize, usize) {
        self.board_cursor
    }

    pub fn grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_field)
    }

    pub fn prompt_state(&self) -> &PromptState {
        &self.last_prompt
    }

    pub fn cmd_mode(&self) -> Option<CMDMode> {
        self.cmd_mode
    }

    pub fn popup(&self) -> Option<&str> {
        self.show_popup.then_some(self.popup_message.as_str())
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_prompt
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    // -------------------- Update loop ---------------------- //

    pub fn update(&mut self, message: Message) -> Result<(), TBError> {
        trace!("Update: {:?} {:?}", self.modus, message);
        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.quit(),
                Message::SwitchView => self.modus = Modus::Board,
                Message::MoveUp => self.move_row_cursor(-1),
                Message::MoveDown => self.move_row_cursor(1),
                Message::MoveLeft => self.move_field_cursor(-1),
                Message::MoveRight => self.move_field_cursor(1),
                Message::NextPage => self.next_page(),
                Message::PrevPage => self.prev_page(),
                Message::SortColumn => self.sort_cursor_field(),
                Message::ToggleSelect => self.toggle_cursor_row(),
                Message::SelectAll => self.select_all(),
                Message::CopyRow => self.copy_cursor_row(),
                Message::Search => self.enter_prompt(CMDMode::SearchTable),
                Message::RowsPerPage => self.enter_prompt(CMDMode::RowsPerPage),
                Message::JumpToPage => self.enter_prompt(CMDMode::JumpToPage),
                Message::Help => self.show_help(),
                Message::Resize(w, h) => trace!("Resized to {w}x{h}"),
                _ => (),
            },
            Modus::Board => match message {
                Message::Quit => self.quit(),
                Message::SwitchView => {
                    self.grabbed = false;
                    self.modus = Modus::Table;
                }
                Message::MoveUp => self.move_board_cursor(0, -1),
                Message::MoveDown => self.move_board_cursor(0, 1),
                Message::MoveLeft => self.move_board_cursor(-1, 0),
                Message::MoveRight => self.move_board_cursor(1, 0),
                Message::GrabOrDrop => self.grab_or_drop(),
                Message::MoveColumnLeft => self.shift_lane(-1),
                Message::MoveColumnRight => self.shift_lane(1),
                Message::Help => self.show_help(),
                Message::Resize(w, h) => trace!("Resized to {w}x{h}"),
                _ => (),
            },
            Modus::Popup => match message {
                Message::Quit => self.quit(),
                // Any other key closes the popup; the controller maps them
                // all to Exit while a popup is shown.
                Message::Exit => {
                    self.show_popup = false;
                    self.modus = self.previous_modus;
                }
                _ => (),
            },
            Modus::CmdInput => {
                if let Message::RawKey(key) = message {
                    self.last_prompt = self.prompt.read(key);
                    if self.last_prompt.finished {
                        self.finish_prompt();
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------- Table mode handlers ---------------------- //

    fn page_len(&self) -> usize {
        self.table.page_view(&self.data).rows.len()
    }

    fn move_row_cursor(&mut self, step: i64) {
        let len = self.page_len();
        if len == 0 {
            self.cursor_row = 0;
            return;
        }
        let row = self.cursor_row as i64 + step;
        self.cursor_row = row.clamp(0, len as i64 - 1) as usize;
    }

    fn move_field_cursor(&mut self, step: i64) {
        if self.fields.is_empty() {
            return;
        }
        let field = self.cursor_field as i64 + step;
        self.cursor_field = field.clamp(0, self.fields.len() as i64 - 1) as usize;
    }

    fn next_page(&mut self) {
        let total = self.table.page_view(&self.data).total;
        if (self.table.page + 1) * self.table.rows_per_page < total {
            self.table.set_page(self.table.page + 1);
            self.clamp_row_cursor();
        }
    }

    fn prev_page(&mut self) {
        self.table.set_page(self.table.page.saturating_sub(1));
        self.clamp_row_cursor();
    }

    fn clamp_row_cursor(&mut self) {
        let len = self.page_len();
        self.cursor_row = if len == 0 { 0 } else { std::cmp::min(self.cursor_row, len - 1) };
    }

    fn sort_cursor_field(&mut self) {
        let Some(field) = self.fields.get(self.cursor_field).cloned() else {
            return;
        };
        self.table.request_sort(&field);
        self.set_status_message(format!(
            "Sorted by {} ({:?})",
            self.table.order_by, self.table.order
        ));
    }

    fn toggle_cursor_row(&mut self) {
        let page = self.table.page_view(&self.data);
        if let Some(record) = page.rows.get(self.cursor_row) {
            let id = record.identifier(self.table.id_field());
            self.table.toggle_row(&id);
            self.set_status_message(format!("{} selected", self.table.selected.len()));
        }
    }

    fn select_all(&mut self) {
        self.table.select_all(true, &self.data);
        self.set_status_message(format!("{} selected", self.table.selected.len()));
    }

    fn copy_cursor_row(&mut self) {
        let page = self.table.page_view(&self.data);
        let Some(record) = page.rows.get(self.cursor_row) else {
            return;
        };
        let content = self
            .fields
            .iter()
            .map(|f| {
                Self::wrap_cell_content(
                    &record.get(f).map(|v| v.to_string()).unwrap_or_default(),
                )
            })
            .collect::<Vec<String>>()
            .join(",");

        match self.clipboard.as_mut().map(|c| c.set_text(content)) {
            Some(Ok(())) => self.set_status_message("Copied row to clipboard"),
            Some(Err(e)) => warn!("Error copying to clipboard: {e:?}"),
            None => warn!("No clipboard available"),
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);
        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    // -------------------- Board mode handlers ---------------------- //

    fn lane_id(&self, lane: usize) -> Option<String> {
        self.board.columns_order.get(lane).cloned()
    }

    fn lane_len(&self, lane: usize) -> usize {
        self.lane_id(lane)
            .and_then(|id| self.board.column(&id))
            .map(|c| c.item_ids.len())
            .unwrap_or(0)
    }

    fn move_board_cursor(&mut self, dx: i64, dy: i64) {
        if self.board.columns_order.is_empty() {
            return;
        }
        if self.grabbed {
            self.drag_grabbed(dx, dy);
            return;
        }
        let (lane, card) = self.board_cursor;
        let lane =
            (lane as i64 + dx).clamp(0, self.board.columns_order.len() as i64 - 1) as usize;
        let len = self.lane_len(lane);
        let card = if len == 0 {
            0
        } else {
            (card as i64 + dy).clamp(0, len as i64 - 1) as usize
        };
        self.board_cursor = (lane, card);
        trace!("Board cursor {:?}", self.board_cursor);
    }

    /// Move the grabbed card by one step, expressed as a drag result so it
    /// goes through the same validation as any other board mutation.
    fn drag_grabbed(&mut self, dx: i64, dy: i64) {
        let (lane, card) = self.board_cursor;
        let Some(source_lane) = self.lane_id(lane) else {
            return;
        };
        let Some(item_id) = self
            .board
            .column(&source_lane)
            .and_then(|c| c.item_ids.get(card))
            .cloned()
        else {
            self.grabbed = false;
            return;
        };

        let target_lane = lane as i64 + dx;
        if target_lane < 0 || target_lane as usize >= self.board.columns_order.len() {
            return;
        }
        let target_lane = target_lane as usize;

        let destination = if target_lane == lane {
            let card = card as i64 + dy;
            if card < 0 || card as usize >= self.lane_len(lane) {
                return;
            }
            DragLocation { column_id: source_lane.clone(), index: card as usize }
        } else {
            let dest_id = match self.lane_id(target_lane) {
                Some(id) => id,
                None => return,
            };
            let index = std::cmp::min(card, self.lane_len(target_lane));
            DragLocation { column_id: dest_id, index }
        };

        let drag = DragResult::ItemMove {
            item_id,
            source: DragLocation { column_id: source_lane, index: card },
            destination: Some(destination.clone()),
        };
        match self.board.apply(&drag) {
            Ok(()) => {
                let dest_lane = self
                    .board
                    .columns_order
                    .iter()
                    .position(|id| id == &destination.column_id)
                    .unwrap_or(lane);
                self.board_cursor = (dest_lane, destination.index);
            }
            Err(TBError::StaleDrag(reason)) => {
                self.grabbed = false;
                self.set_status_message(format!("Drag rejected: {reason}"));
            }
            Err(e) => warn!("Unexpected drag failure: {e:?}"),
        }
    }

    fn grab_or_drop(&mut self) {
        if self.grabbed {
            self.grabbed = false;
            self.set_status_message("Dropped card");
            return;
        }
        let (lane, card) = self.board_cursor;
        if card < self.lane_len(lane) {
            self.grabbed = true;
            self.set_status_message("Grabbed card");
        }
    }

    fn shift_lane(&mut self, step: i64) {
        let (lane, _) = self.board_cursor;
        let Some(column_id) = self.lane_id(lane) else {
            return;
        };
        let destination = lane as i64 + step;
        if destination < 0 || destination as usize >= self.board.columns_order.len() {
            return;
        }
        let drag = DragResult::ColumnReorder {
            column_id,
            source: lane,
            destination: Some(destination as usize),
        };
        match self.board.apply(&drag) {
            Ok(()) => self.board_cursor.0 = destination as usize,
            Err(TBError::StaleDrag(reason)) => {
                self.set_status_message(format!("Drag rejected: {reason}"))
            }
            Err(e) => warn!("Unexpected drag failure: {e:?}"),
        }
    }

    // -------------------- Prompt handling ---------------------- //

    fn enter_prompt(&mut self, mode: CMDMode) {
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);
        self.active_prompt = true;
        self.prompt.clear();
        self.last_prompt = self.prompt.state();
    }

    fn finish_prompt(&mut self) {
        self.active_prompt = false;
        self.modus = self.previous_modus;

        let input = self.last_prompt.input.clone();
        if !self.last_prompt.canceled {
            match self.cmd_mode {
                Some(CMDMode::SearchTable) => {
                    self.table.set_search(Some(&input));
                    self.cursor_row = 0;
                    let total = self.table.page_view(&self.data).total;
                    self.set_status_message(format!("Found {total} matching rows"));
                }
                Some(CMDMode::RowsPerPage) => {
                    self.table.set_rows_per_page(&input);
                    self.clamp_row_cursor();
                }
                Some(CMDMode::JumpToPage) => {
                    if let Ok(page) = input.trim().parse::<usize>() {
                        self.table.set_page(page);
                        self.clamp_row_cursor();
                    }
                }
                None => (),
            }
        }
        self.cmd_mode = None;
        self.prompt.clear();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup_message = HELP_TEXT.to_string();
        self.show_popup = true;
    }
}
