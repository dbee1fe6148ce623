use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Cell, Clear, List, ListItem, Paragraph, Row, Table};

use crate::domain::CMDMode;
use crate::model::{Model, Modus};
use crate::table::{Order, Record};

pub const MAX_COLUMN_WIDTH: usize = 24;

pub struct UI;

impl UI {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [main, statusline] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)])
                .areas(frame.area());

        match model.modus() {
            Modus::Board => self.draw_board(model, frame, main),
            // The prompt and popup render over whichever view was active.
            _ => self.draw_table(model, frame, main),
        }
        self.draw_statusline(model, frame, statusline);

        if let Some(message) = model.popup() {
            self.draw_popup(message, frame);
        }
    }

    // -------------------- Table view ---------------------- //

    fn draw_table(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let fields = model.fields();
        let page = model.table().page_view(model.data());
        let (cursor_row, cursor_field) = model.cursor();

        let mut header_cells = vec![Cell::from(" ")];
        header_cells.extend(fields.iter().enumerate().map(|(idx, field)| {
            let marker = if *field == model.table().order_by {
                match model.table().order {
                    Order::Ascending => " ▲",
                    Order::Descending => " ▼",
                }
            } else {
                ""
            };
            let style = if idx == cursor_field {
                Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::new().add_modifier(Modifier::BOLD)
            };
            Cell::from(format!("{field}{marker}")).style(style)
        }));

        let mut rows: Vec<Row> = page
            .rows
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let selected =
                    model.table().is_selected(&record.identifier(model.table().id_field()));
                let mark = if selected { "*" } else { " " };
                let mut cells = vec![Cell::from(mark)];
                cells.extend(
                    fields.iter().map(|f| Cell::from(Self::cell_text(record, f))),
                );
                let mut row = Row::new(cells);
                if idx == cursor_row {
                    row = row.style(Style::new().add_modifier(Modifier::REVERSED));
                } else if selected {
                    row = row.style(Style::new().fg(Color::Yellow));
                }
                row
            })
            .collect();
        // Keep the table at a fixed height on a short last page.
        for _ in 0..page.empty_rows {
            rows.push(Row::new(vec![Cell::from("")]));
        }

        let mut widths = vec![Constraint::Length(1)];
        widths.extend(fields.iter().map(|f| {
            let content = page
                .rows
                .iter()
                .map(|r| Self::cell_text(r, f).len())
                .max()
                .unwrap_or(0);
            Constraint::Length(
                std::cmp::min(std::cmp::max(f.len() + 2, content), MAX_COLUMN_WIDTH) as u16,
            )
        }));

        let pages = page.total.div_ceil(model.table().rows_per_page).max(1);
        let title = format!(
            " table: page {}/{} · {} rows · {} selected ",
            model.table().page + 1,
            pages,
            page.total,
            model.table().selected.len()
        );
        let table = Table::new(rows, widths)
            .header(Row::new(header_cells).style(Style::new().fg(Color::Cyan).bold()))
            .column_spacing(1)
            .block(Block::bordered().title(Line::from(title.bold())));
        frame.render_widget(table, area);
    }

    fn cell_text(record: &Record, field: &str) -> String {
        record.get(field).map(|v| v.to_string()).unwrap_or_default()
    }

    // -------------------- Board view ---------------------- //

    fn draw_board(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let lanes = model.board().ordered_columns();
        if lanes.is_empty() {
            frame.render_widget(
                Paragraph::new("Empty board").centered(),
                area,
            );
            return;
        }
        let (cursor_lane, cursor_card) = model.board_cursor();

        let constraints =
            vec![Constraint::Ratio(1, lanes.len() as u32); lanes.len()];
        let areas = Layout::horizontal(constraints).split(area);

        for (idx, lane) in lanes.iter().enumerate() {
            let items: Vec<ListItem> = lane
                .item_ids
                .iter()
                .enumerate()
                .map(|(card, id)| {
                    let mut item = ListItem::new(format!(" {id} "));
                    if idx == cursor_lane && card == cursor_card {
                        let style = if model.grabbed() {
                            Style::new().add_modifier(Modifier::REVERSED).fg(Color::Green)
                        } else {
                            Style::new().add_modifier(Modifier::REVERSED)
                        };
                        item = item.style(style);
                    }
                    item
                })
                .collect();

            let title = format!(" {} ({}) ", lane.title, lane.item_ids.len());
            let block = if idx == cursor_lane {
                Block::bordered().title(Line::from(title.bold()))
            } else {
                Block::bordered().title(Line::from(title))
            };
            frame.render_widget(List::new(items).block(block), areas[idx]);
        }
    }

    // -------------------- Status line and popup ---------------------- //

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let line = if model.raw_keyevents() {
            let prefix = match model.cmd_mode() {
                Some(CMDMode::SearchTable) => "search",
                Some(CMDMode::RowsPerPage) => "rows per page",
                Some(CMDMode::JumpToPage) => "page",
                None => "input",
            };
            let prompt = model.prompt_state();
            Line::from(vec![
                Span::styled(format!("{prefix}: "), Style::new().fg(Color::Cyan)),
                Span::raw(prompt.input.clone()),
                Span::styled("█", Style::new().fg(Color::Cyan)),
            ])
        } else {
            let search = model.table().search.as_str();
            let search = if search.is_empty() {
                String::new()
            } else {
                format!(" · search: \"{search}\"")
            };
            Line::from(format!(" {}{search} · ? for help", model.status_message()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let area = Self::centered(frame.area(), 60, 80);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message)
                .block(Block::bordered().title(Line::from(" help ".bold()))),
            area,
        );
    }

    fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
        let [_, mid, _] = Layout::vertical([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .areas(area);
        let [_, mid, _] = Layout::horizontal([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .areas(mid);
        mid
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}
