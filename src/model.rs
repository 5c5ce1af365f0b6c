use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{BVConfig, BVError, HELP_TEXT, Message};
use crate::inputter::{InputResult, Inputter};
use crate::pipeline::{ViewAction, ViewState};
use crate::record::{Dataset, Field};
use crate::ui::{COLUMN_WIDTH_MARGIN, TABLE_CHROME_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    SEARCHINPUT,
    POPUP,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub field: Field,
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Popup {
    pub title: String,
    pub message: String,
}

/// Everything the UI needs to draw one frame.
pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize,
    pub ntotal: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub search: InputResult,
    pub editing_search: bool,
    pub show_clear: bool,
    pub show_empty_search_alert: bool,
    pub popup: Option<Popup>,
    pub status_message: String,
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Dataset,
    view: ViewState,
    column_widths: Vec<usize>,
    cursor_row: usize,
    cursor_column: usize,
    offset_row: usize,
    table_height: usize,
    input: Inputter,
    last_input: InputResult,
    popup: Option<Popup>,
    clipboard: Option<Clipboard>,
    status_message: String,
    uidata: UIData,
}

impl Model {
    pub fn init(
        config: &BVConfig,
        dataset: Dataset,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, BVError> {
        let column_widths = Field::COLUMNS
            .iter()
            .map(|&f| Self::calculate_column_width(&dataset, f, config.max_column_width))
            .collect();
        if dataset.is_empty() {
            warn!("Dataset {} has no records", dataset.name());
        }
        let view = ViewState::new(&dataset);
        let status_message = format!("Loaded {} records", dataset.len());
        let mut model = Self {
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            dataset,
            view,
            column_widths,
            cursor_row: 0,
            cursor_column: 0,
            offset_row: 0,
            table_height: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            popup: None,
            clipboard: None,
            status_message,
            uidata: UIData::empty(),
        };
        model.ui_resize(ui_width, ui_height);
        model.update_uidata();
        Ok(model)
    }

    fn calculate_column_width(dataset: &Dataset, field: Field, max_column_width: usize) -> usize {
        let max_width = dataset
            .records()
            .iter()
            .map(|r| r.get(field).to_string().chars().count())
            .max()
            .unwrap_or(0);
        // Room for the sort indicator behind the name.
        let width = std::cmp::max(field.name().len() + 2, max_width) + COLUMN_WIDTH_MARGIN;
        std::cmp::min(width, max_column_width)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCHINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), BVError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection_down(1),
                    Message::MoveUp => self.move_selection_up(1),
                    Message::MovePageDown => self.move_selection_down(self.table_height),
                    Message::MovePageUp => self.move_selection_up(self.table_height),
                    Message::MoveBeginning => self.move_selection_up(usize::MAX),
                    Message::MoveEnd => self.move_selection_down(usize::MAX),
                    Message::MoveLeft => self.cursor_column = self.cursor_column.saturating_sub(1),
                    Message::MoveRight => {
                        self.cursor_column = (self.cursor_column + 1).min(Field::COLUMNS.len() - 1)
                    }
                    Message::EditSearch => self.enter_search_input(),
                    Message::ClearSearch => self.clear_search(),
                    Message::SortBy(field) => self.sort_by(field),
                    Message::SortSelectedColumn => self.sort_by(Field::COLUMNS[self.cursor_column]),
                    Message::CopyRecord => self.copy_record(),
                    Message::Enter => self.show_record(),
                    Message::Help => self.show_popup("Help", HELP_TEXT.to_string()),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Enter | Message::Exit | Message::Help => self.close_popup(),
                    _ => (),
                },
                Modus::SEARCHINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::SortBy(field) => self.sort_by(field),
                    _ => (),
                },
            }
        }
        self.update_uidata();
        Ok(())
    }

    // -------------------- View pipeline ---------------------- //

    fn apply(&mut self, action: ViewAction) {
        let view = std::mem::take(&mut self.view);
        self.view = view.reduce(&self.dataset, action);
    }

    fn search(&mut self) {
        let start_time = Instant::now();
        self.apply(ViewAction::Search);
        if self.view.empty_query_alert {
            warn!("Refusing to search for an empty query");
            return;
        }
        info!(
            "Search for {:?} found {} records in {}ms",
            self.view.query,
            self.view.rows.len(),
            start_time.elapsed().as_millis()
        );
        self.reset_selection();
        self.status_message = match self.view.rows.len() {
            0 => "Found no matches!".to_string(),
            n => format!("Found {n} results"),
        };
    }

    fn clear_search(&mut self) {
        if !self.view.filtered {
            return;
        }
        self.apply(ViewAction::Clear);
        self.input.set("");
        self.last_input = self.input.get();
        self.reset_selection();
        self.status_message = "Cleared search".to_string();
    }

    fn sort_by(&mut self, field: Field) {
        if !field.is_sortable() {
            debug!("Column {} is not sortable", field.name());
            return;
        }
        self.apply(ViewAction::SortBy(field));
        self.reset_selection();
        self.status_message = format!(
            "Sorted by {} {:?}",
            field.name(),
            self.view.sort.direction
        );
    }

    // -------------------- Search input ---------------------- //

    fn enter_search_input(&mut self) {
        trace!("Entering search input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCHINPUT;
        self.input.set(&self.view.query);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.input != self.view.query {
            self.apply(ViewAction::SetQuery(self.last_input.input.clone()));
        }
        if self.last_input.submitted {
            self.search();
        }
        if self.last_input.submitted || self.last_input.canceled {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::SEARCHINPUT;
        }
    }

    // -------------------- Popups ---------------------- //

    fn show_popup(&mut self, title: &str, message: String) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup = Some(Popup {
            title: title.to_string(),
            message,
        });
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.popup = None;
    }

    fn show_record(&mut self) {
        let Some(record) = self.selected_record_idx().and_then(|i| self.dataset.get(i)) else {
            return;
        };
        let header_width = Field::SEARCHABLE
            .iter()
            .map(|f| f.name().len())
            .max()
            .unwrap_or(0);
        let message = Field::SEARCHABLE
            .iter()
            .map(|&f| format!("{:<header_width$}  {}", f.name(), record.get(f)))
            .collect::<Vec<_>>()
            .join("\n");
        let title = format!("{} {}", record.make, record.model);
        self.show_popup(title.trim(), message);
    }

    fn copy_record(&mut self) {
        let Some(record) = self.selected_record_idx().and_then(|i| self.dataset.get(i)) else {
            return;
        };
        let text = record.as_tsv();
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard not available: {:?}", e);
                    self.status_message = "Clipboard not available!".to_string();
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            self.status_message = match clipboard.set_text(text) {
                Ok(_) => "Copied record to clipboard".to_string(),
                Err(e) => {
                    warn!("Error copying to clipboard: {:?}", e);
                    "Copying to clipboard failed!".to_string()
                }
            };
        }
    }

    // -------------------- Selection ---------------------- //

    fn selected_record_idx(&self) -> Option<usize> {
        self.view.rows.get(self.offset_row + self.cursor_row).copied()
    }

    fn reset_selection(&mut self) {
        self.cursor_row = 0;
        self.offset_row = 0;
    }

    fn move_selection_down(&mut self, size: usize) {
        let nrows = self.view.rows.len();
        if nrows == 0 {
            return;
        }
        let target = (self.offset_row + self.cursor_row)
            .saturating_add(size)
            .min(nrows - 1);
        self.select_row(target);
    }

    fn move_selection_up(&mut self, size: usize) {
        let target = (self.offset_row + self.cursor_row).saturating_sub(size);
        self.select_row(target);
    }

    fn select_row(&mut self, row: usize) {
        let height = self.table_height.max(1);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.cursor_row = row - self.offset_row;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized! w:{width}, h:{height}");
        self.table_height = height.saturating_sub(TABLE_CHROME_HEIGHT);
        let row = self.offset_row + self.cursor_row;
        self.offset_row = 0;
        self.select_row(row.min(self.view.rows.len().saturating_sub(1)));
    }

    // -------------------- UI data ---------------------- //

    fn update_uidata(&mut self) {
        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.table_height, self.view.rows.len());
        let visible = &self.view.rows[rbegin.min(rend)..rend];

        let table = Field::COLUMNS
            .iter()
            .zip(self.column_widths.iter())
            .map(|(&field, &width)| {
                let name = match self.view.sort.indicator(field) {
                    Some(indicator) => format!("{} {}", field.name(), indicator),
                    None => field.name().to_string(),
                };
                let data = visible
                    .iter()
                    .filter_map(|&idx| self.dataset.get(idx))
                    .map(|r| r.get(field).to_string().replace('\n', " ↵ "))
                    .collect();
                ColumnView {
                    field,
                    name,
                    width,
                    data,
                }
            })
            .collect();

        self.uidata = UIData {
            name: self.dataset.name().to_string(),
            table,
            nrows: self.view.rows.len(),
            ntotal: self.dataset.len(),
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            abs_selected_row: self.offset_row + self.cursor_row,
            search: self.last_input.clone(),
            editing_search: self.modus == Modus::SEARCHINPUT,
            show_clear: self.view.filtered,
            show_empty_search_alert: self.view.empty_query_alert,
            popup: self.popup.clone(),
            status_message: self.status_message.clone(),
        };
    }
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            nrows: 0,
            ntotal: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            search: InputResult::default(),
            editing_search: false,
            show_clear: false,
            show_empty_search_alert: false,
            popup: None,
            status_message: String::new(),
        }
    }
}
