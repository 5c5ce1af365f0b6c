use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, HighlightSpacing, Paragraph, Row, Table, TableState, Wrap},
};
use tracing::trace;

use crate::domain::BVConfig;
use crate::model::{Model, Popup, UIData};
use crate::record::Field;

pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const SEARCH_HEIGHT: u16 = 3;
pub const ALERT_HEIGHT: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
// Search box, alert, table border and header, status line.
pub const TABLE_CHROME_HEIGHT: usize =
    (SEARCH_HEIGHT + ALERT_HEIGHT + 2 + 1 + STATUSLINE_HEIGHT) as usize;

const EMPTY_SEARCH_ALERT: &str = "Please populate the search box.";

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeaderArea {
    field: Field,
    area: Rect,
}

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
    headers: Vec<HeaderArea>,
}

impl TableUI {
    pub fn new(config: &BVConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
            headers: Vec::new(),
        }
    }

    /// The sortable column whose header was drawn at the given terminal cell.
    pub fn header_at(&self, x: u16, y: u16) -> Option<Field> {
        self.headers
            .iter()
            .find(|h| {
                h.area.y == y && x >= h.area.x && x < h.area.x.saturating_add(h.area.width)
            })
            .map(|h| h.field)
            .filter(|f| f.is_sortable())
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [search_area, alert_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(SEARCH_HEIGHT),
            Constraint::Length(ALERT_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(frame.area());

        self.render_search(uidata, frame, search_area);
        if uidata.show_empty_search_alert {
            frame.render_widget(
                Paragraph::new(EMPTY_SEARCH_ALERT.red().bold()),
                alert_area,
            );
        }
        self.render_table(uidata, frame, table_area);
        self.render_statusline(uidata, frame, status_area);

        if let Some(popup) = &uidata.popup {
            self.render_popup(popup, frame);
        }
    }

    fn render_search(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut hints = vec![" Search ".into(), "<Enter> ".blue().bold()];
        if uidata.show_clear {
            hints.push(" Clear ".into());
            hints.push("<C> ".blue().bold());
        }
        let border_style = if uidata.editing_search {
            Style::default().yellow()
        } else {
            Style::default()
        };
        let block = Block::bordered()
            .title(Line::from(" Bike Models Overview ".bold()).centered())
            .title_bottom(Line::from(hints).right_aligned())
            .border_style(border_style);

        let text = if uidata.search.input.is_empty() && !uidata.editing_search {
            Line::from("Search... (press /)".dark_gray())
        } else {
            Line::from(uidata.search.input.as_str())
        };
        let inner = block.inner(area);
        frame.render_widget(Paragraph::new(text).block(block), area);

        if uidata.editing_search {
            let prefix: String = uidata
                .search
                .input
                .chars()
                .take(uidata.search.cursor_pos)
                .collect();
            let offset = Span::raw(prefix).width() as u16;
            frame.set_cursor_position((inner.x + offset.min(inner.width), inner.y));
        }
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", uidata.name).bold()))
            .border_set(border::THICK);
        let inner = block.inner(area);

        let widths: Vec<Constraint> = uidata
            .table
            .iter()
            .map(|c| {
                if c.field.is_sortable() {
                    Constraint::Length(c.width.min(self.max_column_width) as u16)
                } else {
                    Constraint::Fill(1)
                }
            })
            .collect();

        // Same split the table widget performs, kept for mouse hit tests.
        let header_row = Rect { height: 1, ..inner };
        let column_areas = Layout::horizontal(widths.clone())
            .spacing(1)
            .split(header_row);
        self.headers = uidata
            .table
            .iter()
            .zip(column_areas.iter())
            .map(|(c, &area)| HeaderArea {
                field: c.field,
                area,
            })
            .collect();

        let header = Row::new(uidata.table.iter().enumerate().map(|(idx, c)| {
            let mut style = Style::default();
            if c.field.is_sortable() {
                style = style.add_modifier(Modifier::BOLD);
            } else {
                style = style.add_modifier(Modifier::ITALIC);
            }
            if idx == uidata.selected_column {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            Cell::from(c.name.clone()).style(style)
        }))
        .style(Style::default().blue());

        let nrows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nrows).map(|ridx| {
            Row::new(
                uidata
                    .table
                    .iter()
                    .map(|c| Cell::from(c.data[ridx].as_str())),
            )
        });

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .highlight_spacing(HighlightSpacing::Never)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .block(block);

        let mut state = TableState::default();
        if nrows > 0 {
            state.select(Some(uidata.selected_row));
        }
        trace!("Render {nrows} rows, selected {}", uidata.abs_selected_row);
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [message_area, info_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(40)]).areas(area);
        frame.render_widget(
            Paragraph::new(Line::from(format!(" {}", uidata.status_message))),
            message_area,
        );
        let info = Line::from(vec![
            format!("{} of {} records ", uidata.nrows, uidata.ntotal).into(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<Q> ".blue().bold(),
        ])
        .right_aligned();
        frame.render_widget(Paragraph::new(info), info_area);
    }

    fn render_popup(&self, popup: &Popup, frame: &mut Frame) {
        let area = popup_area(frame.area(), 70, 70);
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", popup.title).bold()).centered())
            .title_bottom(Line::from(vec![" Close ".into(), "<Esc> ".blue().bold()]).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(popup.message.as_str())
                .wrap(Wrap { trim: false })
                .block(block),
            area,
        );
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;
    use crate::record::{Dataset, FieldValue, Record};
    use ratatui::{Terminal, backend::TestBackend};

    fn model(width: u16, height: u16) -> Model {
        let records = vec![
            Record {
                make: FieldValue::Text("Yamaha".into()),
                price: FieldValue::Number(5000.0),
                ..Default::default()
            },
            Record {
                make: FieldValue::Text("Honda".into()),
                price: FieldValue::Number(4500.0),
                ..Default::default()
            },
        ];
        let dataset = Dataset::load("bikes.json", records);
        Model::init(&BVConfig::default(), dataset, width as usize, height as usize).unwrap()
    }

    fn render(model: &Model, ui: &mut TableUI, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(width as usize)
            .map(|line| line.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_rows_and_sort_indicator() {
        let mut model = model(120, 16);
        let mut ui = TableUI::new(&BVConfig::default());
        model.update(Some(Message::SortBy(Field::Price))).unwrap();
        let screen = render(&model, &mut ui, 120, 16);

        assert!(screen.contains("Bike Models Overview"));
        assert!(screen.contains("Price ↑"));
        assert!(screen.contains("2 of 2 records"));
        let honda = screen.find("Honda").unwrap();
        let yamaha = screen.find("Yamaha").unwrap();
        assert!(honda < yamaha);
        assert!(!screen.contains(EMPTY_SEARCH_ALERT));
    }

    #[test]
    fn header_hit_test_maps_to_sortable_fields() {
        let model = model(120, 16);
        let mut ui = TableUI::new(&BVConfig::default());
        render(&model, &mut ui, 120, 16);

        // Table block starts below search box and alert line, header inside the border.
        let header_y = SEARCH_HEIGHT + ALERT_HEIGHT + 1;
        assert_eq!(ui.header_at(1, header_y), Some(Field::Make));
        assert_eq!(ui.header_at(1, header_y + 1), None);
        assert_eq!(ui.header_at(118, header_y), None);

        let price = ui.headers.iter().find(|h| h.field == Field::Price).unwrap();
        assert_eq!(ui.header_at(price.area.x, header_y), Some(Field::Price));
    }

    #[test]
    fn renders_empty_search_alert() {
        let mut model = model(100, 12);
        let mut ui = TableUI::new(&BVConfig::default());
        model.update(Some(Message::EditSearch)).unwrap();
        let enter = ratatui::crossterm::event::KeyEvent::new(
            ratatui::crossterm::event::KeyCode::Enter,
            ratatui::crossterm::event::KeyModifiers::NONE,
        );
        model.update(Some(Message::RawKey(enter))).unwrap();
        let screen = render(&model, &mut ui, 100, 12);
        assert!(screen.contains(EMPTY_SEARCH_ALERT));
    }
}
