use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Padding, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::CMDMode;
use crate::filters::ControlState;
use crate::model::{Model, OptionList, UIData};
use crate::pagination::PageButton;
use crate::source::FetchState;
use crate::views::ViewKind;

pub const HEADER_HEIGHT: usize = 2;
pub const FILTERBAR_HEIGHT: usize = 1;
pub const PAGINATION_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

#[derive(Debug, Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [header_area, filter_area, table_area, pagination_area, cmd_area] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT as u16),
            Constraint::Length(FILTERBAR_HEIGHT as u16),
            Constraint::Min(TABLE_HEADER_HEIGHT as u16 + 2 * TABLE_BORDER as u16),
            Constraint::Length(PAGINATION_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.render_header(uidata, frame, header_area);
        self.render_filterbar(uidata, frame, filter_area);
        self.render_table(uidata, frame, table_area);
        self.render_pagination(uidata, frame, pagination_area);
        self.render_cmdline(uidata, frame, cmd_area);

        if let Some(options) = &uidata.open_options {
            self.render_options(options, frame, table_area);
        }
        if uidata.show_popup {
            self.render_popup(&uidata.popup_message, frame);
        }
    }

    fn render_header(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [nav_area, tab_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

        let mut nav = vec![" dashview ".bold().black().on_cyan(), " ".into()];
        for (idx, kind) in ViewKind::ALL.iter().enumerate() {
            let entry = format!(" {} {} ", idx + 1, kind.title());
            if *kind == uidata.view {
                nav.push(entry.bold().reversed());
            } else {
                nav.push(entry.into());
            }
        }
        nav.push(format!("   Home / {}", uidata.title).dark_gray());
        if uidata.fetch_state == FetchState::Loading {
            nav.push("  loading ...".yellow());
        }
        frame.render_widget(Line::from(nav), nav_area);
        frame.render_widget(
            Line::from(format!("{} ", uidata.source).dark_gray()).right_aligned(),
            nav_area,
        );

        let mut tabs: Vec<Span> = vec![" ".into()];
        for (label, active) in &uidata.tabs {
            let entry = format!(" {label} ");
            if *active {
                tabs.push(entry.bold().underlined().yellow());
            } else {
                tabs.push(entry.into());
            }
        }
        frame.render_widget(Line::from(tabs), tab_area);
    }

    fn render_filterbar(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans: Vec<Span> = vec![" Search: ".bold()];
        if uidata.search_term.is_empty() {
            spans.push("-".dark_gray());
        } else {
            spans.push(uidata.search_term.clone().yellow());
        }

        spans.push(" │ ".dark_gray());
        spans.push(format!("Rows: {} ▾", uidata.page_size).into());

        for chip in &uidata.filters {
            spans.push(" │ ".dark_gray());
            let marker = if chip.is_options { " ▾" } else { "" };
            let text = match &chip.value {
                Some(value) => format!("{}: {value}{marker}", chip.label),
                None => format!("{}{marker}", chip.label),
            };
            let mut style = match chip.state {
                ControlState::OpenEditing => Style::new().fg(Color::Black).bg(Color::Yellow),
                ControlState::ClosedWithValue => Style::new().fg(Color::Yellow),
                ControlState::Closed => Style::new(),
            };
            if chip.focused && uidata.focus_filters {
                style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
            }
            spans.push(Span::styled(text, style));
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let title = format!(
            " {} ({} of {}) ",
            uidata.title, uidata.filtered_rows, uidata.total_records
        );
        let block = Block::bordered().title(Line::from(title).bold());

        let message = match &uidata.fetch_state {
            FetchState::Idle | FetchState::Loading => Some(Text::from("Loading ...").dark_gray()),
            FetchState::Failed(text) => Some(Text::from(text.as_str()).red().bold()),
            FetchState::Ready if uidata.table.first().is_none_or(|c| c.data.is_empty()) => {
                Some(Text::from("No matching records").dark_gray())
            }
            FetchState::Ready => None,
        };
        if let Some(message) = message {
            let paragraph = Paragraph::new(message)
                .centered()
                .block(block.padding(Padding::top(area.height.saturating_sub(2) / 2)));
            frame.render_widget(paragraph, area);
            return;
        }

        let nrows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows: Vec<Row> = (0..nrows)
            .map(|row| {
                let style = if row % 2 == 0 {
                    Style::new()
                } else {
                    Style::new().bg(Color::Rgb(32, 32, 40))
                };
                Row::new(
                    uidata
                        .table
                        .iter()
                        .map(|column| Cell::from(column.data[row].as_str())),
                )
                .style(style)
            })
            .collect();
        let widths: Vec<Constraint> = uidata
            .table
            .iter()
            .map(|column| Constraint::Length(column.width as u16))
            .collect();
        let headers: Vec<Cell> = uidata
            .table
            .iter()
            .map(|column| Cell::from(column.name.as_str()))
            .collect();

        let table = Table::new(rows, widths)
            .column_spacing(1)
            .header(Row::new(headers).bold().underlined())
            .row_highlight_style(Style::new().bg(Color::Blue))
            .block(block);
        self.table_state.select(Some(uidata.selected_row));
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_pagination(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans: Vec<Span> = vec![" ".into()];
        spans.push(if uidata.has_prev { "◀ Prev ".into() } else { "◀ Prev ".dark_gray() });
        for button in &uidata.page_buttons {
            match button {
                PageButton::Page(page) if *page == uidata.page => {
                    spans.push(format!(" {page} ").bold().reversed());
                }
                PageButton::Page(page) => spans.push(format!(" {page} ").into()),
                PageButton::Ellipsis => spans.push(" … ".dark_gray()),
            }
        }
        spans.push(if uidata.has_next { " Next ▶".into() } else { " Next ▶".dark_gray() });
        spans.push(
            format!(
                "   page {} of {} · {} per page",
                uidata.page, uidata.total_pages, uidata.page_size
            )
            .dark_gray(),
        );
        frame.render_widget(Line::from(spans), area);
    }

    fn render_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if !uidata.active_cmdinput {
            let status = Line::from(format!(" {}", uidata.status_message)).dark_gray();
            frame.render_widget(status, area);
            return;
        }
        let prompt = match &uidata.cmd_mode {
            Some(CMDMode::FilterText(key)) => {
                let label = uidata
                    .filters
                    .iter()
                    .find(|chip| &chip.key == key)
                    .map(|chip| chip.label.as_str())
                    .unwrap_or(key.as_str());
                format!("{label}: ")
            }
            _ => "/".to_string(),
        };
        let line = Line::from(vec![
            prompt.clone().bold().yellow(),
            uidata.cmdinput.input.clone().into(),
        ]);
        frame.render_widget(line, area);

        let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
    }

    fn render_options(&self, options: &OptionList, frame: &mut Frame, area: Rect) {
        let width = options
            .options
            .iter()
            .map(|o| o.chars().count())
            .chain([options.label.chars().count()])
            .max()
            .unwrap_or(0) as u16
            + 6;
        let height = options.options.len() as u16 + 2;
        let popup_area = Rect {
            x: area.x + 2,
            y: area.y + 1,
            width: width.min(area.width.saturating_sub(2)),
            height: height.min(area.height.saturating_sub(1)),
        };

        let items: Vec<ListItem> = options
            .options
            .iter()
            .map(|option| {
                let mark = if Some(option) == options.selected.as_ref() { "● " } else { "  " };
                ListItem::new(format!("{mark}{option}"))
            })
            .collect();
        let list = List::new(items)
            .block(Block::bordered().title(format!(" {} ", options.label)))
            .highlight_style(Style::new().bg(Color::Blue).add_modifier(Modifier::BOLD));
        let mut state = ListState::default().with_selected(Some(options.cursor));

        frame.render_widget(Clear, popup_area);
        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    fn render_popup(&self, message: &str, frame: &mut Frame) {
        let area = centered_rect(frame.area(), 70, 80);
        let popup = Paragraph::new(message)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" dashview ")
                    .title_bottom(Line::from(" Esc to close ").centered()),
            );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    center
}
