use std::sync::Arc;
use std::time::{Duration, Instant};

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::config::{DashConfig, PageSize};
use crate::domain::{CMDMode, DashError, FETCH_ERROR_TEXT, HELP_TEXT, Message};
use crate::engine::{self, Column, FilterControl, FilteredView, Query, TabSelection};
use crate::filters::{ControlState, FilterBar};
use crate::inputter::{InputResult, Inputter};
use crate::pagination::{PageButton, Pager, page_buttons};
use crate::record::{Record, wrap_csv_cell};
use crate::source::{FetchOutcome, FetchResult, FetchState, Fetcher, PageParams, RecordSource};
use crate::ui::{COLUMN_WIDTH_MARGIN, TABLE_BORDER};
use crate::views::ViewKind;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTERBAR,
    OPTIONS,
    CMDINPUT,
    POPUP,
}

/// Settings shared by every view. Owned by the model, the engine only ever
/// sees a snapshot of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub page_size: PageSize,
    pub search_term: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

/// One entry of the filter bar as the ui sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterChip {
    pub key: String,
    pub label: String,
    pub value: Option<String>,
    pub state: ControlState,
    pub focused: bool,
    pub is_options: bool,
}

/// The option list of the open enumerated filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionList {
    pub label: String,
    pub options: Vec<String>,
    pub cursor: usize,
    pub selected: Option<String>,
}

struct ViewState {
    kind: ViewKind,
    records: Vec<Record>,
    total: usize,
    fetch_state: FetchState,
    columns: Vec<Column>,
    filter_bar: FilterBar,
    pager: Pager,
    tab_idx: usize,
    result: FilteredView,
    curser_row: usize,
    offset_column: usize,
}

impl ViewState {
    fn new(kind: ViewKind) -> Self {
        ViewState {
            kind,
            records: Vec::new(),
            total: 0,
            fetch_state: FetchState::Idle,
            columns: kind.columns(),
            filter_bar: FilterBar::new(kind.filter_fields(&[])),
            pager: Pager::default(),
            tab_idx: 0,
            result: FilteredView::default(),
            curser_row: 0,
            offset_column: 0,
        }
    }

    fn tab_selection(&self) -> TabSelection {
        self.kind
            .tabs()
            .get(self.tab_idx)
            .map(|tab| tab.selection.clone())
            .unwrap_or(TabSelection::All)
    }

    fn query(&self, session: &Session) -> Query {
        let query = Query::default()
            .with_search_term(session.search_term.clone())
            .with_active_filters(self.filter_bar.active().clone())
            .with_page_size(session.page_size.rows())
            .with_current_page(self.pager.current());
        match self.kind.tab_partition(&self.tab_selection()) {
            Some(tab) => query.with_tab(tab),
            None => query,
        }
    }

    fn recompute(&mut self, session: &Session) {
        self.result = engine::compute(
            &self.records,
            &self.columns,
            self.filter_bar.fields(),
            &self.query(session),
        );
        self.curser_row = std::cmp::min(self.curser_row, self.result.paged.len().saturating_sub(1));
    }

    /// The result set changed shape, start over at the first page.
    fn reset_page(&mut self, session: &Session) {
        self.pager.reset();
        self.curser_row = 0;
        self.recompute(session);
    }

    fn load(&mut self, result: FetchResult, session: &Session) {
        self.filter_bar
            .set_fields(self.kind.filter_fields(&result.records));
        self.records = result.records;
        self.total = result.total;
        self.fetch_state = FetchState::Ready;
        self.reset_page(session);
    }

    fn selected_record(&self) -> Option<&Record> {
        self.result
            .paged
            .get(self.curser_row)
            .map(|&idx| &self.records[idx])
    }
}

pub struct UIData {
    pub title: String,
    pub source: String,
    pub view: ViewKind,
    pub tabs: Vec<(String, bool)>,
    pub filters: Vec<FilterChip>,
    pub open_options: Option<OptionList>,
    pub table: Vec<ColumnView>,
    pub selected_row: usize,
    pub filtered_rows: usize,
    pub total_records: usize,
    pub fetch_state: FetchState,
    pub page: usize,
    pub total_pages: usize,
    pub page_buttons: Vec<PageButton>,
    pub has_prev: bool,
    pub has_next: bool,
    pub page_size: PageSize,
    pub search_term: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub focus_filters: bool,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            title: String::new(),
            source: String::new(),
            view: ViewKind::default(),
            tabs: Vec::new(),
            filters: Vec::new(),
            open_options: None,
            table: Vec::new(),
            selected_row: 0,
            filtered_rows: 0,
            total_records: 0,
            fetch_state: FetchState::Idle,
            page: 1,
            total_pages: 1,
            page_buttons: Vec::new(),
            has_prev: false,
            has_next: false,
            page_size: PageSize::default(),
            search_term: String::new(),
            show_popup: false,
            popup_message: String::new(),
            focus_filters: false,
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct UILayout {
    pub width: usize,
    pub table_width: usize,
}

impl UILayout {
    /// Rows are paged, so only the width decides what fits.
    pub fn from_values(ui_width: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            table_width: ui_width.saturating_sub(2 * TABLE_BORDER),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: DashConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    session: Session,
    current: ViewKind,
    views: Vec<ViewState>,
    fetcher: Fetcher,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    cmd_backup: String,
    last_input: InputResult,
    popup_message: String,
    status_message: String,
    last_status_message_update: Instant,
}

fn slot(kind: ViewKind) -> usize {
    match kind {
        ViewKind::Users => 0,
        ViewKind::Products => 1,
    }
}

impl Model {
    pub fn init(
        config: &DashConfig,
        source: Arc<dyn RecordSource>,
        ui_width: usize,
    ) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            session: Session {
                page_size: config.page_size,
                search_term: String::new(),
            },
            current: config.default_view,
            views: ViewKind::ALL.into_iter().map(ViewState::new).collect(),
            fetcher: Fetcher::new(source),
            uilayout: UILayout::from_values(ui_width),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            cmd_backup: String::new(),
            last_input: InputResult::default(),
            popup_message: String::new(),
            status_message: "Started dashview!".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.fetch(model.current);
        model.update_uidata();
        model
    }

    fn view(&self) -> &ViewState {
        &self.views[slot(self.current)]
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.views[slot(self.current)]
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_view(&self) -> ViewKind {
        self.current
    }

    /// Records of the current page of the current view.
    pub fn page_records(&self) -> Vec<&Record> {
        let view = self.view();
        view.result.paged_records(&view.records)
    }

    pub fn filtered_count(&self) -> usize {
        self.view().result.filtered.len()
    }

    pub fn current_page(&self) -> usize {
        self.view().pager.current()
    }

    pub fn total_pages(&self) -> usize {
        self.view().result.total_pages
    }

    pub fn fetch_state(&self, kind: ViewKind) -> &FetchState {
        &self.views[slot(kind)].fetch_state
    }

    pub fn active_filter(&self, key: &str) -> Option<&str> {
        self.view().filter_bar.active().get(key)
    }

    pub fn filter_state(&self, key: &str) -> ControlState {
        self.view().filter_bar.state(key)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    // -------------------- Fetching ---------------------- //

    fn fetch(&mut self, kind: ViewKind) {
        let page = PageParams {
            limit: self.config.fetch_limit,
            skip: 0,
        };
        self.views[slot(kind)].fetch_state = FetchState::Loading;
        self.fetcher.request(kind.collection(), Some(page));
        self.set_status_message(format!("Loading {} ...", kind.collection()));
    }

    fn poll_fetches(&mut self) {
        for outcome in self.fetcher.poll() {
            self.apply_fetch(outcome);
        }
    }

    /// Block until a pending fetch arrived, mostly useful for scripted use.
    pub fn wait_for_fetch(&mut self, timeout: Duration) -> bool {
        match self.fetcher.wait(timeout) {
            Some(outcome) => {
                self.apply_fetch(outcome);
                self.update_uidata();
                true
            }
            None => false,
        }
    }

    pub fn apply_fetch(&mut self, outcome: FetchOutcome) {
        let Some(kind) = ViewKind::ALL
            .into_iter()
            .find(|k| k.collection() == outcome.collection)
        else {
            error!("Received records for unknown collection {}", outcome.collection);
            return;
        };
        let idx = slot(kind);
        match outcome.result {
            Ok(result) => {
                let count = result.records.len();
                self.views[idx].load(result, &self.session);
                info!("Loaded {count} {}", kind.collection());
                if kind == self.current {
                    self.set_status_message(format!("Loaded {count} {}", kind.collection()));
                }
            }
            Err(e) => {
                error!("Fetching {} failed: {e}", kind.collection());
                self.views[idx].fetch_state = FetchState::Failed(FETCH_ERROR_TEXT.to_string());
                if kind == self.current {
                    self.set_status_message(FETCH_ERROR_TEXT);
                }
            }
        }
    }

    // -------------------- Update ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DashError> {
        self.poll_fetches();

        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => self.update_table(msg),
                Modus::FILTERBAR => self.update_filterbar(msg),
                Modus::OPTIONS => self.update_options(msg),
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, _) => self.ui_resize(width),
                    Message::Exit | Message::Enter | Message::Help => self.close_popup(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, _) => self.ui_resize(width),
                    _ => (),
                },
            }
        }

        self.update_uidata();
        Ok(())
    }

    fn update_table(&mut self, msg: Message) {
        match msg {
            Message::Quit => self.quit(),
            Message::Help => self.show_popup(HELP_TEXT.to_string()),
            Message::Resize(width, _) => self.ui_resize(width),
            Message::MoveUp => self.move_selection_up(),
            Message::MoveDown => self.move_selection_down(),
            Message::MoveLeft | Message::PrevPage => self.prev_page(),
            Message::MoveRight | Message::NextPage => self.next_page(),
            Message::FirstPage => self.view_mut().pager.first(),
            Message::LastPage => {
                let total = self.total_pages();
                self.view_mut().pager.last(total);
            }
            Message::MiddlePage => {
                let total = self.total_pages();
                self.view_mut().pager.activate(PageButton::Ellipsis, total);
            }
            Message::ScrollLeft => self.scroll_columns(-1),
            Message::ScrollRight => self.scroll_columns(1),
            Message::CyclePageSize => self.cycle_page_size(),
            Message::NextView => self.switch_view(self.current.next()),
            Message::SelectView(kind) => self.switch_view(kind),
            Message::NextTab => self.next_tab(),
            Message::Search => {
                let term = self.session.search_term.clone();
                self.enter_cmd_mode(CMDMode::Search, &term);
            }
            Message::FocusFilters => self.modus = Modus::FILTERBAR,
            Message::ClearFilters => self.clear_filters(),
            Message::Refetch => self.fetch(self.current),
            Message::CopyRow => self.copy_selected_row(),
            Message::Enter => self.show_record(),
            _ => (),
        }
        self.recompute_current();
    }

    fn update_filterbar(&mut self, msg: Message) {
        match msg {
            Message::Quit => self.quit(),
            Message::Help => self.show_popup(HELP_TEXT.to_string()),
            Message::Resize(width, _) => self.ui_resize(width),
            Message::MoveLeft => self.view_mut().filter_bar.focus_prev(),
            Message::MoveRight => self.view_mut().filter_bar.focus_next(),
            Message::Enter => self.open_focused_filter(),
            Message::RemoveFilter => {
                let key = self.view().filter_bar.focused().map(|f| f.key.clone());
                if let Some(key) = key {
                    self.remove_filter(&key);
                }
            }
            Message::ClearFilters => self.clear_filters(),
            Message::Search => {
                let term = self.session.search_term.clone();
                self.enter_cmd_mode(CMDMode::Search, &term);
            }
            Message::Exit | Message::FocusFilters => self.modus = Modus::TABLE,
            _ => (),
        }
    }

    fn update_options(&mut self, msg: Message) {
        match msg {
            Message::Quit => self.quit(),
            Message::Resize(width, _) => self.ui_resize(width),
            Message::MoveUp => self.view_mut().filter_bar.move_option_cursor(-1),
            Message::MoveDown => self.view_mut().filter_bar.move_option_cursor(1),
            Message::Enter => {
                let view = &mut self.views[slot(self.current)];
                if view.filter_bar.select_under_cursor() {
                    view.reset_page(&self.session);
                }
                self.modus = Modus::FILTERBAR;
            }
            Message::RemoveFilter => {
                let key = self.view().filter_bar.open_key().map(str::to_string);
                if let Some(key) = key {
                    self.remove_filter(&key);
                }
                self.modus = Modus::FILTERBAR;
            }
            Message::Exit => {
                self.view_mut().filter_bar.close();
                self.modus = Modus::FILTERBAR;
            }
            _ => (),
        }
    }

    fn recompute_current(&mut self) {
        let idx = slot(self.current);
        self.views[idx].recompute(&self.session);
    }

    // -------------------- Control handling functions ---------------------- //

    fn ui_resize(&mut self, width: usize) {
        trace!("UI was resized! w:{}->{}", self.uilayout.width, width);
        self.uilayout = UILayout::from_values(width);
    }

    fn show_popup(&mut self, message: String) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = message;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn show_record(&mut self) {
        let Some(record) = self.view().selected_record() else {
            return;
        };
        let width = record.field_names().map(|n| n.chars().count()).max().unwrap_or(0);
        let text = record
            .field_names()
            .map(|name| format!(" {name:<width$}  {}", record.display(name)))
            .collect::<Vec<String>>()
            .join("\n");
        self.show_popup(text);
    }

    fn switch_view(&mut self, kind: ViewKind) {
        if kind == self.current {
            return;
        }
        debug!("Switching view {} -> {}", self.current, kind);
        self.view_mut().filter_bar.close();
        self.current = kind;
        self.modus = Modus::TABLE;
        if self.view().fetch_state == FetchState::Idle {
            self.fetch(kind);
        }
    }

    fn next_tab(&mut self) {
        let tabs = self.current.tabs();
        if tabs.is_empty() {
            return;
        }
        let view = &mut self.views[slot(self.current)];
        view.tab_idx = (view.tab_idx + 1) % tabs.len();
        debug!("Selected tab {}", tabs[view.tab_idx].label);
        view.reset_page(&self.session);
    }

    fn next_page(&mut self) {
        let total = self.total_pages();
        let view = self.view_mut();
        if view.pager.next(total) {
            view.curser_row = 0;
        }
    }

    fn prev_page(&mut self) {
        let view = self.view_mut();
        if view.pager.prev() {
            view.curser_row = 0;
        }
    }

    fn cycle_page_size(&mut self) {
        self.session.page_size = self.session.page_size.next();
        for view in self.views.iter_mut() {
            view.reset_page(&self.session);
        }
        self.set_status_message(format!("{} entries per page", self.session.page_size));
    }

    fn set_search_term(&mut self, term: &str) {
        if self.session.search_term == term {
            return;
        }
        self.session.search_term = term.to_string();
        for view in self.views.iter_mut() {
            view.reset_page(&self.session);
        }
    }

    fn scroll_columns(&mut self, step: i32) {
        let view = self.view_mut();
        if step < 0 {
            view.offset_column = view.offset_column.saturating_sub(1);
        } else if view.offset_column + 1 < view.columns.len() {
            view.offset_column += 1;
        }
    }

    fn move_selection_up(&mut self) {
        let view = self.view_mut();
        view.curser_row = view.curser_row.saturating_sub(1);
    }

    fn move_selection_down(&mut self) {
        let view = self.view_mut();
        if view.curser_row + 1 < view.result.paged.len() {
            view.curser_row += 1;
        }
    }

    fn open_focused_filter(&mut self) {
        let Some(field) = self.view().filter_bar.focused().cloned() else {
            return;
        };
        self.view_mut().filter_bar.open(&field.key);
        match field.control {
            FilterControl::Options(_) => self.modus = Modus::OPTIONS,
            FilterControl::Text => {
                let current = self.active_filter(&field.key).unwrap_or_default().to_string();
                self.enter_cmd_mode(CMDMode::FilterText(field.key.clone()), &current);
            }
        }
    }

    fn remove_filter(&mut self, key: &str) {
        let view = &mut self.views[slot(self.current)];
        if view.filter_bar.remove(key) {
            view.reset_page(&self.session);
            self.set_status_message(format!("Removed filter {key}"));
        }
    }

    fn clear_filters(&mut self) {
        let view = &mut self.views[slot(self.current)];
        if view.filter_bar.clear_all() {
            view.reset_page(&self.session);
            self.set_status_message("Removed all filters");
        }
        if self.modus == Modus::OPTIONS {
            self.modus = Modus::FILTERBAR;
        }
    }

    fn copy_selected_row(&mut self) {
        let Some(record) = self.view().selected_record() else {
            return;
        };
        let row_content = self
            .view()
            .columns
            .iter()
            .map(|c| wrap_csv_cell(&record.text(&c.field).unwrap_or_default()))
            .collect::<Vec<String>>()
            .join(",");
        trace!("Row content: {}", row_content);

        if self.clipboard.is_none() {
            self.clipboard = match Clipboard::new() {
                Ok(clipboard) => Some(clipboard),
                Err(e) => {
                    error!("Clipboard not available: {:?}", e);
                    None
                }
            };
        }
        let copied = match self.clipboard.as_mut().map(|c| c.set_text(row_content)) {
            Some(Ok(_)) => true,
            Some(Err(e)) => {
                error!("Error copying to clipboard: {:?}", e);
                false
            }
            None => false,
        };
        if copied {
            self.set_status_message("Copied row to clipboard");
        } else {
            self.set_status_message("Clipboard not available");
        }
    }

    // -------------------- Command input ---------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode, initial: &str) {
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.cmd_backup = initial.to_string();
        self.input.set(initial);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        let input = self.last_input.clone();
        let mode = self.cmd_mode.clone();

        // Search and text filters apply while typing.
        if input.changed {
            self.apply_cmd_input(&mode, &input.input);
        }
        if input.finished {
            if input.canceled {
                let backup = self.cmd_backup.clone();
                self.apply_cmd_input(&mode, &backup);
            }
            self.leave_cmd_mode();
        }
    }

    fn apply_cmd_input(&mut self, mode: &Option<CMDMode>, text: &str) {
        match mode {
            Some(CMDMode::Search) => self.set_search_term(text),
            Some(CMDMode::FilterText(key)) => {
                let idx = slot(self.current);
                let view = &mut self.views[idx];
                if view.filter_bar.edit_text(key, text) {
                    view.reset_page(&self.session);
                }
            }
            None => {}
        }
    }

    fn leave_cmd_mode(&mut self) {
        trace!("Leaving command mode {:?}", self.cmd_mode);
        match self.cmd_mode.take() {
            Some(CMDMode::FilterText(_)) => {
                self.view_mut().filter_bar.close();
                self.modus = Modus::FILTERBAR;
            }
            _ => self.modus = self.previous_modus,
        }
        self.previous_modus = Modus::CMDINPUT;
    }

    // -------------------- UI data ---------------------- //

    pub fn get_visible_name(name: &str, width: usize) -> String {
        if name.chars().count() <= width {
            return name.to_string();
        }
        if width < 3 {
            return name.chars().take(width).collect();
        }
        let mut reduced_name: String = name.chars().take(width - 3).collect();
        reduced_name.push_str("...");
        reduced_name
    }

    /// Lay out the columns of the current page that fit into the table,
    /// starting at the horizontal offset. The last one may be cut.
    fn build_table_columns(
        view: &ViewState,
        table_width: usize,
        max_column_width: usize,
    ) -> Vec<ColumnView> {
        let rows = view.result.paged_records(&view.records);
        let mut columns = Vec::new();
        let mut visible_width = 0;

        for column in view.columns.iter().skip(view.offset_column) {
            if visible_width >= table_width {
                break;
            }
            let data: Vec<String> = rows.iter().map(|r| r.display(&column.field)).collect();
            let max_width = data.iter().map(|s| s.chars().count()).max().unwrap_or(0);
            let width = std::cmp::min(
                std::cmp::max(column.label.chars().count(), max_width) + COLUMN_WIDTH_MARGIN,
                max_column_width,
            );
            let width = std::cmp::min(width, table_width - visible_width);
            visible_width += width + 1;

            columns.push(ColumnView {
                name: Self::get_visible_name(&column.label, width),
                width,
                data: data
                    .iter()
                    .map(|s| Self::get_visible_name(s, width))
                    .collect(),
            });
        }
        columns
    }

    fn update_uidata(&mut self) {
        let view = self.view();
        let bar = &view.filter_bar;
        let filters = bar
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| FilterChip {
                key: field.key.clone(),
                label: field.label.clone(),
                value: bar.active().get(&field.key).map(str::to_string),
                state: bar.state(&field.key),
                focused: self.modus != Modus::TABLE && idx == bar.focus_index(),
                is_options: field.option_values().is_some(),
            })
            .collect();
        let open_options = match (self.modus, bar.open_field()) {
            (Modus::OPTIONS, Some(field)) => field.option_values().map(|options| OptionList {
                label: field.label.clone(),
                options: options.to_vec(),
                cursor: bar.option_cursor(),
                selected: bar.active().get(&field.key).map(str::to_string),
            }),
            _ => None,
        };
        let tabs = view
            .kind
            .tabs()
            .into_iter()
            .enumerate()
            .map(|(idx, tab)| (tab.label, idx == view.tab_idx))
            .collect();
        let page = view.pager.current();
        let total_pages = view.result.total_pages;

        let uidata = UIData {
            title: view.kind.title().to_string(),
            source: self.fetcher.describe(),
            view: view.kind,
            tabs,
            filters,
            open_options,
            table: Self::build_table_columns(
                view,
                self.uilayout.table_width,
                self.config.max_column_width,
            ),
            selected_row: view.curser_row,
            filtered_rows: view.result.filtered.len(),
            total_records: view.total,
            fetch_state: view.fetch_state.clone(),
            page,
            total_pages,
            page_buttons: page_buttons(page, total_pages),
            has_prev: view.pager.has_prev(),
            has_next: view.pager.has_next(total_pages),
            page_size: self.session.page_size,
            search_term: self.session.search_term.clone(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.popup_message.clone(),
            focus_filters: matches!(self.modus, Modus::FILTERBAR | Modus::OPTIONS)
                || matches!(self.cmd_mode, Some(CMDMode::FilterText(_))),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode.clone(),
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
        self.uidata = uidata;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FetchResult;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    /// Source that always answers with the same users and products.
    struct FixtureSource;

    impl RecordSource for FixtureSource {
        fn fetch(
            &self,
            collection: &str,
            _page: Option<PageParams>,
        ) -> Result<FetchResult, DashError> {
            let records: Vec<Record> = match collection {
                "users" => (1..=12_i64)
                    .map(|id| {
                        Record::new()
                            .with("id", id)
                            .with("firstName", if id == 3 { "Jane" } else { "John" })
                            .with("lastName", format!("Doe{id}"))
                            .with("gender", if id % 2 == 0 { "female" } else { "male" })
                            .with("bloodGroup", if id % 3 == 0 { "O-" } else { "A+" })
                    })
                    .collect(),
                "products" => (1..=12_i64)
                    .map(|id| {
                        Record::new()
                            .with("id", id)
                            .with("title", if id == 1 { "MacBook".to_string() } else { format!("Product {id}") })
                            .with("category", if id % 4 == 1 { "laptops" } else { "beauty" })
                            .with("brand", if id % 2 == 0 { "Essence" } else { "Apple" })
                    })
                    .collect(),
                _ => Vec::new(),
            };
            let total = records.len();
            Ok(FetchResult { records, total })
        }

        fn describe(&self) -> String {
            "fixture".into()
        }
    }

    fn model() -> Model {
        let mut model = Model::init(&DashConfig::default(), Arc::new(FixtureSource), 120);
        assert!(model.wait_for_fetch(Duration::from_secs(5)));
        model
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn type_keys(model: &mut Model, text: &str) {
        for c in text.chars() {
            send(model, Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)));
        }
    }

    fn key(model: &mut Model, code: KeyCode) {
        send(model, Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    #[test]
    fn initial_fetch_fills_the_first_page() {
        let model = model();
        assert_eq!(model.fetch_state(ViewKind::Users), &FetchState::Ready);
        assert_eq!(model.filtered_count(), 12);
        assert_eq!(model.page_records().len(), 5);
        assert_eq!(model.total_pages(), 3);
        assert_eq!(model.get_uidata().table.len(), ViewKind::Users.columns().len());
    }

    #[test]
    fn paging_and_page_size() {
        let mut model = model();
        send(&mut model, Message::NextPage);
        send(&mut model, Message::NextPage);
        send(&mut model, Message::NextPage);
        assert_eq!(model.current_page(), 3);
        assert_eq!(model.page_records().len(), 2);

        send(&mut model, Message::CyclePageSize);
        assert_eq!(model.session().page_size, PageSize::Ten);
        assert_eq!(model.current_page(), 1);
        assert_eq!(model.total_pages(), 2);
    }

    #[test]
    fn search_applies_while_typing_and_resets_the_page() {
        let mut model = model();
        send(&mut model, Message::NextPage);
        send(&mut model, Message::Search);
        assert!(model.raw_keyevents());
        type_keys(&mut model, "jan");
        assert_eq!(model.filtered_count(), 1);
        assert_eq!(model.current_page(), 1);

        key(&mut model, KeyCode::Enter);
        assert!(!model.raw_keyevents());
        assert_eq!(model.session().search_term, "jan");
    }

    #[test]
    fn canceled_search_restores_the_previous_term() {
        let mut model = model();
        send(&mut model, Message::Search);
        type_keys(&mut model, "zzz");
        assert_eq!(model.filtered_count(), 0);
        key(&mut model, KeyCode::Esc);
        assert_eq!(model.session().search_term, "");
        assert_eq!(model.filtered_count(), 12);
    }

    #[test]
    fn option_filters_commit_and_close() {
        let mut model = model();
        send(&mut model, Message::FocusFilters);
        // Name, Email, Gender
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::Enter);
        assert_eq!(model.filter_state("gender"), ControlState::OpenEditing);
        assert!(model.get_uidata().open_options.is_some());

        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Enter);
        assert_eq!(model.active_filter("gender"), Some("female"));
        assert_eq!(model.filter_state("gender"), ControlState::ClosedWithValue);
        assert_eq!(model.filtered_count(), 6);
    }

    #[test]
    fn text_filters_and_options_combine() {
        let mut model = model();
        send(&mut model, Message::FocusFilters);
        send(&mut model, Message::Enter);
        assert!(model.raw_keyevents());
        type_keys(&mut model, "doe1");
        key(&mut model, KeyCode::Enter);
        // Doe1, Doe10, Doe11, Doe12
        assert_eq!(model.filtered_count(), 4);
        assert_eq!(model.filter_state("name"), ControlState::ClosedWithValue);

        send(&mut model, Message::MoveRight);
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::Enter);
        send(&mut model, Message::Enter);
        assert_eq!(model.active_filter("gender"), Some("male"));
        // Doe1, Doe11
        assert_eq!(model.filtered_count(), 2);

        send(&mut model, Message::RemoveFilter);
        assert_eq!(model.active_filter("gender"), None);
        assert_eq!(model.filtered_count(), 4);

        send(&mut model, Message::ClearFilters);
        assert_eq!(model.filtered_count(), 12);
    }

    #[test]
    fn switching_views_fetches_lazily_and_tabs_partition() {
        let mut model = model();
        send(&mut model, Message::SelectView(ViewKind::Products));
        assert_eq!(model.fetch_state(ViewKind::Products), &FetchState::Loading);
        assert!(model.wait_for_fetch(Duration::from_secs(5)));
        assert_eq!(model.filtered_count(), 12);

        send(&mut model, Message::NextTab);
        assert_eq!(model.filtered_count(), 3);
        assert_eq!(model.page_records()[0].text("title").as_deref(), Some("MacBook"));
        send(&mut model, Message::NextTab);
        assert_eq!(model.filtered_count(), 12);
    }

    /// Pick the option under the cursor after moving it down `steps` times.
    fn pick_option(model: &mut Model, steps: usize) {
        send(model, Message::Enter);
        for _ in 0..steps {
            send(model, Message::MoveDown);
        }
        send(model, Message::Enter);
    }

    #[test]
    fn picking_an_option_goes_back_to_the_first_page() {
        let mut model = model();
        send(&mut model, Message::LastPage);
        assert_eq!(model.current_page(), 3);

        send(&mut model, Message::FocusFilters);
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::MoveRight);
        pick_option(&mut model, 1);
        assert_eq!(model.active_filter("gender"), Some("female"));
        assert_eq!(model.current_page(), 1);
        assert_eq!(model.total_pages(), 2);
    }

    #[test]
    fn typing_a_text_filter_goes_back_to_the_first_page() {
        let mut model = model();
        send(&mut model, Message::LastPage);
        assert_eq!(model.current_page(), 3);

        send(&mut model, Message::FocusFilters);
        send(&mut model, Message::Enter);
        type_keys(&mut model, "d");
        assert_eq!(model.current_page(), 1);
        assert_eq!(model.total_pages(), 3);

        type_keys(&mut model, "oe1");
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.current_page(), 1);
        assert_eq!(model.total_pages(), 1);
    }

    #[test]
    fn removing_filters_goes_back_to_the_first_page() {
        let mut model = model();
        send(&mut model, Message::FocusFilters);
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::MoveRight);
        pick_option(&mut model, 1);
        send(&mut model, Message::Exit);
        send(&mut model, Message::LastPage);
        assert_eq!(model.current_page(), 2);

        // Focus stays on the gender filter
        send(&mut model, Message::FocusFilters);
        send(&mut model, Message::RemoveFilter);
        assert_eq!(model.active_filter("gender"), None);
        assert_eq!(model.current_page(), 1);
        assert_eq!(model.total_pages(), 3);

        pick_option(&mut model, 0);
        send(&mut model, Message::Exit);
        send(&mut model, Message::LastPage);
        assert_eq!(model.current_page(), 2);

        send(&mut model, Message::ClearFilters);
        assert_eq!(model.active_filter("gender"), None);
        assert_eq!(model.current_page(), 1);
        assert_eq!(model.total_pages(), 3);
    }

    #[test]
    fn switching_tabs_goes_back_to_the_first_page() {
        let mut model = model();
        send(&mut model, Message::SelectView(ViewKind::Products));
        assert!(model.wait_for_fetch(Duration::from_secs(5)));
        send(&mut model, Message::LastPage);
        assert_eq!(model.current_page(), 3);

        send(&mut model, Message::NextTab);
        assert_eq!(model.current_page(), 1);
        assert_eq!(model.total_pages(), 1);
    }

    #[test]
    fn failed_fetch_shows_the_error_state() {
        let mut model = model();
        model.apply_fetch(FetchOutcome {
            collection: "users".into(),
            generation: 0,
            result: Err(DashError::LoadingFailed("offline".into())),
        });
        assert_eq!(
            model.fetch_state(ViewKind::Users),
            &FetchState::Failed(FETCH_ERROR_TEXT.to_string())
        );
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let mut model = model();
        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn long_values_are_shortened() {
        assert_eq!(Model::get_visible_name("Description", 8), "Descr...");
        assert_eq!(Model::get_visible_name("Age", 8), "Age");
        assert_eq!(Model::get_visible_name("Age", 2), "Ag");
    }
}
