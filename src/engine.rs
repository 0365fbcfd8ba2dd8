//! Filter, search and paginate engine.
//!
//! [`compute`] is a pure function of its inputs: it never errors and never
//! mutates anything. Malformed descriptors degrade to "pass through" and
//! missing record fields degrade to "no match".

use std::time::Instant;

use derive_setters::Setters;
use tracing::trace;

use crate::filters::ActiveFilters;
use crate::pagination::{page_count, page_range};
use crate::record::Record;

/// A table column. The set of columns is also the free text search surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: String,
    pub label: String,
}

impl Column {
    pub fn new(field: &str, label: &str) -> Self {
        Column {
            field: field.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive full string equality.
    Exact,
    /// Case-insensitive containment.
    Substring,
}

/// How a filter value is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterControl {
    Text,
    Options(Vec<String>),
}

/// One user facing filter dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub key: String,
    pub label: String,
    pub control: FilterControl,
    /// Underlying record fields. Empty means the field named by `key`.
    pub fields: Vec<String>,
    pub match_mode: MatchMode,
}

impl FilterField {
    /// Free text filter with substring matching.
    pub fn text(key: &str, label: &str) -> Self {
        FilterField {
            key: key.to_string(),
            label: label.to_string(),
            control: FilterControl::Text,
            fields: Vec::new(),
            match_mode: MatchMode::Substring,
        }
    }

    /// Enumerated filter with exact matching.
    pub fn options(key: &str, label: &str, options: Vec<String>) -> Self {
        FilterField {
            key: key.to_string(),
            label: label.to_string(),
            control: FilterControl::Options(options),
            fields: Vec::new(),
            match_mode: MatchMode::Exact,
        }
    }

    pub fn over_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn option_values(&self) -> Option<&[String]> {
        match &self.control {
            FilterControl::Options(options) => Some(options),
            FilterControl::Text => None,
        }
    }

    /// A composite filter passes if any of its fields matches.
    fn matches(&self, record: &Record, folded_value: &str) -> bool {
        if self.fields.is_empty() {
            self.field_matches(record, &self.key, folded_value)
        } else {
            self.fields
                .iter()
                .any(|field| self.field_matches(record, field, folded_value))
        }
    }

    fn field_matches(&self, record: &Record, field: &str, folded_value: &str) -> bool {
        match record.folded(field) {
            Some(item) => match self.match_mode {
                MatchMode::Exact => item == folded_value,
                MatchMode::Substring => item.contains(folded_value),
            },
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabSelection {
    All,
    Value(String),
}

/// Coarse pre-filter on the value of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabPartition {
    pub field: String,
    pub selection: TabSelection,
}

impl TabPartition {
    fn passes(&self, record: &Record) -> bool {
        match &self.selection {
            TabSelection::All => true,
            TabSelection::Value(value) => record.text(&self.field).as_deref() == Some(value.as_str()),
        }
    }
}

/// Snapshot of the inputs that change with user interaction.
#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(prefix = "with_")]
pub struct Query {
    #[setters(into)]
    pub search_term: String,
    pub active_filters: ActiveFilters,
    #[setters(strip_option)]
    pub tab: Option<TabPartition>,
    pub page_size: usize,
    pub current_page: usize,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            search_term: String::new(),
            active_filters: ActiveFilters::default(),
            tab: None,
            page_size: 5,
            current_page: 1,
        }
    }
}

/// Result of a recompute. Rows are indices into the record slice that was
/// passed to [`compute`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilteredView {
    pub filtered: Vec<usize>,
    pub paged: Vec<usize>,
    pub total_pages: usize,
}

impl FilteredView {
    pub fn filtered_records<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        self.filtered.iter().map(|&idx| &records[idx]).collect()
    }

    pub fn paged_records<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        self.paged.iter().map(|&idx| &records[idx]).collect()
    }
}

fn matches_search(record: &Record, columns: &[Column], folded_term: &str) -> bool {
    if folded_term.is_empty() {
        return true;
    }
    columns.iter().any(|column| {
        record
            .folded(&column.field)
            .is_some_and(|value| value.contains(folded_term))
    })
}

fn matches_filters(record: &Record, active: &[(&FilterField, String)]) -> bool {
    active
        .iter()
        .all(|(field, folded_value)| field.matches(record, folded_value))
}

/// Run tab, search and filter stages over `records` and cut out the
/// requested page.
pub fn compute(
    records: &[Record],
    columns: &[Column],
    filter_fields: &[FilterField],
    query: &Query,
) -> FilteredView {
    let start_time = Instant::now();
    let folded_term = query.search_term.to_lowercase();

    // Resolve descriptors once. Keys without a descriptor are dropped, which
    // makes them pass for every record.
    let active: Vec<(&FilterField, String)> = query
        .active_filters
        .iter()
        .filter_map(|(key, value)| {
            filter_fields
                .iter()
                .find(|f| f.key == key)
                .map(|f| (f, value.to_lowercase()))
        })
        .collect();

    let filtered: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| query.tab.as_ref().is_none_or(|tab| tab.passes(record)))
        .filter(|(_, record)| matches_search(record, columns, &folded_term))
        .filter(|(_, record)| matches_filters(record, &active))
        .map(|(idx, _)| idx)
        .collect();

    let total_pages = page_count(filtered.len(), query.page_size);
    let paged = filtered[page_range(filtered.len(), query.page_size, query.current_page)].to_vec();

    trace!(
        "Recompute: {} records -> {} filtered, page {}/{} with {} rows in {}us",
        records.len(),
        filtered.len(),
        query.current_page,
        total_pages,
        paged.len(),
        start_time.elapsed().as_micros()
    );

    FilteredView {
        filtered,
        paged,
        total_pages,
    }
}
