use std::path::PathBuf;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::views::ViewKind;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("invalid json: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("invalid yaml: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found '{}'", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied '{}'", .0.display())]
    PermissionDenied(PathBuf),
    #[error("unknown file type '{}'", .0.display())]
    UnknownFileType(PathBuf),
}

/// Text shown instead of the table when a fetch failed.
pub const FETCH_ERROR_TEXT: &str = "Error fetching data";

/// Messages produced by the controller and consumed by `Model::update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Enter,
    Resize(usize, usize),
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ScrollLeft,
    ScrollRight,
    NextView,
    SelectView(ViewKind),
    NextTab,
    Search,
    FocusFilters,
    RemoveFilter,
    ClearFilters,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    MiddlePage,
    CyclePageSize,
    Refetch,
    CopyRow,
    RawKey(KeyEvent),
}

/// What the command line input is currently used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    FilterText(String),
}

pub const HELP_TEXT: &str = "\
 dashview - browse users and products

 Views
   1 / 2 / Tab     Users / Products
   t               Next product tab (ALL, Laptops)
   r               Fetch the current view again

 Table
   ↑ / ↓           Select row
   Enter           Show all fields of the row
   h / l           Scroll columns
   ← / → , p / n   Previous / next page
   g / G           First / last page
   m               Jump to the middle page
   s               Cycle page size (5, 10, 20, 50)
   y               Copy selected row as CSV

 Search and filters
   /               Search all columns
   f               Focus the filter bar
   ← / →           Move between filters
   Enter           Open the focused filter
   ↑ / ↓ , Enter   Pick an option
   x               Remove the focused filter
   X               Remove all filters
   Esc             Close filter / leave filter bar

 General
   ?               Help
   q               Quit
";
