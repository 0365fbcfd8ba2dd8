use std::fmt;
use std::path::{Path, PathBuf};

use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::CliArgs;
use crate::domain::DashError;
use crate::views::ViewKind;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/dashview/config.yml";
pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";

/// Rows per page. Only a handful of sizes are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    #[default]
    Five,
    Ten,
    Twenty,
    Fifty,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [PageSize::Five, PageSize::Ten, PageSize::Twenty, PageSize::Fifty];

    pub fn rows(&self) -> usize {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
        }
    }

    pub fn next(&self) -> PageSize {
        match self {
            PageSize::Five => PageSize::Ten,
            PageSize::Ten => PageSize::Twenty,
            PageSize::Twenty => PageSize::Fifty,
            PageSize::Fifty => PageSize::Five,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = String;

    fn try_from(rows: usize) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.rows() == rows)
            .ok_or_else(|| format!("page size must be one of 5, 10, 20, 50, got {rows}"))
    }
}

impl From<PageSize> for usize {
    fn from(size: PageSize) -> Self {
        size.rows()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rows())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct DashConfig {
    #[setters(into)]
    pub base_url: String,
    pub fetch_limit: usize,
    pub page_size: PageSize,
    pub event_poll_time: u64,
    pub max_column_width: usize,
    #[setters(strip_option, into)]
    pub log_file: Option<String>,
    #[setters(strip_option, into)]
    pub data_path: Option<String>,
    pub default_view: ViewKind,
}

impl Default for DashConfig {
    fn default() -> Self {
        DashConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_limit: 100,
            page_size: PageSize::default(),
            event_poll_time: 100,
            max_column_width: 30,
            log_file: None,
            data_path: None,
            default_view: ViewKind::default(),
        }
    }
}

impl DashConfig {
    /// Overlay command line flags on top of the file configuration.
    pub fn apply_args(mut self, args: &CliArgs) -> Result<Self, DashError> {
        if let Some(url) = &args.base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = &args.file {
            self.data_path = Some(path.clone());
        }
        if let Some(limit) = args.limit {
            self.fetch_limit = limit;
        }
        if let Some(rows) = args.page_size {
            self.page_size = PageSize::try_from(rows).map_err(DashError::ConfigError)?;
        }
        if let Some(log_file) = &args.log_file {
            self.log_file = Some(log_file.clone());
        }
        if let Some(view) = args.view {
            self.default_view = view;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), DashError> {
        if self.fetch_limit == 0 {
            return Err(DashError::ConfigError("fetch_limit must be positive".into()));
        }
        if self.max_column_width < 4 {
            return Err(DashError::ConfigError(
                "max_column_width must be at least 4".into(),
            ));
        }
        if self.base_url.is_empty() {
            return Err(DashError::ConfigError("base_url must not be empty".into()));
        }
        Ok(())
    }
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

pub fn default_config_path() -> PathBuf {
    expand_path(DEFAULT_CONFIG_PATH)
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<DashConfig, DashError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            debug!("Loading config from {}", path.display());
            let config: DashConfig = serde_yaml::from_str(&contents)?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(DashConfig::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DashError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(DashError::IoError(e)),
    }
}

/// Resolve the effective configuration: defaults, then the config file,
/// then command line flags.
pub fn resolve(args: &CliArgs) -> Result<DashConfig, DashError> {
    let config = match &args.config {
        Some(path) => load_config(&expand_path(path), false)?,
        None => load_config(&default_config_path(), true)?,
    };
    config.apply_args(args)
}
