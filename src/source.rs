//! Record sources: where the rows of a collection come from.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use polars::prelude::*;
use rayon::prelude::*;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, trace};

use crate::domain::DashError;
use crate::record::{Record, Value};

/// Window of a collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub limit: usize,
    pub skip: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub records: Vec<Record>,
    /// Size of the whole collection, which may exceed `records.len()`.
    pub total: usize,
}

pub trait RecordSource: Send + Sync {
    fn fetch(&self, collection: &str, page: Option<PageParams>) -> Result<FetchResult, DashError>;

    /// Short human readable origin, shown in the header.
    fn describe(&self) -> String;
}

/// Turn an API style response into records. Accepts either a bare array or
/// an object carrying the array under the collection name. Anything else
/// is an empty collection.
pub fn records_from_json(collection: &str, json: &JsonValue) -> FetchResult {
    let items = match json {
        JsonValue::Array(items) => Some(items),
        JsonValue::Object(object) => object.get(collection).and_then(JsonValue::as_array),
        _ => None,
    };
    let records: Vec<Record> = items
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_object)
                .map(Record::from_json_object)
                .collect()
        })
        .unwrap_or_default();
    let total = json
        .get("total")
        .and_then(JsonValue::as_u64)
        .map(|t| t as usize)
        .unwrap_or(records.len());
    FetchResult { records, total }
}

// -------------------- Remote API ---------------------- //

/// Fetches collections from a dummyjson compatible API:
/// `GET {base_url}/{collection}?limit=..&skip=..`.
pub struct DummyJsonSource {
    client: reqwest::blocking::Client,
    base_url: String,
    limit: usize,
}

impl DummyJsonSource {
    pub fn new(base_url: &str, limit: usize) -> Result<Self, DashError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("dashview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(DummyJsonSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        })
    }

    pub fn url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }
}

impl RecordSource for DummyJsonSource {
    fn fetch(&self, collection: &str, page: Option<PageParams>) -> Result<FetchResult, DashError> {
        let page = page.unwrap_or(PageParams {
            limit: self.limit,
            skip: 0,
        });
        let url = self.url(collection);
        info!("Fetching {url} (limit {}, skip {})", page.limit, page.skip);

        let start_time = Instant::now();
        let json: JsonValue = self
            .client
            .get(&url)
            .query(&[("limit", page.limit), ("skip", page.skip)])
            .send()?
            .error_for_status()?
            .json()?;
        let result = records_from_json(collection, &json);

        info!(
            "Fetched {} of {} {collection} in {}ms",
            result.records.len(),
            result.total,
            start_time.elapsed().as_millis()
        );
        Ok(result)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

// -------------------- Local files ---------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

const FILE_EXTENSIONS: [&str; 6] = ["json", "csv", "parquet", "pq", "arrow", "ipc"];

/// Loads collections from disk. `path` is either a single file used for
/// every collection, or a directory holding `<collection>.<ext>` files.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        FileSource { path }
    }

    fn resolve(&self, collection: &str) -> Result<PathBuf, DashError> {
        if !self.path.is_dir() {
            return Ok(self.path.clone());
        }
        FILE_EXTENSIONS
            .iter()
            .map(|ext| self.path.join(format!("{collection}.{ext}")))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| DashError::FileNotFound(self.path.join(collection)))
    }

    fn detect_file_type(path: &Path) -> Result<FileType, DashError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("JSON") => Ok(FileType::JSON),
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(DashError::UnknownFileType(path.to_path_buf())),
        }
    }

    fn check_file(path: &Path) -> Result<(), DashError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DashError::FileNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => DashError::PermissionDenied(path.to_path_buf()),
            _ => DashError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(DashError::LoadingFailed(format!(
                "'{}' is not a file",
                path.display()
            )));
        }
        Ok(())
    }

    fn load_json(path: &Path, collection: &str) -> Result<FetchResult, DashError> {
        let contents = fs::read_to_string(path)?;
        let json: JsonValue = serde_json::from_str(&contents)?;
        Ok(records_from_json(collection, &json))
    }

    fn load_frame(path: &Path, file_type: FileType) -> Result<LazyFrame, PolarsError> {
        match file_type {
            FileType::PARQUET => LazyFrame::scan_parquet(
                PlPath::Local(path.into()),
                ScanArgsParquet::default(),
            ),
            FileType::ARROW => LazyFrame::scan_ipc(
                PlPath::Local(path.into()),
                polars::io::ipc::IpcScanOptions,
                UnifiedScanArgs::default(),
            ),
            _ => LazyCsvReader::new(PlPath::Local(path.into()))
                .with_has_header(true)
                .finish(),
        }
    }

    /// Decode a tabular file. Each column is decoded on its own rayon
    /// worker, then the columns are stitched back into rows.
    fn load_table(path: &Path, file_type: FileType) -> Result<FetchResult, DashError> {
        let df = Self::load_frame(path, file_type)?.collect()?;
        let columns: Result<Vec<(String, Vec<Value>)>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .map(|name| load_column(&df, name))
            .collect();
        let columns = columns?;

        let records: Vec<Record> = (0..df.height())
            .map(|row| {
                let mut record = Record::new();
                for (name, values) in columns.iter() {
                    record.insert(name, values[row].clone());
                }
                record
            })
            .collect();
        let total = records.len();
        Ok(FetchResult { records, total })
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

fn is_float_type(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<(String, Vec<Value>), PolarsError> {
    let original_dtype = df.column(col_name)?.dtype().clone();
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;

    let data = series
        .into_iter()
        .map(|value| match value {
            None => Value::Null,
            Some(s) if is_integer_type(&original_dtype) => s
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or_else(|_| Value::Text(s.to_string())),
            Some(s) if is_float_type(&original_dtype) => s
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or_else(|_| Value::Text(s.to_string())),
            Some(s) => Value::Text(s.to_string()),
        })
        .collect();
    Ok((col_name.to_string(), data))
}

impl RecordSource for FileSource {
    fn fetch(&self, collection: &str, page: Option<PageParams>) -> Result<FetchResult, DashError> {
        let path = self.resolve(collection)?;
        Self::check_file(&path)?;
        let file_type = Self::detect_file_type(&path)?;
        info!("Loading {collection} from {}", path.display());

        let start_time = Instant::now();
        let mut result = match file_type {
            FileType::JSON => Self::load_json(&path, collection)?,
            other => Self::load_table(&path, other)?,
        };
        if let Some(page) = page {
            result.records = result
                .records
                .into_iter()
                .skip(page.skip)
                .take(page.limit)
                .collect();
        }
        info!(
            "Loaded {} {collection} in {}ms",
            result.records.len(),
            start_time.elapsed().as_millis()
        );
        Ok(result)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// -------------------- Background fetching ---------------------- //

/// Loading state of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Failed(String),
    Ready,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub collection: String,
    pub generation: u64,
    pub result: Result<FetchResult, DashError>,
}

/// Runs fetches off the ui thread.
///
/// Every request of a collection bumps that collection's generation. Results
/// of older generations are dropped when they arrive, so the latest request
/// always wins.
pub struct Fetcher {
    source: Arc<dyn RecordSource>,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
    generations: HashMap<String, u64>,
    in_flight: HashMap<String, u64>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        let (tx, rx) = mpsc::channel();
        Fetcher {
            source,
            tx,
            rx,
            generations: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    pub fn request(&mut self, collection: &str, page: Option<PageParams>) -> u64 {
        let generation = self.generations.entry(collection.to_string()).or_insert(0);
        *generation += 1;
        let generation = *generation;
        self.in_flight.insert(collection.to_string(), generation);
        debug!("Requesting {collection} (generation {generation})");

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let collection = collection.to_string();
        thread::spawn(move || {
            let result = source.fetch(&collection, page);
            if let Err(e) = &result {
                error!("Fetching {collection} failed: {e}");
            }
            // The receiver is gone when the app shut down meanwhile.
            let _ = tx.send(FetchOutcome {
                collection,
                generation,
                result,
            });
        });
        generation
    }

    pub fn is_loading(&self, collection: &str) -> bool {
        self.in_flight.contains_key(collection)
    }

    /// Collect finished fetches without blocking.
    pub fn poll(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(outcome) = self.accept(outcome) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Block until a current fetch finished or `timeout` passed.
    pub fn wait(&mut self, timeout: Duration) -> Option<FetchOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    if let Some(outcome) = self.accept(outcome) {
                        return Some(outcome);
                    }
                }
                Err(_) => return None,
            }
        }
    }

    fn accept(&mut self, outcome: FetchOutcome) -> Option<FetchOutcome> {
        let collection = &outcome.collection;
        if self.in_flight.get(collection) != Some(&outcome.generation) {
            trace!(
                "Dropping superseded result for {collection} (generation {})",
                outcome.generation
            );
            return None;
        }
        self.in_flight.remove(collection);
        Some(outcome)
    }
}
