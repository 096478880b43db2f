pub mod csv;
pub mod json;
pub mod memory;

pub use self::csv::parse_csv;
pub use json::parse_json;
pub use memory::MemoryRouteSource;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::core::Route;
use crate::error::{RouteError, RouteResult};

/// Where a route comes from
///
/// Implementations:
/// - [`FileRouteSource`] reads a JSON or CSV file
/// - [`MemoryRouteSource`] serves a fixed route, for tests and demos
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Human readable name for logs
    fn name(&self) -> &str;

    /// Fetch the whole route
    async fn fetch(&self) -> RouteResult<Route>;
}

/// Input format detection result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputFormat {
    Json,
    Csv,
    Unknown,
}

/// Detect the format of a route resource from its content
pub fn detect_format(data: &[u8]) -> InputFormat {
    if is_json(data) {
        return InputFormat::Json;
    }

    if is_csv(data) {
        return InputFormat::Csv;
    }

    InputFormat::Unknown
}

fn is_json(data: &[u8]) -> bool {
    data.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'[')
}

fn is_csv(data: &[u8]) -> bool {
    let head = &data[..data.len().min(500)];
    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        // the cut may land inside a multi-byte character
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or_default(),
        Err(_) => return false,
    };

    // header needs at least latitude, longitude and time
    text.lines()
        .take(5)
        .any(|line| line.matches(',').count() >= 2)
}

/// Parse a route resource, auto-detecting format
pub fn parse_route(data: &[u8]) -> RouteResult<Route> {
    match detect_format(data) {
        InputFormat::Json => parse_json(data),
        InputFormat::Csv => parse_csv(data),
        InputFormat::Unknown => Err(RouteError::UnknownFormat(
            "expected a JSON array or a CSV file with a header row".to_string(),
        )),
    }
}

/// Parse a date-time string from a route resource
///
/// Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS`
/// which is taken to be UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Route source backed by a file on disk
pub struct FileRouteSource {
    path: PathBuf,
    name: String,
}

impl FileRouteSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RouteSource for FileRouteSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> RouteResult<Route> {
        let data = tokio::fs::read(&self.path).await.map_err(|source| RouteError::Io {
            path: self.name.clone(),
            source,
        })?;
        debug!("Read {} bytes from {}", data.len(), self.name);
        parse_route(&data)
    }
}
