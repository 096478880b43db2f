use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use crate::core::{Route, Sample};
use crate::error::{RouteError, RouteResult};
use super::parse_timestamp;

#[derive(Deserialize)]
struct RawSample {
    latitude: f64,
    longitude: f64,
    timestamp: String,
}

/// Parse a JSON route: an array of `{ latitude, longitude, timestamp }`
///
/// Entries that are not objects of that shape, or whose timestamp does not
/// parse, are skipped. A route with no usable entries is an error.
pub fn parse_json(data: &[u8]) -> RouteResult<Route> {
    let entries: Vec<Value> = serde_json::from_slice(data)?;
    let total = entries.len();

    let route: Route = entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match to_sample(entry) {
            Some(sample) => Some(sample),
            None => {
                warn!("Skipping malformed route entry {}", idx);
                None
            }
        })
        .collect();

    if route.is_empty() {
        return Err(RouteError::Empty);
    }
    if route.len() < total {
        warn!("Loaded {} of {} route entries", route.len(), total);
    }

    Ok(route)
}

fn to_sample(entry: Value) -> Option<Sample> {
    let raw: RawSample = serde_json::from_value(entry).ok()?;
    let timestamp = parse_timestamp(&raw.timestamp)?;
    let sample = Sample::new(raw.latitude, raw.longitude, timestamp);
    sample.is_finite().then_some(sample)
}
