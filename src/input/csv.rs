use tracing::warn;
use crate::core::{Route, Sample};
use crate::error::{RouteError, RouteResult};
use super::parse_timestamp;

/// Parse a CSV route
///
/// Supports flexible column names:
/// - latitude,longitude,timestamp
/// - lat,lng,time
/// - lat,lon,ts
///
/// Extra columns are ignored. Rows that fail to parse are skipped.
pub fn parse_csv(data: &[u8]) -> RouteResult<Route> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = rdr.headers()?.clone();
    let (lat_idx, lon_idx, time_idx) = detect_columns(&headers)?;

    let mut route = Route::new();
    for (row, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable CSV row {}: {}", row + 1, e);
                continue;
            }
        };

        let latitude = record.get(lat_idx).and_then(|s| s.parse::<f64>().ok());
        let longitude = record.get(lon_idx).and_then(|s| s.parse::<f64>().ok());
        let timestamp = record.get(time_idx).and_then(parse_timestamp);

        match (latitude, longitude, timestamp) {
            (Some(latitude), Some(longitude), Some(timestamp)) => {
                let sample = Sample::new(latitude, longitude, timestamp);
                if sample.is_finite() {
                    route.push(sample);
                } else {
                    warn!("Skipping CSV row {} with non-finite coordinates", row + 1);
                }
            }
            _ => warn!("Skipping malformed CSV row {}", row + 1),
        }
    }

    if route.is_empty() {
        return Err(RouteError::Empty);
    }

    Ok(route)
}

/// Detect column indices from CSV headers
fn detect_columns(headers: &csv::StringRecord) -> RouteResult<(usize, usize, usize)> {
    let lat_idx = find_column(headers, &["latitude", "lat"])?;
    let lon_idx = find_column(headers, &["longitude", "lon", "lng", "long"])?;
    let time_idx = find_column(headers, &["timestamp", "time", "ts", "datetime"])?;

    Ok((lat_idx, lon_idx, time_idx))
}

/// Find a column by checking possible names
fn find_column(headers: &csv::StringRecord, names: &[&str]) -> RouteResult<usize> {
    headers
        .iter()
        .position(|header| {
            let header_lower = header.to_lowercase();
            names.iter().any(|&name| header_lower == name)
        })
        .ok_or_else(|| RouteError::UnknownFormat(format!("no CSV column named any of {:?}", names)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_route() {
        let data = b"Lat,Lng,Time,speed\n\
            17.0, 78.0, 2024-05-01T09:30:00Z, 0\n\
            17.001,78.001,2024-05-01 09:31:00,12\n";
        let route = parse_csv(data).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route[1].latitude, 17.001);
        assert_eq!((route[1].timestamp - route[0].timestamp).num_seconds(), 60);
    }

    #[test]
    fn test_parse_csv_skips_bad_rows() {
        let data = b"latitude,longitude,timestamp\n\
            17.0,78.0,2024-05-01T09:30:00Z\n\
            abc,78.0,2024-05-01T09:31:00Z\n\
            17.2\n\
            17.3,78.3,2024-05-01T09:33:00Z\n";
        let route = parse_csv(data).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route[1].latitude, 17.3);
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let data = b"latitude,longitude,altitude\n17.0,78.0,500\n";
        assert!(matches!(parse_csv(data), Err(RouteError::UnknownFormat(_))));
    }

    #[test]
    fn test_parse_csv_no_rows() {
        let data = b"latitude,longitude,timestamp\n";
        assert!(matches!(parse_csv(data), Err(RouteError::Empty)));
    }
}
