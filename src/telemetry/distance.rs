use crate::core::Sample;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const MILLIS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

/// Great-circle distance in kilometers between two points (haversine formula)
pub fn haversine_km(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let d_lat = (lat_b - lat_a).to_radians();
    let d_lon = (lon_b - lon_a).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat_a.to_radians().cos() * lat_b.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Instantaneous speed in km/h between two consecutive samples
///
/// Returns 0 when either sample is missing or when `curr` is not strictly
/// after `prev`.
pub fn speed_kmh(prev: Option<&Sample>, curr: Option<&Sample>) -> f64 {
    let (Some(prev), Some(curr)) = (prev, curr) else {
        return 0.0;
    };

    let elapsed_ms = (curr.timestamp - prev.timestamp).num_milliseconds();
    if elapsed_ms <= 0 {
        return 0.0;
    }

    let km = haversine_km(prev.latitude, prev.longitude, curr.latitude, curr.longitude);
    km / (elapsed_ms as f64 / MILLIS_PER_HOUR)
}
