use chrono::{DateTime, Duration, Utc};
use crate::core::{Coordinate, Route, Sample};

/// Default number of interpolation steps for a click-to-target detour
pub const DEFAULT_STEPS: usize = 15;

/// Straight-line path from `start` to `end` with `steps + 1` samples
///
/// Latitude and longitude are interpolated linearly, not along the geodesic.
/// Sample `i` is stamped `now + i` seconds. The first sample is exactly
/// `start` and the last exactly `end`; with zero steps the path is just `end`.
pub fn synthesize_path(start: Coordinate, end: Coordinate, steps: usize, now: DateTime<Utc>) -> Route {
    if steps == 0 {
        return vec![Sample::at(end, now)];
    }

    (0..=steps)
        .map(|i| {
            let position = if i == steps {
                end
            } else {
                start.lerp(&end, i as f64 / steps as f64)
            };
            Sample::at(position, now + Duration::seconds(i as i64))
        })
        .collect()
}
