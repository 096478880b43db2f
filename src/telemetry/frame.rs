use serde::Serialize;
use chrono::{DateTime, Utc};
use crate::core::Coordinate;

/// Battery level shown in the info popup; the demo has no battery telemetry
pub const MOCK_BATTERY_PERCENT: u8 = 16;

/// Vehicle status shown in the info popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleStatus {
    Running,
    Idle,
}

/// Values for the vehicle info popup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehiclePopup {
    pub timestamp: Option<DateTime<Utc>>,
    pub speed_kmh: f64,
    pub battery_percent: u8,
    pub status: VehicleStatus,
}

/// Everything a presentation layer needs to draw one frame
///
/// Positions jump from sample to sample; feed `current_position` into a
/// [`MarkerTween`](crate::telemetry::MarkerTween) to glide the marker between frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    /// Vehicle marker position (fallback coordinate when no route is loaded)
    pub current_position: Coordinate,
    /// Whole route polyline
    pub full_path: Vec<Coordinate>,
    /// Route up to and including the cursor
    pub traveled_path: Vec<Coordinate>,
    /// Clicked target, while it is still displayed
    pub target: Option<Coordinate>,
    pub is_playing: bool,
    pub current_index: usize,
    pub total_count: usize,
    pub current_speed_kmh: f64,
    pub popup: VehiclePopup,
}

impl RenderFrame {
    /// Frame shown before any route has loaded
    pub fn empty(fallback: Coordinate) -> Self {
        Self {
            current_position: fallback,
            full_path: Vec::new(),
            traveled_path: Vec::new(),
            target: None,
            is_playing: false,
            current_index: 0,
            total_count: 0,
            current_speed_kmh: 0.0,
            popup: VehiclePopup {
                timestamp: None,
                speed_kmh: 0.0,
                battery_percent: MOCK_BATTERY_PERCENT,
                status: VehicleStatus::Idle,
            },
        }
    }

    /// One-line summary used by the headless logger
    pub fn summary(&self) -> String {
        let time = self
            .popup
            .timestamp
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{}/{} @ {:.6}, {:.6} | {} | {:.2} km/h | {}",
            self.current_index + 1,
            self.total_count,
            self.current_position.latitude,
            self.current_position.longitude,
            time,
            self.current_speed_kmh,
            if self.is_playing { "playing" } else { "stopped" },
        )
    }
}
