pub mod distance;
pub mod frame;
pub mod tween;

pub use distance::{haversine_km, speed_kmh};
pub use frame::{RenderFrame, VehiclePopup, VehicleStatus};
pub use tween::MarkerTween;
