//! Vehicle route replay
//!
//! Steps a simulated vehicle through a recorded GPS route on a fixed tick,
//! with play/pause/reset and click-to-target detours along a straight
//! interpolated path. Rendering is left to the caller, which receives a
//! [`telemetry::RenderFrame`] after every change.

pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod playback;
pub mod store;
pub mod telemetry;

pub use crate::core::{Coordinate, Route, Sample};
pub use error::{RouteError, RouteResult};
pub use playback::{PlaybackConfig, PlaybackEngine, PlaybackState, Session};
pub use telemetry::RenderFrame;
