pub mod sample;

pub use sample::{Coordinate, Route, Sample};
