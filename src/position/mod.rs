// src/position/mod.rs
//! Fix storage and derived position views

pub mod fix;
pub mod view;

pub use fix::{Fix, FixBuffer, FIX_HISTORY};
pub use view::{PositionType, ViewCache};

/// Meters per second in one knot (1852 m per 3600 s).
pub const KNOT_TO_METER_PER_SECOND: f64 = 0.5144444444;
/// Knots in one meter per second.
pub const METER_PER_SECOND_TO_KNOT: f64 = 1.943844492;
/// Kilometers per hour in one meter per second.
pub const METER_PER_SECOND_TO_KILOMETER_PER_HOUR: f64 = 3.6;
/// Miles per hour in one meter per second.
pub const METER_PER_SECOND_TO_MILE_PER_HOUR: f64 = 2.236936292;
