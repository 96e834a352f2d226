// src/position/view.rs
//! Position representations derived from the latest fix

use super::fix::FixBuffer;
use super::{
    METER_PER_SECOND_TO_KILOMETER_PER_HOUR, METER_PER_SECOND_TO_KNOT,
    METER_PER_SECOND_TO_MILE_PER_HOUR,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Coordinate and unit scheme of a published position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionType {
    /// Decimal degrees, speed in m/s.
    Wgs84,
    /// Degrees-minutes-seconds, speed in km/h.
    DmsKmh,
    /// Degrees-minutes-seconds, speed in mph.
    DmsMph,
    /// Degrees-minutes-seconds, speed in knots.
    DmsKn,
}

impl PositionType {
    pub const COUNT: usize = 4;
    pub const ALL: [PositionType; Self::COUNT] =
        [Self::Wgs84, Self::DmsKmh, Self::DmsMph, Self::DmsKn];

    /// The published, case-sensitive name.
    pub fn name(self) -> &'static str {
        match self {
            PositionType::Wgs84 => "WGS84",
            PositionType::DmsKmh => "DMS.km/h",
            PositionType::DmsMph => "DMS.mph",
            PositionType::DmsKn => "DMS.kn",
        }
    }

    /// Look a type up by its exact published name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    fn index(self) -> usize {
        match self {
            PositionType::Wgs84 => 0,
            PositionType::DmsKmh => 1,
            PositionType::DmsMph => 2,
            PositionType::DmsKn => 3,
        }
    }
}

impl Default for PositionType {
    fn default() -> Self {
        PositionType::Wgs84
    }
}

impl std::fmt::Display for PositionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lazily built, memoized JSON views of the newest fix.
///
/// Sub-values shared between representation types (time, altitude, track,
/// each coordinate rendering, each speed unit) are cached separately, so a
/// second type built in the same generation reuses them. Everything is
/// dropped in one sweep when the fix buffer generation moves on.
#[derive(Debug, Default)]
pub struct ViewCache {
    generation: u64,
    time_ms: Option<Value>,
    latitude_wgs: Option<Value>,
    longitude_wgs: Option<Value>,
    latitude_dms: Option<Value>,
    longitude_dms: Option<Value>,
    altitude_m: Option<Value>,
    speed_ms: Option<Value>,
    speed_kmh: Option<Value>,
    speed_mph: Option<Value>,
    speed_kn: Option<Value>,
    track_d: Option<Value>,
    views: [Option<Arc<Value>>; PositionType::COUNT],
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The view of the newest fix in the given representation.
    ///
    /// Within one buffer generation, repeated calls for the same type hand
    /// out the same `Arc`.
    pub fn view(&mut self, ty: PositionType, buffer: &FixBuffer) -> Arc<Value> {
        if self.generation != buffer.generation() {
            *self = Self {
                generation: buffer.generation(),
                ..Self::default()
            };
        }
        if let Some(view) = &self.views[ty.index()] {
            return Arc::clone(view);
        }

        log::debug!("building position view for type {}", ty.name());
        let fix = buffer.latest();
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::from(ty.name()));

        if self.time_ms.is_none() {
            self.time_ms = fix.time_ms.map(|v| json!(v));
        }
        add_if(&mut obj, "time", &self.time_ms);

        if self.altitude_m.is_none() {
            self.altitude_m = fix.altitude.map(|v| json!(v));
        }
        add_if(&mut obj, "altitude", &self.altitude_m);

        if self.track_d.is_none() {
            self.track_d = fix.track.map(|v| json!(v));
        }
        add_if(&mut obj, "track", &self.track_d);

        match ty {
            PositionType::Wgs84 => {
                if self.latitude_wgs.is_none() {
                    self.latitude_wgs = fix.latitude.map(|v| json!(v));
                }
                add_if(&mut obj, "latitude", &self.latitude_wgs);
                if self.longitude_wgs.is_none() {
                    self.longitude_wgs = fix.longitude.map(|v| json!(v));
                }
                add_if(&mut obj, "longitude", &self.longitude_wgs);
            }
            PositionType::DmsKmh | PositionType::DmsMph | PositionType::DmsKn => {
                if self.latitude_dms.is_none() {
                    self.latitude_dms = fix.latitude.map(|v| Value::from(dms(v, true)));
                }
                add_if(&mut obj, "latitude", &self.latitude_dms);
                if self.longitude_dms.is_none() {
                    self.longitude_dms = fix.longitude.map(|v| Value::from(dms(v, false)));
                }
                add_if(&mut obj, "longitude", &self.longitude_dms);
            }
        }

        let (speed, factor) = match ty {
            PositionType::Wgs84 => (&mut self.speed_ms, 1.0),
            PositionType::DmsKmh => (&mut self.speed_kmh, METER_PER_SECOND_TO_KILOMETER_PER_HOUR),
            PositionType::DmsMph => (&mut self.speed_mph, METER_PER_SECOND_TO_MILE_PER_HOUR),
            PositionType::DmsKn => (&mut self.speed_kn, METER_PER_SECOND_TO_KNOT),
        };
        if speed.is_none() {
            *speed = fix.speed.map(|v| json!(v * factor));
        }
        add_if(&mut obj, "speed", speed);

        let view = Arc::new(Value::Object(obj));
        self.views[ty.index()] = Some(Arc::clone(&view));
        view
    }
}

/// Add the key only when the sub-value has been built.
fn add_if(obj: &mut Map<String, Value>, key: &str, value: &Option<Value>) {
    if let Some(value) = value {
        obj.insert(key.to_string(), value.clone());
    }
}

/// Render an angle as `D°M'S.sss"H` with its hemisphere letter.
///
/// Longitudes arrive on the 0..360 scale; anything above 180 renders as
/// west of Greenwich.
fn dms(angle: f64, is_latitude: bool) -> String {
    let (value, hemisphere) = if is_latitude {
        if angle >= 0.0 {
            (angle, 'N')
        } else {
            (-angle, 'S')
        }
    } else if angle <= 180.0 {
        (angle, 'E')
    } else {
        (360.0 - angle, 'W')
    };
    let degrees = value.floor();
    let rest = (value - degrees) * 60.0;
    let minutes = rest.floor();
    let seconds = (rest - minutes) * 60.0;
    format!(
        "{}°{}'{:.3}\"{}",
        degrees as i32, minutes as i32, seconds, hemisphere
    )
}
