// src/position/fix.rs
//! Decoded GPS fixes and the rotating fix history

/// Number of fixes kept in the history ring.
pub const FIX_HISTORY: usize = 10;

/// One decoded GPS sample.
///
/// Every field is independently optional: a sentence only carries some of
/// them, and an absent field must never be read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fix {
    /// Milliseconds since midnight UTC.
    pub time_ms: Option<u32>,
    /// Degrees, south of the equator negative.
    pub latitude: Option<f64>,
    /// Degrees on a 0..360 scale; values above 180 lie west of Greenwich.
    pub longitude: Option<f64>,
    /// Meters above mean sea level.
    pub altitude: Option<f64>,
    /// Meters per second over ground.
    pub speed: Option<f64>,
    /// Course over ground, degrees true.
    pub track: Option<f64>,
}

impl Fix {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.time_ms.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.altitude.is_none()
            && self.speed.is_none()
            && self.track.is_none()
    }
}

/// Rotating store of the most recent fixes.
///
/// The cursor walks backward through the ring, so the newest fix always
/// sits at the cursor and older fixes follow at rising indices. A
/// generation counter is bumped once per stored fix; view caching and
/// event dispatch key off it.
#[derive(Debug)]
pub struct FixBuffer {
    frames: [Fix; FIX_HISTORY],
    cursor: usize,
    generation: u64,
}

impl FixBuffer {
    pub fn new() -> Self {
        Self {
            frames: [Fix::default(); FIX_HISTORY],
            cursor: 0,
            generation: 0,
        }
    }

    /// Store a fix as the newest entry.
    pub fn push(&mut self, fix: Fix) {
        self.cursor = if self.cursor == 0 {
            FIX_HISTORY - 1
        } else {
            self.cursor - 1
        };
        self.frames[self.cursor] = fix;
        self.generation += 1;
    }

    /// The most recently stored fix. All fields are absent until the first
    /// push.
    pub fn latest(&self) -> &Fix {
        &self.frames[self.cursor]
    }

    /// Monotonic count of accepted fixes.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for FixBuffer {
    fn default() -> Self {
        Self::new()
    }
}
