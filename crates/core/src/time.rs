//! Time bases, timestamps and overflow-safe rational rescaling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw value used for a timestamp whose position is unknown
const NULL_PTS: i64 = i64::MIN;

/// A rational unit of time, `num / den` seconds per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    num: u32,
    den: u32,
}

impl TimeBase {
    /// One tick per microsecond
    pub const MICROSECONDS: Self = Self::new(1, 1_000_000);

    /// Creates a new time base
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Time base whose tick is one sample at the given rate
    pub const fn for_sample_rate(rate: u32) -> Self {
        Self::new(1, rate)
    }

    /// Returns the numerator
    pub const fn num(&self) -> u32 {
        self.num
    }

    /// Returns the denominator
    pub const fn den(&self) -> u32 {
        self.den
    }

    /// A time base is usable only with a non-zero numerator and denominator
    pub const fn is_valid(&self) -> bool {
        self.num != 0 && self.den != 0
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Rounding applied when a rescaled value falls between two integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Round toward zero
    Zero,
    /// Round away from zero
    Inf,
    /// Round toward negative infinity
    Down,
    /// Round toward positive infinity
    Up,
    /// Round to nearest, halfway cases away from zero
    #[default]
    NearInf,
}

/// Computes `value * b / c` without intermediate overflow.
///
/// The product is formed in 128-bit arithmetic. Results outside the `i64`
/// range saturate to `i64::MIN + 1` or `i64::MAX` so that a rescaled value is
/// never confused with an unknown timestamp. A zero divisor saturates in the
/// direction of the numerator.
pub fn rescale_raw(value: i64, b: i64, c: i64, rounding: Rounding) -> i64 {
    let mut n = value as i128 * b as i128;
    let mut c = c as i128;

    if c == 0 {
        return match n.signum() {
            0 => 0,
            1 => i64::MAX,
            _ => i64::MIN + 1,
        };
    }

    if c < 0 {
        n = -n;
        c = -c;
    }

    let floor = n.div_euclid(c);
    let exact = n.rem_euclid(c) == 0;

    let q = match rounding {
        Rounding::Down => floor,
        Rounding::Up => {
            if exact {
                floor
            } else {
                floor + 1
            }
        }
        Rounding::Zero => n / c,
        Rounding::Inf => {
            if exact || n < 0 {
                floor
            } else {
                floor + 1
            }
        }
        Rounding::NearInf => {
            let half = c / 2;
            if n >= 0 {
                (n + half) / c
            } else {
                -((-n + half) / c)
            }
        }
    };

    q.clamp(i64::MIN as i128 + 1, i64::MAX as i128) as i64
}

/// Converts `value` expressed in `from` ticks into `to` ticks
pub fn rescale(value: i64, from: TimeBase, to: TimeBase, rounding: Rounding) -> i64 {
    let b = from.num as i64 * to.den as i64;
    let c = to.num as i64 * from.den as i64;

    rescale_raw(value, b, c, rounding)
}

/// Integer division rounding halfway cases away from zero
pub fn rounded_div(a: i64, b: i64) -> i64 {
    rescale_raw(a, 1, b, Rounding::NearInf)
}

/// A presentation timestamp in a given time base, possibly unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pts: i64,
    time_base: TimeBase,
}

impl Timestamp {
    /// Creates a known timestamp
    pub const fn new(pts: i64, time_base: TimeBase) -> Self {
        Self { pts, time_base }
    }

    /// Creates an unknown timestamp
    pub const fn null() -> Self {
        Self {
            pts: NULL_PTS,
            time_base: TimeBase::MICROSECONDS,
        }
    }

    /// Creates a timestamp from seconds, rounded to the nearest tick
    pub fn from_secs_f64(secs: f64, time_base: TimeBase) -> Self {
        if !secs.is_finite() || !time_base.is_valid() {
            return Self::null();
        }

        let ticks = (secs * time_base.den as f64 / time_base.num as f64).round();
        let pts = ticks.clamp(i64::MIN as f64 + 1.0, i64::MAX as f64) as i64;

        Self::new(pts, time_base)
    }

    /// Returns true if the position is unknown
    pub const fn is_null(&self) -> bool {
        self.pts == NULL_PTS
    }

    /// Returns the tick count, or `None` if unknown
    pub const fn pts(&self) -> Option<i64> {
        if self.is_null() {
            None
        } else {
            Some(self.pts)
        }
    }

    /// Returns the time base of this timestamp
    pub const fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Re-expresses this timestamp in another time base.
    /// Unknown timestamps stay unknown.
    pub fn with_time_base(self, time_base: TimeBase) -> Self {
        if self.is_null() {
            return Self {
                pts: NULL_PTS,
                time_base,
            };
        }

        Self::new(
            rescale(self.pts, self.time_base, time_base, Rounding::NearInf),
            time_base,
        )
    }

    /// Moves the timestamp by `ticks`; unknown timestamps stay unknown
    pub fn offset(self, ticks: i64) -> Self {
        match self.pts() {
            Some(pts) => Self::new(
                pts.saturating_add(ticks).max(i64::MIN + 1),
                self.time_base,
            ),
            None => self,
        }
    }

    /// Returns the position in seconds, or `None` if unknown
    pub fn as_secs_f64(&self) -> Option<f64> {
        if !self.time_base.is_valid() {
            return None;
        }

        self.pts()
            .map(|pts| pts as f64 * self.time_base.num as f64 / self.time_base.den as f64)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pts() {
            Some(pts) => write!(f, "{} @ {}", pts, self.time_base),
            None => write!(f, "none"),
        }
    }
}
