//! Conversion of host durations and deadlines to kernel ticks.
//!
//! Every timeout funnels into [`from_span`], which rounds up so a wait never
//! ends early, and clamps to [`MAX_TIMEOUT_TICKS`] instead of wrapping.

use core::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::kernel::{Kernel, WAIT_FOREVER};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Longest finite timeout. `WAIT_FOREVER` itself is never produced by a
/// conversion.
pub const MAX_TIMEOUT_TICKS: u32 = WAIT_FOREVER - 1;

/// A signed time span with nanosecond resolution.
///
/// Unlike [`Duration`] this can be negative, e.g. the time left until a
/// deadline that has already passed.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Span {
    nanos: i64,
}

impl Span {
    pub const ZERO: Span = Span { nanos: 0 };

    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    pub const fn from_micros(micros: i64) -> Self {
        Self::from_nanos(micros.saturating_mul(1_000))
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self::from_nanos(millis.saturating_mul(1_000_000))
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self::from_nanos(secs.saturating_mul(1_000_000_000))
    }

    pub const fn as_nanos(&self) -> i64 {
        self.nanos
    }

    pub const fn is_negative(&self) -> bool {
        self.nanos < 0
    }
}

impl From<Duration> for Span {
    fn from(duration: Duration) -> Self {
        Span::from_nanos(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }
}

pub(crate) fn negative_timeout() -> Error {
    Error::new(ErrorKind::Parameter, "negative timeout")
}

pub(crate) fn no_tick_frequency() -> Error {
    Error::new(ErrorKind::Error, "osKernelGetTickFreq")
}

/// Converts `span` to kernel ticks: `ceil(seconds * tick_frequency)`.
///
/// A zero span yields 0 ticks (poll). Negative spans and a zero frequency
/// are errors. Results beyond [`MAX_TIMEOUT_TICKS`] are clamped.
pub fn from_span(span: Span, tick_frequency: u32) -> Result<u32> {
    if span.is_negative() {
        return Err(negative_timeout());
    }
    if tick_frequency == 0 {
        return Err(no_tick_frequency());
    }

    let scaled = span.nanos as u128 * tick_frequency as u128;
    let ticks = scaled.div_ceil(NANOS_PER_SEC);
    if ticks > MAX_TIMEOUT_TICKS as u128 {
        log::trace!("timeout of {}ns clamped to {} ticks", span.nanos, MAX_TIMEOUT_TICKS);
        Ok(MAX_TIMEOUT_TICKS)
    } else {
        Ok(ticks as u32)
    }
}

/// A point on the kernel's (wrapping) tick counter.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TickInstant(u32);

impl TickInstant {
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    pub const fn ticks(&self) -> u32 {
        self.0
    }

    pub const fn wrapping_add(self, ticks: u32) -> Self {
        Self(self.0.wrapping_add(ticks))
    }

    /// Ticks from `now` until `self`, `None` if `self` is not in the future.
    ///
    /// Both points must be less than half the counter range apart.
    pub fn ticks_after(&self, now: TickInstant) -> Option<u32> {
        let diff = self.0.wrapping_sub(now.0) as i32;
        (diff > 0).then_some(diff as u32)
    }
}

/// An absolute point in time a wait can be bounded by.
pub trait Deadline {
    /// Ticks left until the deadline; 0 once it has passed.
    fn ticks_remaining<K: Kernel + ?Sized>(&self, kernel: &K, tick_frequency: u32) -> Result<u32>;
}

impl Deadline for TickInstant {
    fn ticks_remaining<K: Kernel + ?Sized>(&self, kernel: &K, _tick_frequency: u32) -> Result<u32> {
        let now = TickInstant::from_ticks(kernel.tick_count());
        Ok(self.ticks_after(now).unwrap_or(0).min(MAX_TIMEOUT_TICKS))
    }
}

#[cfg(feature = "std")]
impl Deadline for std::time::Instant {
    fn ticks_remaining<K: Kernel + ?Sized>(&self, _kernel: &K, tick_frequency: u32) -> Result<u32> {
        match self.checked_duration_since(std::time::Instant::now()) {
            Some(left) => from_span(left.into(), tick_frequency),
            None => Ok(0),
        }
    }
}
