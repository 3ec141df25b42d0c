use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock seconds since the Unix epoch, the time base of [`Fix::time`](crate::Fix).
///
/// A clock set before 1970 yields a negative value rather than a panic.
#[inline]
pub fn unix_time_secs() -> f64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}
