use meridian_shm::Plain;

// Raw values are what travels through shared memory. A torn copy can hold any
// bit pattern, so the enums are only ever produced by checked conversion.

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixMode {
    NotSeen = 0,
    NoFix = 1,
    TwoD = 2,
    ThreeD = 3,
}

impl TryFrom<i32> for FixMode {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FixMode::NotSeen),
            1 => Ok(FixMode::NoFix),
            2 => Ok(FixMode::TwoD),
            3 => Ok(FixMode::ThreeD),
            other => Err(other),
        }
    }
}

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixStatus {
    NoFix = 0,
    Fix = 1,
    DgpsFix = 2,
}

impl TryFrom<i32> for FixStatus {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FixStatus::NoFix),
            1 => Ok(FixStatus::Fix),
            2 => Ok(FixStatus::DgpsFix),
            other => Err(other),
        }
    }
}

/// One position fix as exported to shared memory.
///
/// POD, fixed size, no indirection. Unknown measurements are NaN.
/// Error estimates are 95% confidence bounds in the unit of their field.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    pub time: f64, // seconds since the Unix epoch
    pub mode: i32, // FixMode
    pub status: i32, // FixStatus
    pub ept: f64, // time uncertainty, s
    pub latitude: f64, // degrees, +north
    pub longitude: f64, // degrees, +east
    pub eph: f64, // horizontal error, m
    pub altitude: f64, // metres above mean sea level
    pub epv: f64, // vertical error, m
    pub track: f64, // course over ground, degrees from true north
    pub epd: f64, // track error, degrees
    pub speed: f64, // m/s over ground
    pub eps: f64, // speed error, m/s
    pub climb: f64, // m/s, +up
    pub epc: f64, // climb error, m/s
    pub separation: f64, // geoid separation, m
}

// SAFETY: repr(C), scalar fields only, no padding, every bit pattern valid
unsafe impl Plain for Fix {}

impl Fix {
    /// A fix with nothing known: mode `NotSeen` and every measurement NaN.
    pub fn unknown() -> Self {
        Self {
            time: f64::NAN,
            mode: FixMode::NotSeen as i32,
            status: FixStatus::NoFix as i32,
            ept: f64::NAN,
            latitude: f64::NAN,
            longitude: f64::NAN,
            eph: f64::NAN,
            altitude: f64::NAN,
            epv: f64::NAN,
            track: f64::NAN,
            epd: f64::NAN,
            speed: f64::NAN,
            eps: f64::NAN,
            climb: f64::NAN,
            epc: f64::NAN,
            separation: f64::NAN,
        }
    }

    #[inline]
    pub fn fix_mode(&self) -> Option<FixMode> {
        FixMode::try_from(self.mode).ok()
    }

    #[inline]
    pub fn fix_status(&self) -> Option<FixStatus> {
        FixStatus::try_from(self.status).ok()
    }

    pub fn has_position(&self) -> bool {
        matches!(self.fix_mode(), Some(FixMode::TwoD | FixMode::ThreeD))
            && self.latitude.is_finite()
            && self.longitude.is_finite()
    }

    pub fn has_altitude(&self) -> bool {
        self.fix_mode() == Some(FixMode::ThreeD) && self.altitude.is_finite()
    }
}

impl Default for Fix {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    /// Size and alignment are part of the shared segment layout; readers
    /// built against a different layout are refused at attach time.
    #[test]
    fn fix_layout_is_stable() {
        assert_eq!(size_of::<Fix>(), 128, "Fix layout changed");
        assert_eq!(align_of::<Fix>(), 8);
    }

    #[test]
    fn zeroed_fix_has_not_seen_mode() {
        // a freshly created segment holds an all-zero payload
        let zero: Fix = unsafe { std::mem::zeroed() };
        assert_eq!(zero.fix_mode(), Some(FixMode::NotSeen));
        assert_eq!(zero.fix_status(), Some(FixStatus::NoFix));
        assert!(!zero.has_position());
    }

    #[test]
    fn unknown_fix_has_nothing() {
        let fix = Fix::unknown();
        assert!(fix.latitude.is_nan());
        assert!(!fix.has_position());
        assert!(!fix.has_altitude());
    }

    #[test]
    fn position_needs_mode_and_coordinates() {
        let mut fix = Fix::unknown();
        fix.latitude = 37.0;
        fix.longitude = -122.0;
        assert!(!fix.has_position());

        fix.mode = FixMode::TwoD as i32;
        assert!(fix.has_position());
        assert!(!fix.has_altitude());

        fix.mode = FixMode::ThreeD as i32;
        fix.altitude = 12.5;
        assert!(fix.has_altitude());
    }

    #[test]
    fn out_of_range_raw_values_are_none() {
        let mut fix = Fix::unknown();
        fix.mode = 17;
        fix.status = -1;
        assert_eq!(fix.fix_mode(), None);
        assert_eq!(fix.fix_status(), None);
        assert!(!fix.has_position());
    }
}
