use meridian_config::OriginConfig;
use meridian_fix::{Fix, FixMode, FixStatus};

/// Metres per degree of latitude (and of longitude at the equator).
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Somewhere fixes come from. Receivers and protocol decoders plug in here.
pub trait FixSource {
    /// The fix valid at `now` (Unix seconds), or `None` if there is nothing new.
    fn next_fix(&mut self, now: f64) -> Option<Fix>;
}

/// Synthetic receiver driving a circle around the configured origin at
/// constant speed. Deterministic for a given start time.
pub struct CircuitSource {
    origin: OriginConfig,
    started: Option<f64>,
}

impl CircuitSource {
    pub fn new(origin: OriginConfig) -> Self {
        Self {
            origin,
            started: None,
        }
    }

    fn angular_rate(&self) -> f64 {
        if self.origin.radius_m > 0.0 {
            self.origin.speed_mps / self.origin.radius_m
        } else {
            0.0
        }
    }
}

impl FixSource for CircuitSource {
    fn next_fix(&mut self, now: f64) -> Option<Fix> {
        let t0 = *self.started.get_or_insert(now);
        let theta = self.angular_rate() * (now - t0);
        let r = self.origin.radius_m;

        // east/north offsets in metres; starts due north of the origin and runs clockwise
        let east = r * theta.sin();
        let north = r * theta.cos();
        let lat_scale = self.origin.latitude.to_radians().cos().max(1e-9);

        let moving = self.angular_rate() > 0.0;
        let track = if moving {
            let v_east = theta.cos();
            let v_north = -theta.sin();
            v_east.atan2(v_north).to_degrees().rem_euclid(360.0)
        } else {
            f64::NAN
        };

        Some(Fix {
            time: now,
            mode: FixMode::ThreeD as i32,
            status: FixStatus::Fix as i32,
            ept: 0.005,
            latitude: self.origin.latitude + north / METRES_PER_DEGREE,
            longitude: self.origin.longitude + east / (METRES_PER_DEGREE * lat_scale),
            eph: 3.5,
            altitude: self.origin.altitude,
            epv: 5.0,
            track,
            epd: if moving { 2.0 } else { f64::NAN },
            speed: if moving { self.origin.speed_mps } else { 0.0 },
            eps: 0.3,
            climb: 0.0,
            epc: 0.5,
            separation: -32.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(radius_m: f64, speed_mps: f64) -> OriginConfig {
        OriginConfig {
            latitude: 0.0,
            longitude: 10.0,
            altitude: 5.0,
            radius_m,
            speed_mps,
        }
    }

    fn offset_m(cfg: &OriginConfig, fix: &Fix) -> (f64, f64) {
        let north = (fix.latitude - cfg.latitude) * METRES_PER_DEGREE;
        let east = (fix.longitude - cfg.longitude) * METRES_PER_DEGREE;
        (east, north)
    }

    #[test]
    fn starts_north_heading_east() {
        let cfg = origin(100.0, 10.0);
        let mut source = CircuitSource::new(cfg.clone());
        let fix = source.next_fix(1_000.0).unwrap();

        let (east, north) = offset_m(&cfg, &fix);
        assert!(east.abs() < 1e-6);
        assert!((north - 100.0).abs() < 1e-6);
        assert!((fix.track - 90.0).abs() < 1e-9);
        assert!(fix.has_altitude());
        assert_eq!(fix.time, 1_000.0);
    }

    #[test]
    fn stays_on_the_circle() {
        let cfg = origin(100.0, 10.0);
        let mut source = CircuitSource::new(cfg.clone());
        source.next_fix(0.0);
        for t in [1.0, 7.5, 31.4, 100.0] {
            let fix = source.next_fix(t).unwrap();
            let (east, north) = offset_m(&cfg, &fix);
            assert!(((east * east + north * north).sqrt() - 100.0).abs() < 1e-6);
            assert_eq!(fix.speed, 10.0);
            assert!((0.0..360.0).contains(&fix.track));
        }
    }

    #[test]
    fn zero_radius_is_stationary() {
        let cfg = origin(0.0, 10.0);
        let mut source = CircuitSource::new(cfg.clone());
        let fix = source.next_fix(5.0).unwrap();
        assert_eq!(fix.latitude, cfg.latitude);
        assert_eq!(fix.longitude, cfg.longitude);
        assert_eq!(fix.speed, 0.0);
        assert!(fix.track.is_nan());
    }
}
