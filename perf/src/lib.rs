use meridian_fix::{Fix, FixMode, FixStatus};
use meridian_shm::SegmentKey;

/// File-backed key unique to this process, so benches never collide.
pub fn temp_segment_key(tag: &str) -> SegmentKey {
    SegmentKey::file(format!("/tmp/meridian_bench_{tag}_{}", std::process::id()))
}

pub fn make_test_fix() -> Fix {
    Fix {
        time: 1_700_000_000.0,
        mode: FixMode::ThreeD as i32,
        status: FixStatus::Fix as i32,
        ept: 0.005,
        latitude: 37.4220,
        longitude: -122.0841,
        eph: 3.5,
        altitude: 32.0,
        epv: 5.0,
        track: 90.0,
        epd: 2.0,
        speed: 1.5,
        eps: 0.3,
        climb: 0.0,
        epc: 0.5,
        separation: -32.0,
    }
}
