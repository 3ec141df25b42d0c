pub mod fix;
pub mod timestamp;

pub use fix::{Fix, FixMode, FixStatus};
pub use timestamp::unix_time_secs;
