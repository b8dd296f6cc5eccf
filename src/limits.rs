use crate::model::Ms;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;

/// 2200-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;

/// A single recording longer than a week is treated as a bad request.
pub const MAX_RECORDING_DURATION_MS: Ms = 7 * 24 * 3_600_000;

pub const MAX_TUNER_COUNT: u32 = 64;

pub const MAX_LIVE_SCHEDULES_PER_INPUT: usize = 10_000;
