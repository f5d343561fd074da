pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_WINDOW_SECS: f64 = 5.0;
pub const DEFAULT_METER_WIDTH: usize = 40;
pub const DEFAULT_DB_MIN: f32 = -60.0;
pub const DEFAULT_DB_MAX: f32 = 0.0;
pub const DEFAULT_THRESHOLD: f32 = 0.2;
pub const DEFAULT_OUTPUT_DIR: &str = "recordings";
pub const DEFAULT_BACKOFF_MS: u64 = 1000;
pub const DEFAULT_COOLDOWN_WINDOWS: u32 = 0;
pub const DEFAULT_DEBUG: bool = false;

/// Callback block size as a fraction of a second (100 ms blocks).
pub const BLOCK_SECS: f64 = 0.1;

/// Extra ring buffer headroom beyond one window, in seconds.
pub const BUFFER_SLACK_SECS: u32 = 1;
