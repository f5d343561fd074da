use std::io::Write;

use crate::config::AppConfig;
use crate::constants::{DEFAULT_DB_MAX, DEFAULT_DB_MIN, DEFAULT_METER_WIDTH};

/// Level above which the meter is considered "hot" (dB).
const HOT_DB: f32 = -10.0;
/// Level above which the meter is considered "warm" (dB).
const WARM_DB: f32 = -20.0;

const CHAR_FULL: char = '#';
const CHAR_EMPTY: char = '-';
const CHAR_PEAK: char = '|';

/// Urgency banding for the rendered meter. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterBand {
    Hot,
    Warm,
    Calm,
}

impl MeterBand {
    const fn ansi_color(self) -> &'static str {
        match self {
            MeterBand::Hot => "\x1b[91m",
            MeterBand::Warm => "\x1b[93m",
            MeterBand::Calm => "\x1b[92m",
        }
    }
}

/// Console VU meter: converts sample blocks to a decibel level and renders
/// a fixed-width ASCII gauge.
///
/// Both `level_db` and `render` are pure; writing to the terminal is left to
/// [`LevelMeter::draw`] so the computation stays testable.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    width: usize,
    db_min: f32,
    db_max: f32,
}

impl Default for LevelMeter {
    fn default() -> Self {
        LevelMeter {
            width: DEFAULT_METER_WIDTH,
            db_min: DEFAULT_DB_MIN,
            db_max: DEFAULT_DB_MAX,
        }
    }
}

impl LevelMeter {
    pub fn new(width: usize, db_min: f32, db_max: f32) -> Self {
        LevelMeter {
            width,
            db_min,
            db_max,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.get_meter_width(),
            config.get_db_min(),
            config.get_db_max(),
        )
    }

    pub const fn db_min(&self) -> f32 {
        self.db_min
    }

    pub const fn db_max(&self) -> f32 {
        self.db_max
    }

    /// Compute the RMS level of `samples` in decibels, clamped to the
    /// configured range.
    ///
    /// Empty input and all-zero input both return `db_min`; silence must
    /// never produce `-inf` or NaN.
    pub fn level_db(&self, samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return self.db_min;
        }

        let sum_of_squares: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        let rms = (sum_of_squares / samples.len() as f64).sqrt();

        if rms <= 0.0 {
            return self.db_min;
        }

        let db = 20.0 * rms.log10() as f32;
        db.clamp(self.db_min, self.db_max)
    }

    /// Urgency band for a (clamped) dB value.
    pub fn band(&self, db: f32) -> MeterBand {
        let db = db.clamp(self.db_min, self.db_max);
        if db > HOT_DB {
            MeterBand::Hot
        } else if db > WARM_DB {
            MeterBand::Warm
        } else {
            MeterBand::Calm
        }
    }

    /// Render a dB value as a fixed-width gauge string.
    ///
    /// The output length is constant for a given meter width regardless of
    /// the level: `db_min` renders no filled segments, `db_max` fills all.
    pub fn render(&self, db: f32) -> String {
        let db = db.clamp(self.db_min, self.db_max);
        let normalized = (db - self.db_min) / (self.db_max - self.db_min);
        let filled = (normalized * self.width as f32) as usize;
        let filled = filled.min(self.width);

        let mut gauge = String::with_capacity(self.width);
        for _ in 0..filled {
            gauge.push(CHAR_FULL);
        }
        for _ in filled..self.width {
            gauge.push(CHAR_EMPTY);
        }

        format!(
            "{:>6.1} dB {}{}{} {:.0}",
            db, CHAR_PEAK, gauge, CHAR_PEAK, self.db_max
        )
    }

    /// Render with the band's ANSI color applied.
    pub fn render_colored(&self, db: f32) -> String {
        let band = self.band(db);
        format!("{}{}\x1b[0m", band.ansi_color(), self.render(db))
    }

    /// Redraw the meter in place on stdout.
    ///
    /// Uses a carriage return so successive draws overwrite the same line.
    pub fn draw(&self, db: f32) {
        print!("\r{}", self.render_colored(db));
        let _ = std::io::stdout().flush();
    }
}
