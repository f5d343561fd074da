use chrono::{DateTime, Local};
use log::debug;

use crate::error::SoundwatchError;

/// Result of scoring one audio window.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Event score in `[0, 1]`.
    pub score: f32,
    /// Highest-scoring class labels, best first. Used for debug logging only.
    pub top_classes: Vec<(String, f32)>,
    /// When the window was scored.
    pub timestamp: DateTime<Local>,
}

impl Detection {
    pub fn new(score: f32, top_classes: Vec<(String, f32)>) -> Self {
        Detection {
            score: score.clamp(0.0, 1.0),
            top_classes,
            timestamp: Local::now(),
        }
    }

    /// Log the top detected classes (mirrors the per-window debug output of
    /// the pretrained model path).
    pub fn log_top_classes(&self) {
        for (label, score) in &self.top_classes {
            debug!("{}: {:.3}", label, score);
        }
    }
}

/// Sound-event scoring seam.
///
/// The monitor treats the classifier as an opaque scoring function; any
/// model that can turn a mono sample window into a score in `[0, 1]` can be
/// plugged in here. Implementations must accept arbitrary sample rates
/// (resampling internally if needed) and must return a zero score for empty
/// input rather than failing.
pub trait Classifier {
    fn classify(&self, samples: &[f32], sample_rate: u32) -> Result<Detection, SoundwatchError>;
}

/// Baseline classifier scoring windows by short-frame acoustic energy.
///
/// Frames the window into 100 ms frames and maps the loudest frame's RMS
/// level onto `[0, 1]` over a -60..0 dB range, so brief loud transients
/// score high while steady room noise scores low. A stand-in for a real
/// pretrained model behind the same trait.
#[derive(Debug, Clone, Default)]
pub struct EnergyClassifier;

const FRAME_SECS: f64 = 0.1;
const FLOOR_DB: f32 = -60.0;

impl EnergyClassifier {
    pub fn new() -> Self {
        EnergyClassifier
    }

    fn frame_rms(frame: &[f32]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        let sum: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        (sum / frame.len() as f64).sqrt() as f32
    }

    fn rms_to_score(rms: f32) -> f32 {
        if rms <= 0.0 {
            return 0.0;
        }
        let db = (20.0 * rms.log10()).clamp(FLOOR_DB, 0.0);
        (db - FLOOR_DB) / -FLOOR_DB
    }
}

impl Classifier for EnergyClassifier {
    fn classify(&self, samples: &[f32], sample_rate: u32) -> Result<Detection, SoundwatchError> {
        if samples.is_empty() || sample_rate == 0 {
            return Ok(Detection::new(0.0, Vec::new()));
        }

        let frame_len = ((f64::from(sample_rate) * FRAME_SECS) as usize).max(1);

        let mut peak = 0.0f32;
        let mut sum = 0.0f32;
        let mut frames = 0u32;
        for frame in samples.chunks(frame_len) {
            let score = Self::rms_to_score(Self::frame_rms(frame));
            peak = peak.max(score);
            sum += score;
            frames += 1;
        }
        let average = sum / frames as f32;

        let top_classes = vec![
            ("peak energy".to_string(), peak),
            ("average energy".to_string(), average),
        ];

        Ok(Detection::new(peak, top_classes))
    }
}
