// soundwatch: continuous microphone monitoring with sound-event detection.
//
// The pipeline: a cpal input stream pushes sample chunks into a lock-free
// hand-off buffer and redraws a console level meter; the monitoring loop
// drains one fixed-duration window at a time, scores it with a classifier,
// and persists windows that clear the detection threshold as WAV files.

mod capture;
mod classifier;
mod config;
mod constants;
mod engine;
mod error;
mod meter;
mod monitor;
mod recording;

// Only include mocks in test builds
#[cfg(test)]
pub mod mock_engine;

// Re-exports for public API
pub use capture::{CaptureBuffer, ChunkProducer};
pub use classifier::{Classifier, Detection, EnergyClassifier};
pub use config::AppConfig;
pub use constants::*;
pub use engine::{AudioCapture, AudioWindow, CpalCaptureEngine, expected_samples};
pub use error::SoundwatchError;
pub use meter::{LevelMeter, MeterBand};
pub use monitor::Monitor;
pub use recording::{event_filename, save_window};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_engine::{MockCaptureEngine, MockClassifier};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn config_for(dir: &Path, window_secs: f64) -> AppConfig {
        let mut config = AppConfig::default();
        config.output_dir = Some(dir.to_str().unwrap().to_string());
        config.window_secs = Some(window_secs);
        config.backoff_ms = Some(1);
        config
    }

    fn wav_files(dir: &Path) -> Vec<std::path::PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "wav"))
            .collect()
    }

    #[test]
    fn test_silent_window_end_to_end_writes_nothing() {
        let temp_dir = tempdir().unwrap();
        let config = config_for(temp_dir.path(), 5.0);

        let mut engine = MockCaptureEngine::new(44_100);
        engine.push_window(0.0);
        // The real energy classifier scores silence at 0.0
        let mut monitor = Monitor::new(engine, EnergyClassifier::new(), &config);

        let result = monitor.cycle().unwrap();
        assert!(result.is_none());
        assert!(wav_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_detection_end_to_end_writes_expected_wav() {
        let temp_dir = tempdir().unwrap();
        let config = config_for(temp_dir.path(), 5.0);
        let sample_rate = 44_100u32;

        let mut engine = MockCaptureEngine::new(sample_rate);
        engine.push_window(0.5);
        let classifier = MockClassifier::constant(0.9);

        let mut monitor = Monitor::new(engine, classifier, &config);
        let path = monitor.cycle().unwrap().expect("window should be saved");

        let files = wav_files(temp_dir.path());
        assert_eq!(files.len(), 1);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, sample_rate);
        assert_eq!(reader.len(), 5 * sample_rate);
    }

    #[test]
    fn test_loud_window_scores_above_default_threshold() {
        // A window with a strong transient clears the default 0.2 threshold
        // through the real energy classifier end to end.
        let temp_dir = tempdir().unwrap();
        let config = config_for(temp_dir.path(), 1.0);

        let mut engine = MockCaptureEngine::new(8000);
        engine.push_window(0.8);
        let mut monitor = Monitor::new(engine, EnergyClassifier::new(), &config);

        assert!(monitor.cycle().unwrap().is_some());
        assert_eq!(wav_files(temp_dir.path()).len(), 1);
    }

    #[test]
    fn test_loop_recovers_from_one_bad_window() {
        let temp_dir = tempdir().unwrap();
        let config = config_for(temp_dir.path(), 1.0);

        let mut engine = MockCaptureEngine::new(8000);
        engine.push_failure();
        engine.push_window(0.5);
        let classifier = MockClassifier::constant(0.9);

        let mut monitor = Monitor::new(engine, classifier, &config);
        assert!(monitor.cycle().is_err());
        assert!(monitor.cycle().unwrap().is_some());
        assert_eq!(wav_files(temp_dir.path()).len(), 1);
    }
}
