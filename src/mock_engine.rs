use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::classifier::{Classifier, Detection};
use crate::engine::{AudioCapture, AudioWindow, expected_samples};
use crate::error::SoundwatchError;

/// Scripted capture engine for testing the monitor without audio hardware.
///
/// Each queued entry answers one `record_window` call: `Some(amplitude)`
/// produces a complete window filled with that amplitude, `None` simulates
/// a device failure. An exhausted script produces silent windows.
pub struct MockCaptureEngine {
    sample_rate: u32,
    script: VecDeque<Option<f32>>,
    calls: u32,
    open: bool,
    overlap_detected: bool,
    stop_after: Option<(u32, Arc<AtomicBool>)>,
}

impl MockCaptureEngine {
    pub fn new(sample_rate: u32) -> Self {
        MockCaptureEngine {
            sample_rate,
            script: VecDeque::new(),
            calls: 0,
            open: false,
            overlap_detected: false,
            stop_after: None,
        }
    }

    /// Queue a successful window filled with `amplitude`.
    pub fn push_window(&mut self, amplitude: f32) {
        self.script.push_back(Some(amplitude));
    }

    /// Queue a simulated device failure.
    pub fn push_failure(&mut self) {
        self.script.push_back(None);
    }

    /// Clear `running` once `calls` windows have been requested, so `run`
    /// loops can terminate in tests.
    pub fn stop_after(&mut self, calls: u32, running: Arc<AtomicBool>) {
        self.stop_after = Some((calls, running));
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn overlap_detected(&self) -> bool {
        self.overlap_detected
    }
}

impl AudioCapture for MockCaptureEngine {
    fn record_window(&mut self, duration: Duration) -> Result<AudioWindow, SoundwatchError> {
        if self.open {
            self.overlap_detected = true;
        }
        self.open = true;
        self.calls += 1;

        if let Some((limit, running)) = &self.stop_after
            && self.calls >= *limit
        {
            running.store(false, Ordering::SeqCst);
        }

        let entry = self.script.pop_front().unwrap_or(Some(0.0));
        // The stream is stopped before the window is handed off, error or not
        self.open = false;

        match entry {
            Some(amplitude) => Ok(AudioWindow {
                samples: vec![amplitude; expected_samples(duration, self.sample_rate)],
                sample_rate: self.sample_rate,
            }),
            None => Err(SoundwatchError::Stream(
                "simulated device failure".to_string(),
            )),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Scripted classifier for testing the decision logic.
pub struct MockClassifier {
    /// Per-call results; `Err(())` simulates a classifier failure. An
    /// exhausted script repeats the last configured constant score.
    script: Mutex<VecDeque<Result<f32, ()>>>,
    fallback: f32,
}

impl MockClassifier {
    /// A classifier that always returns `score`.
    pub fn constant(score: f32) -> Self {
        MockClassifier {
            script: Mutex::new(VecDeque::new()),
            fallback: score,
        }
    }

    /// A classifier that plays back `results` in order, then returns 0.
    pub fn scripted(results: Vec<Result<f32, ()>>) -> Self {
        MockClassifier {
            script: Mutex::new(results.into()),
            fallback: 0.0,
        }
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _samples: &[f32], _sample_rate: u32) -> Result<Detection, SoundwatchError> {
        let entry = self
            .script
            .lock()
            .expect("mock classifier script poisoned")
            .pop_front();
        match entry {
            Some(Ok(score)) => Ok(Detection::new(
                score,
                vec![("mock event".to_string(), score)],
            )),
            Some(Err(())) => Err(SoundwatchError::Classifier(
                "simulated classifier failure".to_string(),
            )),
            None => Ok(Detection::new(self.fallback, Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_engine_leaves_stream_closed_and_reopenable() {
        let mut engine = MockCaptureEngine::new(8000);
        engine.push_failure();
        engine.push_window(0.2);

        let duration = Duration::from_millis(10);
        assert!(engine.record_window(duration).is_err());
        assert!(!engine.is_open());

        // A subsequent window succeeds on the same engine
        let window = engine.record_window(duration).unwrap();
        assert_eq!(window.len(), expected_samples(duration, 8000));
        assert!(!engine.is_open());
    }

    #[test]
    fn test_mock_window_matches_requested_duration() {
        let mut engine = MockCaptureEngine::new(44_100);
        engine.push_window(0.0);
        let window = engine.record_window(Duration::from_secs(5)).unwrap();
        assert_eq!(window.len(), 220_500);
        assert_eq!(window.sample_rate, 44_100);
    }

    #[test]
    fn test_scripted_classifier_plays_back_in_order() {
        let classifier = MockClassifier::scripted(vec![Ok(0.9), Err(()), Ok(0.1)]);
        assert!((classifier.classify(&[], 8000).unwrap().score - 0.9).abs() < f32::EPSILON);
        assert!(classifier.classify(&[], 8000).is_err());
        assert!((classifier.classify(&[], 8000).unwrap().score - 0.1).abs() < f32::EPSILON);
        // Exhausted script falls back to the constant
        assert_eq!(classifier.classify(&[], 8000).unwrap().score, 0.0);
    }
}
