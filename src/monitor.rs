use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, error, info};

use crate::classifier::{Classifier, Detection};
use crate::config::AppConfig;
use crate::engine::{AudioCapture, AudioWindow};
use crate::error::SoundwatchError;
use crate::recording::{event_filename, save_window};

/// States of one detection cycle.
#[derive(Debug)]
enum MonitorState {
    Idle,
    Capturing,
    Classifying(AudioWindow),
    Deciding(AudioWindow, Detection),
}

/// The detection orchestrator: capture a window, score it, persist it if the
/// score clears the threshold, repeat.
///
/// Generic over the capture engine and classifier seams so the loop can be
/// exercised without hardware or a model. Every per-window failure is
/// recovered with a logged backoff; only an external shutdown signal ends
/// the loop, and only at a window boundary.
pub struct Monitor<E: AudioCapture, C: Classifier> {
    engine: E,
    classifier: C,
    window: Duration,
    threshold: f32,
    backoff: Duration,
    output_dir: String,
    /// Windows to suppress persistence for after a detection (0 = off).
    cooldown_windows: u32,
    cooldown_remaining: u32,
}

impl<E: AudioCapture, C: Classifier> Monitor<E, C> {
    pub fn new(engine: E, classifier: C, config: &AppConfig) -> Self {
        Monitor {
            engine,
            classifier,
            window: Duration::from_secs_f64(config.get_window_secs()),
            threshold: config.get_threshold(),
            backoff: Duration::from_millis(config.get_backoff_ms()),
            output_dir: config.get_output_dir(),
            cooldown_windows: config.get_cooldown_windows(),
            cooldown_remaining: 0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run the monitoring loop until `running` is cleared.
    ///
    /// Shutdown is honored at window boundaries only; the engine is closed
    /// before returning.
    pub fn run(&mut self, running: &AtomicBool) {
        info!("Monitoring audio (threshold {:.2})...", self.threshold);

        while running.load(Ordering::SeqCst) {
            match self.cycle() {
                Ok(Some(path)) => {
                    info!("Saved event recording to {}", path.display());
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Error in monitoring loop: {}", e);
                    info!("Retrying after backoff...");
                    thread::sleep(self.backoff);
                }
            }
        }

        self.engine.close();
        info!("Monitor stopped");
    }

    /// Drive one full detection cycle: Idle -> Capturing -> Classifying ->
    /// Deciding -> Idle. Returns the saved path on a persisted detection.
    pub fn cycle(&mut self) -> Result<Option<PathBuf>, SoundwatchError> {
        let mut state = MonitorState::Idle;
        loop {
            state = match state {
                MonitorState::Idle => MonitorState::Capturing,
                MonitorState::Capturing => {
                    let window = self.engine.record_window(self.window)?;
                    MonitorState::Classifying(window)
                }
                MonitorState::Classifying(window) => {
                    let detection = self
                        .classifier
                        .classify(&window.samples, window.sample_rate)?;
                    MonitorState::Deciding(window, detection)
                }
                MonitorState::Deciding(window, detection) => {
                    return self.decide(&window, &detection);
                }
            };
        }
    }

    fn decide(
        &mut self,
        window: &AudioWindow,
        detection: &Detection,
    ) -> Result<Option<PathBuf>, SoundwatchError> {
        println!("Detection score: {:.3}", detection.score);
        detection.log_top_classes();

        if self.cooldown_remaining > 0 {
            self.cooldown_remaining -= 1;
            if detection.score > self.threshold {
                debug!(
                    "Detection suppressed (cooldown, {} windows remaining)",
                    self.cooldown_remaining
                );
            }
            return Ok(None);
        }

        if detection.score <= self.threshold {
            return Ok(None);
        }

        let filename = event_filename(detection.timestamp);
        let path = save_window(window, &self.output_dir, &filename)?;
        info!(
            "Sound event detected (score {:.3}), saved to {}",
            detection.score,
            path.display()
        );
        self.cooldown_remaining = self.cooldown_windows;

        Ok(Some(path))
    }
}
