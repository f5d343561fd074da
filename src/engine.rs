use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use cpal::SampleFormat;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::capture::{CaptureBuffer, ChunkProducer};
use crate::config::AppConfig;
use crate::constants::{BLOCK_SECS, BUFFER_SLACK_SECS};
use crate::error::SoundwatchError;
use crate::meter::LevelMeter;

/// One completed recording window: mono samples at a fixed rate.
#[derive(Debug, Clone)]
pub struct AudioWindow {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioWindow {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Number of samples a complete window of `duration` must contain.
pub fn expected_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

/// The AudioCapture trait is the seam between the monitoring loop and the
/// audio hardware.
///
/// Implementations own the input stream lifecycle and must guarantee that
/// every failure leaves the stream closed and reopenable; retrying is the
/// caller's responsibility.
pub trait AudioCapture {
    /// Capture exactly `duration` worth of samples, blocking the caller
    /// while the hardware callback fills the window.
    fn record_window(&mut self, duration: Duration) -> Result<AudioWindow, SoundwatchError>;

    /// The effective capture rate, after any device-rate adoption.
    fn sample_rate(&self) -> u32;

    /// Stop and close the input stream. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool {
        false
    }
}

/// Microphone capture via the CPAL library.
///
/// The input stream is (re)built for every window. The cpal callback does
/// exactly two things: push the chunk into the window's [`CaptureBuffer`]
/// producer and redraw the level meter. It never blocks on the consumer and
/// never allocates.
pub struct CpalCaptureEngine {
    device: cpal::Device,
    /// Effective sample rate (device-native if it differed from the request).
    sample_rate: u32,
    /// Interleaved channel count of the device's default config.
    channels: usize,
    stream: Option<Box<dyn StreamTrait>>,
    /// Latched by the stream error callback; checked when the window ends.
    stream_error: Arc<AtomicBool>,
    meter: LevelMeter,
    debug: bool,
}

impl CpalCaptureEngine {
    /// Open the default (or configured) input device and negotiate a rate.
    ///
    /// If the device's native rate differs from the configured one, the
    /// native rate is adopted and propagated to every downstream consumer
    /// via [`AudioCapture::sample_rate`]; audio is never processed at a
    /// rate other than the one reported.
    pub fn new(config: &AppConfig) -> Result<Self, SoundwatchError> {
        let host = cpal::default_host();
        let device = Self::find_input_device(&host, config.get_input_device().as_deref())?;

        info!(
            "Using input device: {}",
            device
                .description()
                .map(|d| d.name().to_string())
                .map_err(|e| SoundwatchError::DeviceUnavailable(e.to_string()))?
        );

        let device_config = device.default_input_config().map_err(|e| {
            SoundwatchError::DeviceUnavailable(format!(
                "Failed to get default input stream config: {}",
                e
            ))
        })?;

        debug!("Default input stream config: {:?}", device_config);

        if device_config.sample_format() != SampleFormat::F32 {
            return Err(SoundwatchError::RateUnsupported(format!(
                "device sample format {:?} is not supported",
                device_config.sample_format()
            )));
        }

        let requested = config.get_sample_rate();
        let sample_rate = device_config.sample_rate();
        if sample_rate != requested {
            warn!(
                "Adjusting sample rate from {} to {} (device native)",
                requested, sample_rate
            );
        }

        Ok(CpalCaptureEngine {
            device,
            sample_rate,
            channels: device_config.channels() as usize,
            stream: None,
            stream_error: Arc::new(AtomicBool::new(false)),
            meter: LevelMeter::from_config(config),
            debug: config.get_debug(),
        })
    }

    /// Find an input device by name, or return the default input device.
    fn find_input_device(
        host: &cpal::Host,
        device_name: Option<&str>,
    ) -> Result<cpal::Device, SoundwatchError> {
        if let Some(name) = device_name {
            let devices = host.input_devices().map_err(|e| {
                SoundwatchError::DeviceUnavailable(format!(
                    "Failed to enumerate input devices: {}",
                    e
                ))
            })?;
            for device in devices {
                if let Ok(desc) = device.description()
                    && desc.name() == name
                {
                    return Ok(device);
                }
            }
            warn!("Input device '{}' not found, falling back to default", name);
        }
        host.default_input_device().ok_or_else(|| {
            SoundwatchError::DeviceUnavailable("No input device available".to_string())
        })
    }

    /// List all available input device names.
    pub fn list_input_devices() -> Result<Vec<String>, SoundwatchError> {
        let host = cpal::default_host();
        let devices = host.input_devices().map_err(|e| {
            SoundwatchError::DeviceUnavailable(format!("Failed to enumerate input devices: {}", e))
        })?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(desc) = device.description() {
                names.push(desc.name().to_string());
            }
        }
        Ok(names)
    }

    fn build_stream(
        &self,
        mut producer: ChunkProducer,
        buffer_size: cpal::BufferSize,
    ) -> Result<Box<dyn StreamTrait>, SoundwatchError> {
        let device_config = self.device.default_input_config().map_err(|e| {
            SoundwatchError::Stream(format!("Failed to get input stream config: {}", e))
        })?;

        if device_config.sample_format() != SampleFormat::F32 {
            return Err(SoundwatchError::RateUnsupported(format!(
                "device sample format {:?} is not supported",
                device_config.sample_format()
            )));
        }

        let channels = self.channels.max(1);
        let meter = self.meter.clone();
        let debug = self.debug;

        let stream_error = Arc::clone(&self.stream_error);
        let err_fn = move |err| {
            error!("an error occurred on stream: {}", err);
            stream_error.store(true, Ordering::Release);
        };

        let data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if debug {
                debug!("Processing {} samples", data.len());
            }

            // Exactly two actions: hand the chunk off, update the display.
            if channels == 1 {
                producer.push(data);
            } else {
                let frames = data.len() / channels;
                producer.push_iter(frames, data.iter().step_by(channels).copied());
            }
            let db = meter.level_db(data);
            meter.draw(db);
        };

        let mut stream_config: cpal::StreamConfig = device_config.into();
        stream_config.buffer_size = buffer_size;

        let stream = self
            .device
            .build_input_stream(&stream_config, data_fn, err_fn, None)
            .map_err(|e| SoundwatchError::Stream(format!("Failed to build input stream: {}", e)))?;

        Ok(Box::new(stream))
    }
}

impl AudioCapture for CpalCaptureEngine {
    fn record_window(&mut self, duration: Duration) -> Result<AudioWindow, SoundwatchError> {
        // Never register a second callback on top of an active stream
        if self.stream.is_some() {
            warn!("Stream already active at window start; reopening");
            self.close();
        }
        self.stream_error.store(false, Ordering::Release);

        let expected = expected_samples(duration, self.sample_rate);
        let capacity = expected + (self.sample_rate * BUFFER_SLACK_SECS) as usize;

        // Request 100 ms callback blocks; some backends reject a fixed
        // buffer size, in which case retry with the backend's choice.
        let block_frames = (f64::from(self.sample_rate) * BLOCK_SECS) as cpal::FrameCount;
        let (producer, mut buffer) = CaptureBuffer::pair(capacity);
        let stream = match self.build_stream(producer, cpal::BufferSize::Fixed(block_frames)) {
            Ok(stream) => stream,
            Err(e) => {
                debug!("Fixed block size of {} frames rejected: {}", block_frames, e);
                let (producer, fresh) = CaptureBuffer::pair(capacity);
                buffer = fresh;
                self.build_stream(producer, cpal::BufferSize::Default)?
            }
        };
        stream
            .play()
            .map_err(|e| SoundwatchError::Stream(format!("Failed to start stream: {}", e)))?;
        self.stream = Some(stream);

        // Block for the window plus one callback block so the final chunk
        // lands before the stream is stopped.
        thread::sleep(duration + Duration::from_secs_f64(BLOCK_SECS));

        // Stop-then-drain: dropping the stream stops the callback, after
        // which every pushed chunk is visible to the consumer.
        self.close();
        println!(); // move off the meter line

        let mut samples = buffer.drain_all();

        let dropped = buffer.dropped_samples();
        if dropped > 0 {
            warn!("{} samples dropped during window (buffer overflow)", dropped);
        }

        if self.stream_error.load(Ordering::Acquire) {
            buffer.reset();
            return Err(SoundwatchError::Stream(
                "driver reported an error during the window".to_string(),
            ));
        }

        if samples.len() < expected {
            return Err(SoundwatchError::Stream(format!(
                "window aborted: captured {} of {} samples",
                samples.len(),
                expected
            )));
        }

        samples.truncate(expected);
        Ok(AudioWindow {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn close(&mut self) {
        // Dropping the stream stops it; safe to call repeatedly
        self.stream = None;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalCaptureEngine {
    fn drop(&mut self) {
        self.close();
    }
}
