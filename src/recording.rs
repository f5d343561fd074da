use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::debug;

use crate::engine::AudioWindow;
use crate::error::SoundwatchError;

/// Returns an event file name like `event_20240115_143005.wav`.
pub fn event_filename(timestamp: DateTime<Local>) -> String {
    format!("event_{}.wav", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Returns a `.part` temporary path for the given final path.
fn tmp_path(final_path: &Path) -> PathBuf {
    let mut tmp = final_path.as_os_str().to_owned();
    tmp.push(".part");
    PathBuf::from(tmp)
}

/// Encode a window as a 16-bit mono PCM WAV file under `dir`.
///
/// The destination directory is created if absent. Samples are written to a
/// temporary `.part` file which is renamed into place once the writer has
/// been finalized, so a failure never leaves a partial `.wav` behind.
pub fn save_window(
    window: &AudioWindow,
    dir: &str,
    filename: &str,
) -> Result<PathBuf, SoundwatchError> {
    let dir = Path::new(dir);
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let final_path = dir.join(filename);
    let tmp = tmp_path(&final_path);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: window.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let result = write_samples(&tmp, spec, &window.samples);
    if let Err(e) = result {
        // Best effort: don't leave the partial file around
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, &final_path)?;
    debug!(
        "Saved {} samples at {} Hz to {}",
        window.samples.len(),
        window.sample_rate,
        final_path.display()
    );

    Ok(final_path)
}

fn write_samples(
    path: &Path,
    spec: hound::WavSpec,
    samples: &[f32],
) -> Result<(), SoundwatchError> {
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| SoundwatchError::Wav(format!("Failed to create WAV file: {}", e)))?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer
            .write_sample(value)
            .map_err(|e| SoundwatchError::Wav(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| SoundwatchError::Wav(format!("Failed to finalize WAV file: {}", e)))?;

    Ok(())
}
