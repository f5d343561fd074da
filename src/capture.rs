use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Single-producer/single-consumer hand-off buffer for one recording window.
///
/// Built on a lock-free `rtrb` ring buffer: the cpal callback owns the
/// [`ChunkProducer`] half and pushes sample chunks without blocking or
/// allocating; the control loop owns the [`CaptureBuffer`] half and drains
/// it once the stream has been stopped. The ring buffer provides the
/// happens-before edge for the hand-off, so every chunk pushed before the
/// stream stopped is visible to `drain_all`.
///
/// A fresh pair is created for every window, which is what resets the
/// accumulator between windows.
pub struct CaptureBuffer {
    consumer: rtrb::Consumer<f32>,
    dropped: Arc<AtomicU64>,
}

/// The producer half, moved into the audio callback.
pub struct ChunkProducer {
    producer: rtrb::Producer<f32>,
    dropped: Arc<AtomicU64>,
}

impl CaptureBuffer {
    /// Create a producer/consumer pair with room for `capacity` samples.
    pub fn pair(capacity: usize) -> (ChunkProducer, CaptureBuffer) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        (
            ChunkProducer {
                producer,
                dropped: Arc::clone(&dropped),
            },
            CaptureBuffer { consumer, dropped },
        )
    }

    /// Take ownership of every sample pushed so far, in push order, leaving
    /// the buffer empty.
    pub fn drain_all(&mut self) -> Vec<f32> {
        let available = self.consumer.slots();
        if available == 0 {
            return Vec::new();
        }
        self.consumer.read_chunk(available).map_or_else(
            |_| Vec::new(),
            |chunk| {
                let mut samples = Vec::with_capacity(chunk.len());
                let (first, second) = chunk.as_slices();
                samples.extend_from_slice(first);
                samples.extend_from_slice(second);
                chunk.commit_all();
                samples
            },
        )
    }

    /// Discard any accumulated samples without returning them (abort path).
    pub fn reset(&mut self) {
        let _ = self.drain_all();
    }

    /// Number of samples dropped because the buffer was full.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ChunkProducer {
    /// Append a chunk of samples. Wait-free: if the ring does not have room
    /// for the whole chunk it is dropped and counted, never blocked on.
    pub fn push(&mut self, samples: &[f32]) {
        self.push_iter(samples.len(), samples.iter().copied());
    }

    /// Append `len` samples from an iterator without intermediate
    /// allocation (used to pull one channel out of interleaved frames).
    pub fn push_iter<I>(&mut self, len: usize, samples: I)
    where
        I: Iterator<Item = f32>,
    {
        match self.producer.write_chunk_uninit(len) {
            Ok(chunk) => {
                chunk.fill_from_iter(samples);
            }
            Err(_) => {
                // Ring buffer full — drop the chunk, count the loss
                self.dropped.fetch_add(len as u64, Ordering::Relaxed);
            }
        }
    }

    /// Number of samples dropped because the buffer was full.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_push_order() {
        let (mut producer, mut buffer) = CaptureBuffer::pair(1024);

        let chunks: Vec<Vec<f32>> = vec![
            vec![0.1, 0.2, 0.3],
            vec![0.4],
            vec![0.5, 0.6],
            vec![0.7, 0.8, 0.9, 1.0],
        ];
        for chunk in &chunks {
            producer.push(chunk);
        }

        let drained = buffer.drain_all();
        let expected: Vec<f32> = chunks.into_iter().flatten().collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn test_second_drain_is_empty() {
        let (mut producer, mut buffer) = CaptureBuffer::pair(64);
        producer.push(&[1.0, 2.0, 3.0]);

        assert_eq!(buffer.drain_all().len(), 3);
        assert!(buffer.drain_all().is_empty());
    }

    #[test]
    fn test_reset_discards_samples() {
        let (mut producer, mut buffer) = CaptureBuffer::pair(64);
        producer.push(&[1.0; 16]);

        buffer.reset();
        assert!(buffer.drain_all().is_empty());
    }

    #[test]
    fn test_overflow_drops_whole_chunk_and_counts() {
        let (mut producer, mut buffer) = CaptureBuffer::pair(8);

        producer.push(&[1.0; 6]);
        // Does not fit — dropped entirely, earlier samples untouched
        producer.push(&[2.0; 4]);

        assert_eq!(producer.dropped_samples(), 4);
        assert_eq!(buffer.dropped_samples(), 4);

        let drained = buffer.drain_all();
        assert_eq!(drained, vec![1.0; 6]);
    }

    #[test]
    fn test_push_iter_from_interleaved() {
        let (mut producer, mut buffer) = CaptureBuffer::pair(64);

        // Two interleaved channels; take channel 0
        let interleaved = [0.1f32, 9.0, 0.2, 9.0, 0.3, 9.0];
        let frames = interleaved.len() / 2;
        producer.push_iter(frames, interleaved.iter().step_by(2).copied());

        assert_eq!(buffer.drain_all(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_push_visible_across_threads() {
        let (mut producer, mut buffer) = CaptureBuffer::pair(4096);

        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                producer.push(&[i as f32; 10]);
            }
            producer
        });
        let producer = handle.join().unwrap();
        drop(producer);

        let drained = buffer.drain_all();
        assert_eq!(drained.len(), 1000);
        assert_eq!(drained[0], 0.0);
        assert_eq!(drained[999], 99.0);
    }
}
