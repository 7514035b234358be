//! # Audio Buffer
//!
//! Fixed-capacity store for the most recent frame of PCM samples, with a
//! list of callbacks fired every time a frame arrives.
//!
//! ## Design
//!
//! - **Capacity**: fixed at creation, in samples (not frames)
//! - **Overwrite Policy**: a frame larger than the capacity keeps its most
//!   recent whole frames
//! - **Callbacks**: fired once per [`copy_from`](AudioBuffer::copy_from),
//!   outside any lock, so a callback may read the buffer, down-sample it, or
//!   add and remove callbacks. Additions and removals made while callbacks
//!   run take effect once the pass is over.
//!
//! ## Usage
//!
//! ```rust
//! use core_playback::audio_buffer::AudioBuffer;
//! use std::sync::Arc;
//!
//! let buffer = AudioBuffer::new(8).unwrap();
//! buffer.add_callback(Arc::new(|buffer: &AudioBuffer| {
//!     let mut samples = [0.0f32; 8];
//!     let copied = buffer.copy_to(&mut samples);
//!     assert_eq!(copied, 4);
//! }));
//!
//! // Two stereo frames.
//! buffer.copy_from(44_100, 2, &[0.1, -0.1, 0.2, -0.2]).unwrap();
//! ```

use crate::error::{PlaybackError, Result};
use crate::listeners::{DeferredList, ListenerId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Handle returned by [`AudioBuffer::add_callback`].
pub type CallbackId = ListenerId;

/// Receives every frame copied into an [`AudioBuffer`].
pub trait AudioBufferCallback: Send + Sync {
    fn frame_received(&self, buffer: &AudioBuffer);
}

impl<F> AudioBufferCallback for F
where
    F: Fn(&AudioBuffer) + Send + Sync,
{
    fn frame_received(&self, buffer: &AudioBuffer) {
        self(buffer)
    }
}

struct Frame {
    samples: Vec<f32>,
    size: usize,
    sample_rate: u32,
    channels: u16,
}

pub struct AudioBuffer {
    capacity: usize,
    frame: Mutex<Frame>,
    callbacks: DeferredList<Arc<dyn AudioBufferCallback>>,
}

impl AudioBuffer {
    /// Create a buffer holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PlaybackError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            frame: Mutex::new(Frame {
                samples: vec![0.0; capacity],
                size: 0,
                sample_rate: 0,
                channels: 0,
            }),
            callbacks: DeferredList::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples in the current frame.
    pub fn size(&self) -> usize {
        self.frame.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Sample rate of the current frame, 0 before the first frame.
    pub fn sample_rate(&self) -> u32 {
        self.frame.lock().sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.frame.lock().channels
    }

    /// Replace the contents with `samples` (interleaved) and fire callbacks.
    ///
    /// A trailing partial frame is dropped. If the samples do not fit, only
    /// the most recent whole frames are kept.
    pub fn copy_from(&self, sample_rate: u32, channels: u16, samples: &[f32]) -> Result<()> {
        if sample_rate == 0 {
            return Err(PlaybackError::InvalidSampleRate(sample_rate));
        }
        let width = usize::from(channels);
        if width == 0 || width > self.capacity {
            return Err(PlaybackError::InvalidChannelCount(channels));
        }

        {
            let whole = samples.len() / width * width;
            let kept = whole.min(self.capacity / width * width);
            let source = &samples[whole - kept..whole];

            let mut frame = self.frame.lock();
            frame.samples[..kept].copy_from_slice(source);
            frame.size = kept;
            frame.sample_rate = sample_rate;
            frame.channels = channels;
        }

        let fired = self
            .callbacks
            .for_each(|_, callback| callback.frame_received(self));
        trace!(sample_rate, channels, fired, "audio frame received");
        Ok(())
    }

    /// Copy the current frame into `dest`. Returns the number of samples copied.
    pub fn copy_to(&self, dest: &mut [f32]) -> usize {
        let frame = self.frame.lock();
        let count = frame.size.min(dest.len());
        dest[..count].copy_from_slice(&frame.samples[..count]);
        count
    }

    pub fn to_vec(&self) -> Vec<f32> {
        let frame = self.frame.lock();
        frame.samples[..frame.size].to_vec()
    }

    /// Discard the current frame. Sample rate and channels are kept.
    pub fn clear(&self) {
        self.frame.lock().size = 0;
    }

    /// Resample the current frame in place to `target_rate`.
    ///
    /// Each output frame averages the source frames it covers, channel by
    /// channel. Meant to be called from a callback before `copy_to`.
    pub fn down_sample(&self, target_rate: u32) -> Result<()> {
        let mut frame = self.frame.lock();
        let rate = frame.sample_rate;
        if target_rate == 0 || target_rate >= rate {
            return Err(PlaybackError::InvalidSampleRate(target_rate));
        }

        let width = usize::from(frame.channels);
        let frames = frame.size / width;
        let out_frames = (frames as u64 * u64::from(target_rate) / u64::from(rate)) as usize;
        let mut sums = vec![0.0f32; width];

        for out in 0..out_frames {
            let start = (out as u64 * u64::from(rate) / u64::from(target_rate)) as usize;
            let end = (((out as u64 + 1) * u64::from(rate) / u64::from(target_rate)) as usize)
                .clamp(start + 1, frames);

            sums.iter_mut().for_each(|sum| *sum = 0.0);
            for source in start..end {
                for (channel, sum) in sums.iter_mut().enumerate() {
                    *sum += frame.samples[source * width + channel];
                }
            }
            // Output frame `out` never lies past source frame `start`.
            let count = (end - start) as f32;
            for (channel, sum) in sums.iter().enumerate() {
                frame.samples[out * width + channel] = sum / count;
            }
        }

        frame.size = out_frames * width;
        frame.sample_rate = target_rate;
        Ok(())
    }

    /// Register `callback`. Added during a pass, it first fires on the next frame.
    pub fn add_callback(&self, callback: Arc<dyn AudioBufferCallback>) -> CallbackId {
        self.callbacks.add(callback)
    }

    /// Unregister a callback. Removed during a pass, it is skipped for the
    /// rest of that pass.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        self.callbacks.remove(id)
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.frame.lock();
        f.debug_struct("AudioBuffer")
            .field("capacity", &self.capacity)
            .field("size", &frame.size)
            .field("sample_rate", &frame.sample_rate)
            .field("channels", &frame.channels)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            AudioBuffer::new(0),
            Err(PlaybackError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_copy_from_and_to() {
        let buffer = AudioBuffer::new(8).unwrap();
        buffer.copy_from(48_000, 2, &[0.1, 0.2, 0.3, 0.4]).unwrap();

        assert_eq!(buffer.size(), 4);
        assert_eq!(buffer.sample_rate(), 48_000);
        assert_eq!(buffer.channels(), 2);

        let mut out = [0.0f32; 3];
        assert_eq!(buffer.copy_to(&mut out), 3);
        assert_eq!(out, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_oversized_frame_keeps_latest_whole_frames() {
        let buffer = AudioBuffer::new(5).unwrap();
        buffer
            .copy_from(8_000, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0])
            .unwrap();

        // 3 whole stereo frames, room for 2.
        assert_eq!(buffer.to_vec(), vec![2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn test_invalid_frames_rejected() {
        let buffer = AudioBuffer::new(4).unwrap();
        assert!(matches!(
            buffer.copy_from(0, 1, &[0.0]),
            Err(PlaybackError::InvalidSampleRate(0))
        ));
        assert!(matches!(
            buffer.copy_from(8_000, 0, &[0.0]),
            Err(PlaybackError::InvalidChannelCount(0))
        ));
        assert!(matches!(
            buffer.copy_from(8_000, 6, &[0.0; 6]),
            Err(PlaybackError::InvalidChannelCount(6))
        ));
    }

    #[test]
    fn test_down_sample_averages_per_channel() {
        let buffer = AudioBuffer::new(16).unwrap();
        let samples = [1.0, 10.0, 3.0, 30.0, 5.0, 50.0, 7.0, 70.0];
        buffer.copy_from(4, 2, &samples).unwrap();

        buffer.down_sample(2).unwrap();

        assert_eq!(buffer.sample_rate(), 2);
        assert_eq!(buffer.to_vec(), vec![2.0, 20.0, 6.0, 60.0]);
    }

    #[test]
    fn test_down_sample_rejects_upsampling() {
        let buffer = AudioBuffer::new(4).unwrap();
        buffer.copy_from(8_000, 1, &[0.0; 4]).unwrap();
        assert!(buffer.down_sample(8_000).is_err());
        assert!(buffer.down_sample(0).is_err());
        assert!(buffer.down_sample(16_000).is_err());
    }

    #[test]
    fn test_down_sample_from_callback() {
        let buffer = AudioBuffer::new(8).unwrap();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        buffer.add_callback(Arc::new(move |buffer: &AudioBuffer| {
            buffer.down_sample(1_000).unwrap();
            let mut out = vec![0.0f32; buffer.size()];
            buffer.copy_to(&mut out);
            *sink.lock() = out;
        }));

        buffer.copy_from(2_000, 1, &[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert_eq!(*captured.lock(), vec![2.0, 6.0]);
    }

    #[test]
    fn test_callbacks_fire_once_per_frame() {
        let buffer = AudioBuffer::new(4).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = buffer.add_callback(Arc::new(move |_: &AudioBuffer| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        buffer.copy_from(8_000, 1, &[0.0]).unwrap();
        buffer.copy_from(8_000, 1, &[0.0]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(buffer.remove_callback(id));
        buffer.copy_from(8_000, 1, &[0.0]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(buffer.callback_count(), 0);
    }

    #[test]
    fn test_clear_keeps_format() {
        let buffer = AudioBuffer::new(4).unwrap();
        buffer.copy_from(22_050, 1, &[0.5, 0.5]).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.sample_rate(), 22_050);
    }
}
