//! # Playback Error Types
//!
//! Errors returned synchronously by the registry and audio buffer APIs.
//! Failures of play/pause requests travel through the request itself as
//! [`MediaException`](bridge_traits::MediaException)s instead.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Audio Buffer Errors
    // ========================================================================
    /// No audio buffer is registered under the name.
    #[error("Audio buffer not found: {0}")]
    AudioBufferNotFound(String),

    /// Audio buffers need room for at least one sample.
    #[error("Invalid audio buffer capacity: {0} (must be greater than 0)")]
    InvalidCapacity(usize),

    /// Sample rate is zero, or not lower than the current rate when
    /// down-sampling.
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Channel count is zero or a single frame does not fit the buffer.
    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(u16),

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// Configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    /// A platform bridge call failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if the error comes from the audio buffer API.
    pub fn is_buffer_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::AudioBufferNotFound(_)
                | PlaybackError::InvalidCapacity(_)
                | PlaybackError::InvalidSampleRate(_)
                | PlaybackError::InvalidChannelCount(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_error_classification() {
        assert!(PlaybackError::AudioBufferNotFound("mic".into()).is_buffer_error());
        assert!(PlaybackError::InvalidSampleRate(0).is_buffer_error());
        assert!(!PlaybackError::Bridge(BridgeError::NotAvailable("remote".into())).is_buffer_error());
    }

    #[test]
    fn test_bridge_error_converts() {
        let err: PlaybackError = BridgeError::OperationFailed("start".into()).into();
        assert!(err.to_string().starts_with("Bridge error:"));
    }
}
