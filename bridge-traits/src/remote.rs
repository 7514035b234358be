//! Remote control bridge traits.
//!
//! Platforms expose media commands outside the app (lock screen, headset
//! buttons, notification controls). The native [`RemoteControlService`]
//! routes those commands into the process, where they are delivered to at
//! most one [`RemoteControlListener`].

use crate::error::Result;
use std::time::Duration;

/// Receiver for remote media commands.
///
/// Every method defaults to doing nothing, so implementations only override
/// the commands they support.
pub trait RemoteControlListener: Send + Sync {
    fn play(&self) {}

    fn pause(&self) {}

    fn toggle_play_pause(&self) {}

    fn stop(&self) {}

    /// Seek to an absolute position.
    fn seek_to(&self, _position: Duration) {}

    fn fast_forward(&self) {}

    fn rewind(&self) {}

    fn skip_to_next(&self) {}

    fn skip_to_previous(&self) {}
}

/// Native service binding the platform's remote-control surface.
pub trait RemoteControlService: Send + Sync {
    /// Begin routing remote commands to the process.
    fn start(&self) -> Result<()>;

    /// Stop routing remote commands.
    fn stop(&self) -> Result<()>;
}

/// Service for platforms without a remote-control surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRemoteControlService;

impl RemoteControlService for NoopRemoteControlService {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }
}
