//! Routing of remote media commands to the active listener.

use bridge_traits::RemoteControlListener;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub(crate) type ListenerSlot = Arc<RwLock<Option<Arc<dyn RemoteControlListener>>>>;

/// A remote media command, for table-driven platform glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    SeekTo(Duration),
    FastForward,
    Rewind,
    SkipToNext,
    SkipToPrevious,
}

/// Entry point for platform remote-control surfaces.
///
/// Forwards each command verbatim to the listener registered with
/// [`MediaRegistry::set_remote_control_listener`] at the time of the call,
/// or drops it when none is registered.
///
/// [`MediaRegistry::set_remote_control_listener`]: crate::registry::MediaRegistry::set_remote_control_listener
#[derive(Clone)]
pub struct RemoteControlRelay {
    slot: ListenerSlot,
}

impl RemoteControlRelay {
    pub(crate) fn new(slot: ListenerSlot) -> Self {
        Self { slot }
    }

    fn active(&self) -> Option<Arc<dyn RemoteControlListener>> {
        self.slot.read().clone()
    }

    /// Deliver `command`. Returns `false` if it was dropped.
    pub fn dispatch(&self, command: RemoteCommand) -> bool {
        let Some(listener) = self.active() else {
            trace!(?command, "no remote control listener, dropping command");
            return false;
        };

        match command {
            RemoteCommand::Play => listener.play(),
            RemoteCommand::Pause => listener.pause(),
            RemoteCommand::TogglePlayPause => listener.toggle_play_pause(),
            RemoteCommand::Stop => listener.stop(),
            RemoteCommand::SeekTo(position) => listener.seek_to(position),
            RemoteCommand::FastForward => listener.fast_forward(),
            RemoteCommand::Rewind => listener.rewind(),
            RemoteCommand::SkipToNext => listener.skip_to_next(),
            RemoteCommand::SkipToPrevious => listener.skip_to_previous(),
        }
        true
    }
}

impl fmt::Debug for RemoteControlRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteControlRelay")
            .field("active", &self.slot.read().is_some())
            .finish()
    }
}

impl RemoteControlListener for RemoteControlRelay {
    fn play(&self) {
        self.dispatch(RemoteCommand::Play);
    }

    fn pause(&self) {
        self.dispatch(RemoteCommand::Pause);
    }

    fn toggle_play_pause(&self) {
        self.dispatch(RemoteCommand::TogglePlayPause);
    }

    fn stop(&self) {
        self.dispatch(RemoteCommand::Stop);
    }

    fn seek_to(&self, position: Duration) {
        self.dispatch(RemoteCommand::SeekTo(position));
    }

    fn fast_forward(&self) {
        self.dispatch(RemoteCommand::FastForward);
    }

    fn rewind(&self) {
        self.dispatch(RemoteCommand::Rewind);
    }

    fn skip_to_next(&self) {
        self.dispatch(RemoteCommand::SkipToNext);
    }

    fn skip_to_previous(&self) {
        self.dispatch(RemoteCommand::SkipToPrevious);
    }
}
