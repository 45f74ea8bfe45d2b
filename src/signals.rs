//! OS signal bridge.
//!
//! Signals are received through `signal-hook`'s self-pipe and registered with
//! the poller like any other source, so a signal that lands while the loop is
//! blocked wakes the wait instead of being dropped. Nothing here touches loop
//! state; every pending signal is translated into a [`ControlEvent`].
//!
//! ```text
//!   SIGHUP                    → ControlEvent::CloseOne
//!   SIGINT | SIGTERM | SIGQUIT → ControlEvent::Shutdown
//! ```

use std::{ffi::c_int, io};

use mio::{Interest, Registry};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook_mio::v1_0::Signals;

use crate::{control::ControlEvent, event::SIGNALS};

pub const HANDLED_SIGNALS: [c_int; 4] = [SIGHUP, SIGINT, SIGTERM, SIGQUIT];

/// Maps a signal number to the control event it requests.
pub fn classify(signal: c_int) -> ControlEvent {
    if signal == SIGHUP {
        ControlEvent::CloseOne
    } else {
        ControlEvent::Shutdown
    }
}

pub struct SignalSource {
    signals: Signals,
}

impl SignalSource {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            signals: Signals::new(HANDLED_SIGNALS)?,
        })
    }

    pub fn register(&mut self, registry: &Registry) -> io::Result<()> {
        registry.register(&mut self.signals, SIGNALS, Interest::READABLE)
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.signals)
    }

    /// Signals delivered since the last drain, as control events.
    pub fn drain(&mut self) -> Vec<ControlEvent> {
        self.signals
            .pending()
            .inspect(|signal| tracing::debug!(signal, "Signal received"))
            .map(classify)
            .collect()
    }
}
