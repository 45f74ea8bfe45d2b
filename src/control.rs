//! Channel through which the outside world reaches the loop.
//!
//! Producers (signal bridge, other threads, tests) only enqueue a token and
//! wake the poller. The loop drains the queue between its readiness wait and
//! its accept/receive pass, so nothing outside the loop ever touches the
//! connection table.

use std::sync::{
    mpsc::{self, Receiver, Sender, TryRecvError},
    Arc,
};

use mio::Waker;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Stop the loop after the current iteration.
    Shutdown,
    /// Close the connection in the lowest occupied slot, if any.
    CloseOne,
}

/// Cloneable, thread-safe handle for posting [`ControlEvent`]s to a running
/// loop.
#[derive(Clone)]
pub struct ControlHandle {
    sender: Sender<ControlEvent>,
    waker: Arc<Waker>,
}

impl ControlHandle {
    pub fn shutdown(&self) -> Result<()> {
        self.post(ControlEvent::Shutdown)
    }

    pub fn close_one(&self) -> Result<()> {
        self.post(ControlEvent::CloseOne)
    }

    pub fn post(&self, event: ControlEvent) -> Result<()> {
        self.sender.send(event).map_err(|_| Error::LoopGone)?;
        self.waker.wake()?;
        Ok(())
    }
}

/// Loop-side end of the channel.
pub(crate) struct Mailbox {
    receiver: Receiver<ControlEvent>,
    sender: Sender<ControlEvent>,
    waker: Arc<Waker>,
}

impl Mailbox {
    pub(crate) fn new(waker: Arc<Waker>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            receiver,
            sender,
            waker,
        }
    }

    pub(crate) fn handle(&self) -> ControlHandle {
        ControlHandle {
            sender: self.sender.clone(),
            waker: self.waker.clone(),
        }
    }

    /// Everything posted so far, oldest first.
    pub(crate) fn drain(&self) -> Vec<ControlEvent> {
        let mut drained = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => drained.push(event),
                // The mailbox keeps its own sender, so the queue never disconnects.
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }
}
