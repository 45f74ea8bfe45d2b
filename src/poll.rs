use std::{io, sync::Arc, time::Duration};

use mio::{event::Source, Events, Interest, Poll, Registry, Token, Waker};

use crate::event::WAKER;

/// Result of one readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The poller returned; `events` holds whatever became ready (possibly
    /// nothing, on timeout).
    Ready,
    /// A signal interrupted the wait. Treated as a wake with no readiness.
    Interrupted,
}

pub struct PollHandle {
    poller: Poll,
    waker: Arc<Waker>,
}

impl PollHandle {
    pub fn new() -> io::Result<Self> {
        let poller = Poll::new()?;
        let waker = Waker::new(poller.registry(), WAKER)?;
        Ok(PollHandle {
            poller,
            waker: Arc::new(waker),
        })
    }

    pub fn registry(&self) -> &Registry {
        self.poller.registry()
    }

    pub fn register<S>(&self, src: &mut S, token: Token, interest: Interest) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.registry().register(src, token, interest)
    }

    pub fn deregister<S>(&self, src: &mut S) -> io::Result<()>
    where
        S: Source + ?Sized,
    {
        self.poller.registry().deregister(src)
    }

    pub fn poll(&mut self, events: &mut Events, timeout: Option<Duration>) -> io::Result<Wait> {
        match self.poller.poll(events, timeout) {
            Ok(()) => Ok(Wait::Ready),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                events.clear();
                Ok(Wait::Interrupted)
            }
            Err(e) => Err(e),
        }
    }

    pub fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }
}
