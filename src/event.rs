use mio::{event::Event, Token};

use crate::table::SlotIndex;

// Slot tokens count up from zero; the fixed sources sit at the top of the
// token space. Token(usize::MAX) is reserved by mio.
pub const LISTENER: Token = Token(usize::MAX - 1);
pub const WAKER: Token = Token(usize::MAX - 2);
pub const SIGNALS: Token = Token(usize::MAX - 3);

/// What a poll token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Listener,
    Waker,
    Signals,
    Slot(SlotIndex),
}

impl Source {
    pub fn token(&self) -> Token {
        match self {
            Source::Listener => LISTENER,
            Source::Waker => WAKER,
            Source::Signals => SIGNALS,
            Source::Slot(slot) => Token(slot.as_usize()),
        }
    }
}

impl From<Token> for Source {
    fn from(token: Token) -> Self {
        match token {
            LISTENER => Source::Listener,
            WAKER => Source::Waker,
            SIGNALS => Source::Signals,
            Token(index) => Source::Slot(SlotIndex(index)),
        }
    }
}

/// Readiness remembered across loop iterations.
///
/// mio notifies edge-triggered, while the loop performs only one accept and
/// one receive per source per iteration. A flag stays raised until the
/// operation on that source reports `WouldBlock` or the slot is vacated.
#[derive(Debug)]
pub struct ReadySet {
    listener: bool,
    waker: bool,
    signals: bool,
    slots: Vec<bool>,
}

impl ReadySet {
    pub fn new(slots: usize) -> Self {
        Self {
            listener: false,
            waker: false,
            signals: false,
            slots: vec![false; slots],
        }
    }

    /// Raises the flag for the event's source when it reports something to
    /// read. Hang-ups and errors count, since the next read surfaces them.
    pub fn record(&mut self, event: &Event) {
        if event.is_readable() || event.is_read_closed() || event.is_error() {
            self.raise(Source::from(event.token()));
        }
    }

    pub fn raise(&mut self, source: Source) {
        match source {
            Source::Listener => self.listener = true,
            Source::Waker => self.waker = true,
            Source::Signals => self.signals = true,
            Source::Slot(slot) => {
                if let Some(flag) = self.slots.get_mut(slot.as_usize()) {
                    *flag = true;
                }
            }
        }
    }

    pub fn clear(&mut self, source: Source) {
        match source {
            Source::Listener => self.listener = false,
            Source::Waker => self.waker = false,
            Source::Signals => self.signals = false,
            Source::Slot(slot) => {
                if let Some(flag) = self.slots.get_mut(slot.as_usize()) {
                    *flag = false;
                }
            }
        }
    }

    pub fn is_ready(&self, source: Source) -> bool {
        match source {
            Source::Listener => self.listener,
            Source::Waker => self.waker,
            Source::Signals => self.signals,
            Source::Slot(slot) => self.slots.get(slot.as_usize()).copied().unwrap_or(false),
        }
    }

    /// Whether any accept or receive is still owed from an earlier wake.
    pub fn has_pending_io(&self) -> bool {
        self.listener || self.has_pending_slots()
    }

    /// Whether any receive is still owed from an earlier wake.
    pub fn has_pending_slots(&self) -> bool {
        self.slots.iter().any(|flag| *flag)
    }
}
