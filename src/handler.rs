use std::net::SocketAddr;

use crate::table::SlotIndex;

/// Why a connection left the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its write side.
    PeerClosed,
    /// A receive failed.
    ReceiveError,
    /// The peer sent the quit command.
    Quit,
    /// A [`ControlEvent::CloseOne`](crate::control::ControlEvent::CloseOne) picked it.
    Requested,
    /// The loop stopped while it was still open.
    Shutdown,
}

/// Callbacks invoked by the loop, on the loop's thread, as connections come
/// and go.
///
/// Every method has a no-op default; implement only the ones you need. The
/// loop does its own logging, so a handler is only needed to observe or react
/// to traffic.
pub trait ConnectionHandler {
    /// Called after a connection was accepted and given a slot
    fn on_connect(&mut self, slot: SlotIndex, peer: SocketAddr) {
        let _ = (slot, peer);
    }

    /// Called when an accepted connection found the table full and was closed
    fn on_reject(&mut self, peer: SocketAddr) {
        let _ = peer;
    }

    /// Called for every non-empty receive, including the quit command
    fn on_data(&mut self, slot: SlotIndex, data: &[u8]) {
        let _ = (slot, data);
    }

    /// Called once per connection, after it was removed from the table
    fn on_disconnect(&mut self, slot: SlotIndex, reason: CloseReason) {
        let _ = (slot, reason);
    }
}

/// Handler that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ConnectionHandler for NoopHandler {}
