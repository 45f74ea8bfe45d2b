//! The connection-multiplexing loop.
//!
//! One iteration ([`Reactor::turn`]):
//!
//! ```text
//!   wait(listener + occupied slots + waker + signals, timeout)
//!     │
//!     ├─ drain control events ──> Shutdown: stop here
//!     │                         └> CloseOne: close lowest slot
//!     ├─ listener ready? ──> accept one ──> insert, or reject-and-close
//!     └─ for each occupied slot, ascending:
//!          ready? ──> one receive
//!                      ├─ "quit.."  close, set shutdown, stop scanning
//!                      ├─ 0 bytes   close, keep scanning
//!                      └─ error     close, keep scanning
//! ```
//!
//! Everything runs on the caller's thread. The only suspension point is the
//! wait, and the only way in from outside is the control channel, which is
//! drained right after the wait returns.

use std::{
    io::{self, Read},
    net::SocketAddr,
    ops::ControlFlow,
    time::Duration,
};

use mio::{
    net::{TcpListener, TcpStream},
    Events, Interest,
};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::{AcceptErrorPolicy, ServerConfig},
    control::{ControlEvent, ControlHandle, Mailbox},
    error::{Error, Result},
    event::{ReadySet, Source, LISTENER},
    handler::{CloseReason, ConnectionHandler, NoopHandler},
    poll::{PollHandle, Wait},
    signals::SignalSource,
    table::{ConnectionTable, SlotIndex, TableFull},
};

const EVENTS_CAPACITY: usize = 64;

/// An accepted client, owned by the connection table while open.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A shutdown control event or terminating signal.
    ShutdownRequested,
    /// A client in the given slot sent the quit command.
    QuitCommand(SlotIndex),
    /// The readiness wait failed.
    PollFailed,
    /// `accept` failed under [`AcceptErrorPolicy::Fatal`].
    AcceptFailed,
}

/// Summary of a graceful stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub reason: StopReason,
    /// Connections still open when the loop stopped, closed during cleanup.
    pub closed_at_shutdown: usize,
}

pub struct Reactor<H: ConnectionHandler = NoopHandler> {
    config: ServerConfig,
    poll_handle: PollHandle,
    events: Events,
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    table: ConnectionTable<Connection>,
    ready: ReadySet,
    mailbox: Mailbox,
    signals: Option<SignalSource>,
    handler: H,
    buffer: Vec<u8>,
    shutdown: bool,
    state: State,
    stop_reason: Option<StopReason>,
    closed_at_shutdown: usize,
    accept_backoff: bool,
}

impl Reactor<NoopHandler> {
    /// Binds the listener described by `config` and readies the loop.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        Self::with_handler(config, NoopHandler)
    }
}

impl<H: ConnectionHandler> Reactor<H> {
    pub fn with_handler(config: ServerConfig, handler: H) -> Result<Self> {
        config.validate()?;

        let mut listener = bind_listener(config.address, config.backlog)?;
        let local_addr = listener.local_addr()?;

        let poll_handle = PollHandle::new().map_err(Error::Register)?;
        poll_handle
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(Error::Register)?;
        let mailbox = Mailbox::new(poll_handle.waker());

        info!(%local_addr, max_clients = config.max_clients, "Listening for connections");

        Ok(Self {
            poll_handle,
            events: Events::with_capacity(EVENTS_CAPACITY),
            listener: Some(listener),
            local_addr,
            table: ConnectionTable::with_capacity(config.max_clients),
            ready: ReadySet::new(config.max_clients),
            mailbox,
            signals: None,
            handler,
            buffer: vec![0; config.buffer_size],
            shutdown: false,
            state: State::Running,
            stop_reason: None,
            closed_at_shutdown: 0,
            accept_backoff: false,
            config,
        })
    }

    /// Routes SIGHUP, SIGINT, SIGTERM and SIGQUIT into the loop.
    pub fn install_signals(&mut self) -> Result<()> {
        let mut signals = SignalSource::new().map_err(Error::Signals)?;
        signals
            .register(self.poll_handle.registry())
            .map_err(Error::Signals)?;
        self.signals = Some(signals);
        Ok(())
    }

    pub fn control_handle(&self) -> ControlHandle {
        self.mailbox.handle()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown
    }

    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Occupied slots with their peers, ascending.
    pub fn connections(&self) -> impl Iterator<Item = (SlotIndex, &Connection)> + '_ {
        self.table.iter()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Runs iterations until the loop stops.
    ///
    /// Returns a report once the loop has stopped and closed the listener and
    /// every connection, including after a failed wait. Only a fatal accept
    /// error is returned as an error.
    pub fn run(&mut self) -> Result<ShutdownReport> {
        while self.turn()? == State::Running {}

        let reason = self.stop_reason.unwrap_or(StopReason::ShutdownRequested);
        info!(?reason, closed = self.closed_at_shutdown, "Server stopped");
        Ok(ShutdownReport {
            reason,
            closed_at_shutdown: self.closed_at_shutdown,
        })
    }

    /// Performs a single iteration of the loop.
    pub fn turn(&mut self) -> Result<State> {
        if self.state == State::Stopped {
            return Ok(State::Stopped);
        }

        let timeout = self.next_timeout();
        match self.poll_handle.poll(&mut self.events, Some(timeout)) {
            Ok(Wait::Ready) => {
                for event in self.events.iter() {
                    self.ready.record(event);
                }
            }
            Ok(Wait::Interrupted) => trace!("Readiness wait interrupted"),
            Err(e) => {
                self.wait_failed(e);
                return Ok(self.state);
            }
        }

        self.drain_control();
        if self.shutdown {
            self.stop(StopReason::ShutdownRequested);
            return Ok(self.state);
        }

        if self.ready.is_ready(Source::Listener) {
            self.accept_one()?;
        }

        for slot in self.table.occupied() {
            if !self.ready.is_ready(Source::Slot(slot)) {
                continue;
            }
            if self.receive_one(slot).is_break() {
                break;
            }
        }

        if self.shutdown {
            self.stop(StopReason::ShutdownRequested);
        }
        Ok(self.state)
    }

    // Readiness still owed from an earlier wake only needs a peek. A listener
    // that just failed to accept is retried after a full wait instead.
    fn next_timeout(&self) -> Duration {
        let listener_owed = self.ready.is_ready(Source::Listener) && !self.accept_backoff;
        if listener_owed || self.ready.has_pending_slots() {
            Duration::ZERO
        } else {
            self.config.poll_timeout
        }
    }

    fn wait_failed(&mut self, e: io::Error) {
        error!(error = %e, "Readiness wait failed, shutting down");
        self.stop(StopReason::PollFailed);
    }

    fn drain_control(&mut self) {
        let mut pending = self.mailbox.drain();
        if let Some(signals) = self.signals.as_mut() {
            pending.extend(signals.drain());
        }
        self.ready.clear(Source::Waker);
        self.ready.clear(Source::Signals);

        for event in pending {
            match event {
                ControlEvent::Shutdown => {
                    info!("Shutdown requested");
                    self.request_shutdown(StopReason::ShutdownRequested);
                }
                ControlEvent::CloseOne => self.close_first_open(),
            }
        }
    }

    fn accept_one(&mut self) -> Result<()> {
        let Some(listener) = self.listener.as_ref() else {
            return Ok(());
        };

        match listener.accept() {
            Ok((stream, peer)) => {
                self.accept_backoff = false;
                self.admit(stream, peer);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.accept_backoff = false;
                self.ready.clear(Source::Listener);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return self.accept_failed(e),
        }
        Ok(())
    }

    fn accept_failed(&mut self, e: io::Error) -> Result<()> {
        match self.config.accept_error_policy {
            AcceptErrorPolicy::Fatal => {
                error!(error = %e, "Accept failed");
                self.stop(StopReason::AcceptFailed);
                Err(Error::Accept(e))
            }
            AcceptErrorPolicy::LogAndContinue => {
                // The listener stays ready so queued clients are not stranded,
                // but the retry waits a full poll timeout.
                warn!(error = %e, "Accept failed, still serving existing clients");
                self.accept_backoff = true;
                Ok(())
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        let slot = match self.table.insert(Connection { stream, peer }) {
            Ok(slot) => slot,
            Err(TableFull(rejected)) => {
                warn!(
                    %peer,
                    capacity = self.table.capacity(),
                    "Connection table full, rejecting"
                );
                drop(rejected);
                self.handler.on_reject(peer);
                return;
            }
        };

        self.ready.clear(Source::Slot(slot));
        if let Some(connection) = self.table.get_mut(slot) {
            if let Err(e) = self.poll_handle.register(
                &mut connection.stream,
                Source::Slot(slot).token(),
                Interest::READABLE,
            ) {
                warn!(%slot, %peer, error = %e, "Failed to register connection, closing it");
                self.table.remove(slot);
                return;
            }
        }

        info!(%slot, %peer, "A new connection has been accepted");
        self.handler.on_connect(slot, peer);
    }

    fn receive_one(&mut self, slot: SlotIndex) -> ControlFlow<()> {
        let Some(connection) = self.table.get_mut(slot) else {
            return ControlFlow::Continue(());
        };

        match connection.stream.read(&mut self.buffer) {
            Ok(0) => {
                info!(%slot, "Client disconnected");
                self.close_slot(slot, CloseReason::PeerClosed);
            }
            Ok(n) => {
                info!(%slot, bytes = n, "Data received");
                let payload = &self.buffer[..n];
                let is_quit = payload.starts_with(&self.config.quit_command);
                self.handler.on_data(slot, payload);

                if is_quit {
                    info!(%slot, "Client sent quit, closing the connection");
                    self.close_slot(slot, CloseReason::Quit);
                    self.request_shutdown(StopReason::QuitCommand(slot));
                    return ControlFlow::Break(());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.ready.clear(Source::Slot(slot));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(%slot, error = %e, "Receive failed, closing the connection");
                self.close_slot(slot, CloseReason::ReceiveError);
            }
        }
        ControlFlow::Continue(())
    }

    fn close_first_open(&mut self) {
        match self.table.remove_first_open() {
            Some((slot, connection)) => {
                info!(%slot, peer = %connection.peer, "Closing connection on request");
                self.release(slot, connection, CloseReason::Requested);
            }
            None => debug!("Close requested with no open connections"),
        }
    }

    fn close_slot(&mut self, slot: SlotIndex, reason: CloseReason) {
        if let Some(connection) = self.table.remove(slot) {
            self.release(slot, connection, reason);
        }
    }

    // Takes ownership so the stream is closed exactly once, on return.
    fn release(&mut self, slot: SlotIndex, mut connection: Connection, reason: CloseReason) {
        self.ready.clear(Source::Slot(slot));
        if let Err(e) = self.poll_handle.deregister(&mut connection.stream) {
            debug!(%slot, error = %e, "Deregister failed");
        }
        self.handler.on_disconnect(slot, reason);
    }

    fn request_shutdown(&mut self, reason: StopReason) {
        self.shutdown = true;
        self.stop_reason.get_or_insert(reason);
    }

    fn stop(&mut self, reason: StopReason) {
        if self.state == State::Stopped {
            return;
        }
        self.stop_reason.get_or_insert(reason);

        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = self.poll_handle.deregister(&mut listener) {
                debug!(error = %e, "Deregister failed");
            }
            debug!(local_addr = %self.local_addr, "Listener closed");
        }
        if let Some(mut signals) = self.signals.take() {
            if let Err(e) = signals.deregister(self.poll_handle.registry()) {
                debug!(error = %e, "Deregister failed");
            }
        }
        for (slot, connection) in self.table.drain() {
            debug!(%slot, peer = %connection.peer, "Closing connection at shutdown");
            self.release(slot, connection, CloseReason::Shutdown);
            self.closed_at_shutdown += 1;
        }

        self.state = State::Stopped;
    }
}

fn bind_listener(addr: SocketAddr, backlog: u32) -> Result<TcpListener> {
    let bind_err = |source: io::Error| Error::Bind { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    socket.bind(&addr.into()).map_err(bind_err)?;
    let backlog = i32::try_from(backlog).unwrap_or(i32::MAX);
    socket.listen(backlog).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;

    Ok(TcpListener::from_std(socket.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::Write,
        net::{Shutdown, TcpStream as StdTcpStream},
        thread,
    };

    #[derive(Default)]
    struct Recorder {
        connected: Vec<SlotIndex>,
        rejected: usize,
        data: Vec<(SlotIndex, Vec<u8>)>,
        closed: Vec<(SlotIndex, CloseReason)>,
    }

    impl ConnectionHandler for Recorder {
        fn on_connect(&mut self, slot: SlotIndex, _peer: SocketAddr) {
            self.connected.push(slot);
        }

        fn on_reject(&mut self, _peer: SocketAddr) {
            self.rejected += 1;
        }

        fn on_data(&mut self, slot: SlotIndex, data: &[u8]) {
            self.data.push((slot, data.to_vec()));
        }

        fn on_disconnect(&mut self, slot: SlotIndex, reason: CloseReason) {
            self.closed.push((slot, reason));
        }
    }

    fn test_config() -> ServerConfig {
        ServerConfig::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .poll_timeout(Duration::from_millis(20))
            .build()
    }

    fn reactor() -> Reactor<Recorder> {
        Reactor::with_handler(test_config(), Recorder::default()).unwrap()
    }

    fn turn_until(reactor: &mut Reactor<Recorder>, mut done: impl FnMut(&Reactor<Recorder>) -> bool) {
        for _ in 0..200 {
            if done(&*reactor) {
                return;
            }
            reactor.turn().unwrap();
        }
        panic!("condition not reached");
    }

    fn connect(reactor: &mut Reactor<Recorder>, count: usize) -> Vec<StdTcpStream> {
        let addr = reactor.local_addr();
        let target = reactor.connection_count() + count;
        let clients: Vec<_> = (0..count)
            .map(|_| StdTcpStream::connect(addr).unwrap())
            .collect();
        turn_until(reactor, |r| r.connection_count() == target);
        clients
    }

    #[test]
    fn test_reactor_creation() {
        let reactor = Reactor::bind(test_config()).unwrap();
        assert_eq!(reactor.state(), State::Running);
        assert_eq!(reactor.connection_count(), 0);
        assert_ne!(reactor.local_addr().port(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ServerConfig::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .max_clients(0)
            .build();
        assert!(matches!(
            Reactor::bind(config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_bind_conflict_is_setup_error() {
        let first = Reactor::bind(test_config()).unwrap();
        let taken = ServerConfig::builder().address(first.local_addr()).build();
        let err = Reactor::bind(taken).err().unwrap();
        assert!(matches!(err, Error::Bind { .. }));
        assert!(err.is_setup());
    }

    #[test]
    fn test_idle_turn_times_out_and_keeps_running() {
        let mut reactor = reactor();
        assert_eq!(reactor.turn().unwrap(), State::Running);
        assert_eq!(reactor.connection_count(), 0);
    }

    #[test]
    fn test_sixth_client_is_rejected_without_disturbing_others() {
        let mut reactor = reactor();
        let _clients = connect(&mut reactor, 5);
        assert_eq!(
            reactor.handler().connected,
            (0..5).map(SlotIndex).collect::<Vec<_>>()
        );

        let mut sixth = StdTcpStream::connect(reactor.local_addr()).unwrap();
        turn_until(&mut reactor, |r| r.handler().rejected == 1);
        assert_eq!(reactor.connection_count(), 5);

        sixth
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut buf = [0u8; 8];
        let closed = matches!(std::io::Read::read(&mut sixth, &mut buf), Ok(0) | Err(_));
        assert!(closed);
    }

    #[test]
    fn test_slot_is_stable_and_reused_after_disconnect() {
        let mut reactor = reactor();
        let clients = connect(&mut reactor, 3);
        let peers: Vec<_> = reactor.connections().map(|(_, c)| c.peer_addr()).collect();

        clients[1].shutdown(Shutdown::Write).unwrap();
        turn_until(&mut reactor, |r| r.connection_count() == 2);
        assert_eq!(
            reactor.handler().closed,
            vec![(SlotIndex(1), CloseReason::PeerClosed)]
        );
        let remaining: Vec<_> = reactor.connections().map(|(s, c)| (s, c.peer_addr())).collect();
        assert_eq!(
            remaining,
            vec![(SlotIndex(0), peers[0]), (SlotIndex(2), peers[2])]
        );

        let _late = connect(&mut reactor, 1);
        assert_eq!(reactor.handler().connected.last(), Some(&SlotIndex(1)));
        assert_eq!(reactor.state(), State::Running);
    }

    #[test]
    fn test_ready_slots_are_processed_in_ascending_order() {
        let mut reactor = reactor();
        let mut clients = connect(&mut reactor, 3);
        // Drain the listener's sticky readiness.
        reactor.turn().unwrap();

        for index in [2, 0, 1] {
            clients[index].write_all(&[b'a' + index as u8]).unwrap();
        }
        thread::sleep(Duration::from_millis(50));
        turn_until(&mut reactor, |r| r.handler().data.len() == 3);

        let order: Vec<_> = reactor.handler().data.iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec![SlotIndex(0), SlotIndex(1), SlotIndex(2)]);
    }

    #[test]
    fn test_quit_closes_sender_and_stops_after_iteration() {
        let mut reactor = reactor();
        let mut clients = connect(&mut reactor, 3);

        clients[1].write_all(b"quit\n").unwrap();
        turn_until(&mut reactor, |r| r.state() == State::Stopped);

        assert!(reactor.is_shutdown_requested());
        let closed = &reactor.handler().closed;
        assert_eq!(closed[0], (SlotIndex(1), CloseReason::Quit));
        assert_eq!(closed.len(), 3);
        assert!(closed[1..]
            .iter()
            .all(|(_, reason)| *reason == CloseReason::Shutdown));
        assert_eq!(reactor.connection_count(), 0);
    }

    #[test]
    fn test_quit_is_prefix_match_only() {
        let mut reactor = reactor();
        let mut clients = connect(&mut reactor, 1);

        clients[0].write_all(b"qui").unwrap();
        turn_until(&mut reactor, |r| r.handler().data.len() == 1);
        assert_eq!(reactor.state(), State::Running);

        clients[0].write_all(b"quitting time").unwrap();
        turn_until(&mut reactor, |r| r.state() == State::Stopped);
        assert_eq!(reactor.run().unwrap().reason, StopReason::QuitCommand(SlotIndex(0)));
    }

    #[test]
    fn test_close_one_on_empty_table_is_noop() {
        let mut reactor = reactor();
        reactor.control_handle().close_one().unwrap();
        assert_eq!(reactor.turn().unwrap(), State::Running);
        assert!(reactor.handler().closed.is_empty());
    }

    #[test]
    fn test_close_one_targets_lowest_slot() {
        let mut reactor = reactor();
        let _clients = connect(&mut reactor, 3);

        reactor.control_handle().close_one().unwrap();
        reactor.turn().unwrap();

        assert_eq!(
            reactor.handler().closed,
            vec![(SlotIndex(0), CloseReason::Requested)]
        );
        let slots: Vec<_> = reactor.connections().map(|(s, _)| s).collect();
        assert_eq!(slots, vec![SlotIndex(1), SlotIndex(2)]);
    }

    #[test]
    fn test_shutdown_event_closes_everything_once() {
        let mut reactor = reactor();
        let _clients = connect(&mut reactor, 2);

        reactor.control_handle().shutdown().unwrap();
        let report = reactor.run().unwrap();

        assert_eq!(
            report,
            ShutdownReport {
                reason: StopReason::ShutdownRequested,
                closed_at_shutdown: 2,
            }
        );
        assert_eq!(reactor.handler().closed.len(), 2);
        assert_eq!(reactor.turn().unwrap(), State::Stopped);
        assert_eq!(reactor.handler().closed.len(), 2);
    }

    #[test]
    fn test_wait_failure_stops_with_graceful_report() {
        let mut reactor = reactor();
        let _clients = connect(&mut reactor, 2);

        reactor.wait_failed(io::Error::other("poller gone"));
        assert_eq!(reactor.state(), State::Stopped);

        let report = reactor.run().unwrap();
        assert_eq!(
            report,
            ShutdownReport {
                reason: StopReason::PollFailed,
                closed_at_shutdown: 2,
            }
        );
        assert!(reactor
            .handler()
            .closed
            .iter()
            .all(|(_, reason)| *reason == CloseReason::Shutdown));
    }

    #[test]
    fn test_receive_is_bounded_by_buffer_size() {
        let mut reactor = reactor();
        let mut clients = connect(&mut reactor, 1);

        let payload: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        clients[0].write_all(&payload).unwrap();
        turn_until(&mut reactor, |r| {
            r.handler().data.iter().map(|(_, d)| d.len()).sum::<usize>() == payload.len()
        });

        let chunks: Vec<_> = reactor.handler().data.iter().map(|(_, d)| d.len()).collect();
        assert_eq!(chunks, vec![1024, 1024, 452]);
        let received: Vec<u8> = reactor
            .handler()
            .data
            .iter()
            .flat_map(|(_, d)| d.iter().copied())
            .collect();
        assert_eq!(received, payload);
        assert_eq!(reactor.state(), State::Running);
    }

    #[test]
    fn test_receive_error_closes_only_that_connection() {
        let mut reactor = reactor();
        let mut clients = connect(&mut reactor, 2);

        // Linger of zero makes the close send a reset.
        let reset = clients.remove(0);
        socket2::SockRef::from(&reset)
            .set_linger(Some(Duration::ZERO))
            .unwrap();
        drop(reset);

        turn_until(&mut reactor, |r| !r.handler().closed.is_empty());
        assert_eq!(
            reactor.handler().closed,
            vec![(SlotIndex(0), CloseReason::ReceiveError)]
        );
        assert_eq!(reactor.state(), State::Running);
        let slots: Vec<_> = reactor.connections().map(|(s, _)| s).collect();
        assert_eq!(slots, vec![SlotIndex(1)]);

        clients[0].write_all(b"still here").unwrap();
        turn_until(&mut reactor, |r| !r.handler().data.is_empty());
        assert_eq!(
            reactor.handler().data,
            vec![(SlotIndex(1), b"still here".to_vec())]
        );
    }

    #[test]
    fn test_fatal_accept_policy_stops_loop() {
        let config = ServerConfig::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .poll_timeout(Duration::from_millis(20))
            .accept_error_policy(AcceptErrorPolicy::Fatal)
            .build();
        let mut reactor = Reactor::with_handler(config, Recorder::default()).unwrap();
        let _clients = connect(&mut reactor, 1);

        let err = reactor
            .accept_failed(io::Error::from(io::ErrorKind::ConnectionAborted))
            .unwrap_err();
        assert!(matches!(err, Error::Accept(_)));
        assert_eq!(reactor.state(), State::Stopped);
        assert_eq!(
            reactor.handler().closed,
            vec![(SlotIndex(0), CloseReason::Shutdown)]
        );
        assert_eq!(reactor.run().unwrap().reason, StopReason::AcceptFailed);
    }

    #[test]
    fn test_accept_failure_retries_after_full_wait() {
        let mut reactor = reactor();
        let _client = StdTcpStream::connect(reactor.local_addr()).unwrap();
        reactor.ready.raise(Source::Listener);

        reactor
            .accept_failed(io::Error::from(io::ErrorKind::ConnectionAborted))
            .unwrap();
        assert_eq!(reactor.state(), State::Running);
        assert!(reactor.ready.is_ready(Source::Listener));
        assert_eq!(reactor.next_timeout(), Duration::from_millis(20));

        // The queued client is still picked up without a new arrival.
        turn_until(&mut reactor, |r| r.connection_count() == 1);
        assert_eq!(reactor.next_timeout(), Duration::ZERO);
    }
}
