//! # slotd
//! A small TCP server that serves a fixed number of clients from a single thread.
//! Connections live in a fixed-capacity slot table; one readiness loop built on
//! [`mio`] waits on the listener, every occupied slot, and an in-process control
//! channel, then accepts at most one client and performs at most one receive per
//! ready client on each iteration.
//! ## Behavior
//! - **Bounded**: at most `max_clients` connections (5 by default); an extra
//!   client is accepted and closed straight away
//! - **Deterministic**: ready slots are served in ascending slot order
//! - **Stable slots**: a connection keeps its slot until it is closed
//! - **Quit command**: any payload starting with `quit` stops the whole server
//! - **Signals**: SIGHUP closes the lowest-slot client, SIGINT/SIGTERM/SIGQUIT
//!   stop the server
//! ## Architecture Overview
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌─────────────┐
//! │ ControlHandle│───▶│   Reactor    │───▶│ PollHandle  │
//! │ SignalSource │    └──────────────┘    └─────────────┘
//! └──────────────┘            │
//!                             ▼
//!                    ┌──────────────────┐
//!                    │ ConnectionTable  │
//!                    └──────────────────┘
//! ```
//! ## Quick Start
//!
//! ```rust,no_run
//! use slotd::{Reactor, ServerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder()
//!         .address("127.0.0.1:3333".parse()?)
//!         .max_clients(5)
//!         .build();
//!
//!     let mut reactor = Reactor::bind(config)?;
//!     reactor.install_signals()?;
//!
//!     // Blocks until a client sends `quit` or a terminating signal arrives
//!     let report = reactor.run()?;
//!     println!("stopped: {:?}", report.reason);
//!     Ok(())
//! }
//! ```
//!
//! Stopping from another thread goes through a [`ControlHandle`]:
//!
//! ```rust,no_run
//! use slotd::{Reactor, ServerConfig};
//!
//! let mut reactor = Reactor::bind(ServerConfig::default())?;
//! let control = reactor.control_handle();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     let _ = control.close_one();
//!     let _ = control.shutdown();
//! });
//!
//! reactor.run()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! - [`Reactor`]: binds the listener and runs the loop
//! - [`table`]: the slot table
//! - [`control`]: the channel used by signals and other threads
//! - [`signals`]: OS signal mapping
//! - [`handler`]: optional callbacks for observing traffic
//! - [`config`]: server configuration and its builder
//! - [`error`]: error types and result handling

pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod handler;
pub mod poll;
pub mod reactor;
pub mod signals;
pub mod table;

pub use config::{AcceptErrorPolicy, ServerConfig};
pub use control::{ControlEvent, ControlHandle};
pub use error::{Error, Result};
pub use handler::{CloseReason, ConnectionHandler};
pub use reactor::{Reactor, ShutdownReport, State, StopReason};
pub use table::{ConnectionTable, SlotIndex};

/// A convenient prelude module that re-exports commonly used types and traits.
///
/// ```rust
/// use slotd::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{AcceptErrorPolicy, ServerConfig};
    pub use crate::control::{ControlEvent, ControlHandle};
    pub use crate::handler::{CloseReason, ConnectionHandler};
    pub use crate::reactor::{self, Reactor, ShutdownReport, StopReason};
    pub use crate::table::{ConnectionTable, SlotIndex};
}
