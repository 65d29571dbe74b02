//! Output transports for the designwire engine protocol.
//!
//! The encoder never talks to a socket directly. It hands committed message
//! bytes to a [`Transport`] held in a [`TransportSlot`], which the host can
//! replace at any time and which can be force-closed from another thread.
//!
//! - [`StreamTransport`] adapts any `std::io::Write`
//! - [`MemoryTransport`] captures bytes in memory (tests, dumps)
//! - [`EngineListener`] accepts the engine's Unix socket connection (Unix only)

pub mod error;
pub mod memory;
pub mod slot;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use slot::TransportSlot;
pub use traits::{StreamTransport, Transport};

#[cfg(unix)]
pub use uds::{EngineConnection, EngineListener};
