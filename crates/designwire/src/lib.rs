//! Binary protocol encoder driving an out-of-process UI designer engine.
//!
//! The host keeps workspaces, compilation units, document sources and
//! libraries; the engine only understands a compact stream of framed
//! messages that refer to those objects by small integer ids. designwire
//! encodes that stream and keeps the id bookkeeping.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte sinks the stream is flushed to, and the Unix socket
//!   the engine connects through
//! - [`frame`]: AMF-style primitives and transactional message framing
//! - [`registry`]: id and string registries
//! - [`client`]: the protocol encoder and its host collaborator traits
//!   (behind the default `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use designwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use designwire_frame::*;
}

/// Re-export registry types.
pub mod registry {
    pub use designwire_registry::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use designwire_client::*;
}
