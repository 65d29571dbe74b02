//! Id and string registries for the designwire protocol.
//!
//! The wire protocol references host objects (workspaces, units, libraries,
//! strings) by small integer ids transmitted as unsigned shorts. The
//! registries here own that mapping for the lifetime of one engine
//! connection.

pub mod config;
pub mod error;
pub mod id;
pub mod strings;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use id::IdRegistry;
pub use strings::{StringRegistry, StringWriter};
