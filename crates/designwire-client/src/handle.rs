//! Opaque identities the host hands out for its model objects.
//!
//! Registries key on these handles, never on object content: two distinct
//! workspaces with equal names are still two workspaces.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

handle!(
    /// A host workspace (project).
    WorkspaceHandle,
    "workspace"
);
handle!(
    /// A compilation unit (module) inside a workspace.
    UnitHandle,
    "unit"
);
handle!(
    /// A document source translated into an engine-side factory.
    DocumentHandle,
    "document"
);
handle!(
    /// A compiled library.
    LibraryHandle,
    "library"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_display_with_kind() {
        assert_eq!(WorkspaceHandle(7).to_string(), "workspace#7");
        assert_eq!(UnitHandle::from(3).to_string(), "unit#3");
    }

    #[test]
    fn handles_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&DocumentHandle(42)).unwrap(), "42");
        let library: LibraryHandle = serde_json::from_str("9").unwrap();
        assert_eq!(library, LibraryHandle(9));
    }
}
