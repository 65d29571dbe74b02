use crate::handle::{DocumentHandle, UnitHandle, WorkspaceHandle};

/// Protocol and encoding faults. Any of these aborts the current operation
/// after its open message has been rolled back.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Primitive encoding or frame misuse.
    #[error("frame error: {0}")]
    Frame(#[from] designwire_frame::FrameError),

    /// Id lookup or assignment failed.
    #[error("registry error: {0}")]
    Registry(#[from] designwire_registry::RegistryError),

    /// The transport refused committed bytes.
    #[error("transport error: {0}")]
    Transport(#[from] designwire_transport::TransportError),

    /// The workspace has no id yet.
    #[error("workspace {0} is not registered")]
    WorkspaceNotRegistered(WorkspaceHandle),

    /// The unit has no id yet.
    #[error("unit {0} is not registered")]
    UnitNotRegistered(UnitHandle),

    /// The document has no factory on the engine side.
    #[error("document {0} has no registered factory")]
    DocumentNotRegistered(DocumentHandle),

    /// A library set item refers to an item outside the set.
    #[error("library set {set}: item {index} does not exist")]
    UnknownLibrarySetItem { set: String, index: usize },
}

pub type Result<T> = std::result::Result<T, ClientError>;
