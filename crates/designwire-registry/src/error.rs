/// Errors raised by id and string registries.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The key has no id in this registry.
    #[error("{0} is not registered")]
    UnknownKey(String),

    /// The id is not live in this registry.
    #[error("no entry with id {0}")]
    UnknownId(u16),

    /// The key is already registered.
    #[error("{0} is already registered")]
    AlreadyRegistered(String),

    /// The registry reached its configured capacity.
    #[error("registry is full ({max} entries)")]
    Full { max: usize },

    /// Writing a string table failed.
    #[error("string table encoding failed: {0}")]
    Frame(#[from] designwire_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
