use designwire_transport::TransportError;

/// Errors raised while encoding primitives or managing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// `begin` was called while another message was still open.
    #[error("a message frame is already open")]
    AlreadyOpen,

    /// `end`, `rollback` or a payload write happened with no open frame.
    #[error("no message frame is open")]
    NotOpen,

    /// A value transmitted as an unsigned short does not fit in 16 bits.
    #[error("{field} does not fit in an unsigned short ({value} > 65535)")]
    ShortOverflow { field: &'static str, value: usize },

    /// A value does not fit in a 29-bit variable-length integer.
    #[error("value {0} does not fit in a U29")]
    U29Overflow(usize),

    /// More flags than fit in one flag byte.
    #[error("flag array holds {0} flags, max 8")]
    TooManyFlags(usize),

    /// The buffer ended before a complete value could be read.
    #[error("unexpected end of message (needed {needed} bytes, {remaining} left)")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// A type marker did not match the expected value.
    #[error("unexpected marker 0x{found:02x} (expected 0x{expected:02x})")]
    UnexpectedMarker { expected: u8, found: u8 },

    /// A string was not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The transport refused committed bytes.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
