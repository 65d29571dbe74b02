use std::fmt;
use std::io;

use designwire::client::ClientError;
use designwire::frame::FrameError;
use designwire::transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound | io::ErrorKind::InvalidInput => USAGE,
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. } | TransportError::Accept(source) => {
            io_error(context, source)
        }
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::ShortOverflow { .. }
        | FrameError::U29Overflow(_)
        | FrameError::TooManyFlags(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

/// Encoder faults while replaying a script. Lookups of unregistered objects
/// mean the script asked for an operation out of order.
pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Frame(err) => frame_error(context, err),
        ClientError::Registry(_)
        | ClientError::WorkspaceNotRegistered(_)
        | ClientError::UnitNotRegistered(_)
        | ClientError::DocumentNotRegistered(_)
        | ClientError::UnknownLibrarySetItem { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn script_error(context: &str, err: serde_json::Error) -> CliError {
    match err.classify() {
        serde_json::error::Category::Io => CliError::new(FAILURE, format!("{context}: {err}")),
        _ => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use designwire::client::WorkspaceHandle;

    use super::*;

    #[test]
    fn transport_failure_inside_frame_keeps_transport_code() {
        let err = client_error(
            "flush",
            ClientError::Frame(FrameError::Transport(TransportError::Closed)),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("flush: "));
    }

    #[test]
    fn out_of_order_script_is_invalid_data() {
        let err = client_error(
            "open_workspace",
            ClientError::WorkspaceNotRegistered(WorkspaceHandle(4)),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("workspace#4"));
    }

    #[test]
    fn overflowing_count_is_invalid_data() {
        let err = frame_error(
            "register_unit",
            FrameError::ShortOverflow {
                field: "library set count",
                value: 70_000,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn missing_script_is_a_usage_error() {
        let err = io_error(
            "read script",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code, USAGE);
    }
}
