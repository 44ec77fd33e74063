// src/error.rs

//! Error type shared by every backend.
//!
//! Native calls report failure through null handles or protocol errors; both
//! collapse into one of two cases here.

/// Error returned by window-system operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The display server could not be reached.
    CannotConnect,
    /// Any other native failure, described by a message.
    General(String),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Error::General(message.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::CannotConnect => write!(f, "cannot connect to the display server"),
            Error::General(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(not(target_os = "macos"))]
impl From<xcb::ConnError> for Error {
    fn from(err: xcb::ConnError) -> Self {
        match err {
            xcb::ConnError::Connection
            | xcb::ConnError::ClosedParseErr
            | xcb::ConnError::ClosedInvalidScreen => Error::CannotConnect,
            other => Error::General(format!("XCB connection error: {}", other)),
        }
    }
}

#[cfg(not(target_os = "macos"))]
impl From<xcb::ProtocolError> for Error {
    fn from(err: xcb::ProtocolError) -> Self {
        Error::General(format!("X protocol error: {:?}", err))
    }
}

#[cfg(not(target_os = "macos"))]
impl From<xcb::Error> for Error {
    fn from(err: xcb::Error) -> Self {
        match err {
            xcb::Error::Connection(conn) => conn.into(),
            xcb::Error::Protocol(proto) => proto.into(),
        }
    }
}

/// Result alias for window-system operations.
pub type Result<T> = std::result::Result<T, Error>;
