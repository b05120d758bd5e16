//! Helpers and utilities for using x11rb as a back end for escher
use ::x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};

pub mod conversions;
pub mod xconn;

pub use xconn::RustConn;

/// Result type for fallible methods using x11rb
pub type Result<T> = std::result::Result<T, X11rbError>;

/// How talking to the X server through x11rb can fail.
///
/// Connection setup and loss keep their underlying causes; failures of
/// individual requests are collapsed to the protocol error and request codes,
/// which is all the error handling policy dispatches on.
#[derive(thiserror::Error, Debug)]
pub enum X11rbError {
    /// No X server connection could be established
    #[error("unable to connect to the X server: {0}")]
    Connect(#[from] ConnectError),

    /// The connection to the X server was lost
    #[error("lost connection to the X server: {0}")]
    ConnectionLost(#[from] ConnectionError),

    /// The server rejected a request whose reply we needed
    #[error("X request failed: error code {error_code}, request code {request_code}")]
    Request {
        /// The protocol error code the server reported
        error_code: u8,
        /// The major opcode of the failed request
        request_code: u8,
    },

    /// The connection has no more resource ids to hand out
    #[error("no more X resource ids available")]
    IdsExhausted,

    /// The X server did not report any usable screen
    #[error("the X server did not report any usable screen")]
    NoScreens,
}

impl From<ReplyError> for X11rbError {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::ConnectionError(e) => e.into(),
            ReplyError::X11Error(e) => Self::Request {
                error_code: e.error_code,
                request_code: e.major_opcode,
            },
        }
    }
}

impl From<ReplyOrIdError> for X11rbError {
    fn from(e: ReplyOrIdError) -> Self {
        match e {
            ReplyOrIdError::ConnectionError(e) => e.into(),
            ReplyOrIdError::X11Error(e) => Self::Request {
                error_code: e.error_code,
                request_code: e.major_opcode,
            },
            ReplyOrIdError::IdsExhausted => Self::IdsExhausted,
        }
    }
}
