// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.
//!
//! Follows the two-level pattern of boxing a `thiserror`-derived enum so that
//! `Result<T, Error>` stays a pointer-sized `Result` even though individual
//! variants carry a fair amount of context.

use std::fmt;

/// An opaque error.
///
/// Most callers will only care about [`Error::kind`]; the `Display`/`Debug`
/// impls exist for logging.
#[derive(Debug)]
pub struct Error(pub(crate) Box<ErrorInt>);

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&*self.0)
    }
}

impl From<ErrorInt> for Error {
    fn from(e: ErrorInt) -> Self {
        Error(Box::new(e))
    }
}

/// The coarse-grained error kind, per the control plane's error handling
/// design: parse errors answer `400`, negotiation failures and keep-alive
/// timeouts close the session, pool exhaustion is a normal (non-fatal)
/// allocation failure, and transport errors are always fatal for the
/// session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidArgument,
    ParseError,
    NegotiationFailure,
    ProtocolViolation,
    PoolExhausted,
    KeepAliveTimeout,
    TransportError,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ErrorInt {
    #[error("invalid argument: {description}")]
    InvalidArgument { description: String },

    #[error("failed to parse wfd body: {description}")]
    ParseError { description: String },

    #[error("no common audio codec: source={source_mask:#04x} sink={sink_mask:#04x}")]
    NoCommonAudioCodec { source_mask: u8, sink_mask: u8 },

    #[error("no common video resolution in native family {family:?}")]
    NoCommonVideoResolution { family: crate::message::VideoNativeResolutionFamily },

    #[error("protocol violation: {description}")]
    ProtocolViolation { description: String },

    #[error("address pool exhausted (flags={flags:?}, n_ports={n_ports})")]
    PoolExhausted {
        flags: crate::pool::AddressFlags,
        n_ports: u16,
    },

    #[error("keep-alive timed out after {outstanding_secs}s with no response")]
    KeepAliveTimeout { outstanding_secs: u64 },

    #[error("transport error: {description}")]
    TransportError { description: String },
}

impl ErrorInt {
    fn kind(&self) -> ErrorKind {
        match self {
            ErrorInt::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            ErrorInt::ParseError { .. } => ErrorKind::ParseError,
            ErrorInt::NoCommonAudioCodec { .. } | ErrorInt::NoCommonVideoResolution { .. } => {
                ErrorKind::NegotiationFailure
            }
            ErrorInt::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
            ErrorInt::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            ErrorInt::KeepAliveTimeout { .. } => ErrorKind::KeepAliveTimeout,
            ErrorInt::TransportError { .. } => ErrorKind::TransportError,
        }
    }
}

/// Builds an [`Error`] from an [`ErrorInt`] variant without returning it.
macro_rules! wrap {
    ($e:expr) => {
        crate::error::Error::from($e)
    };
}

/// Builds an [`Error`] from an [`ErrorInt`] variant and returns it.
macro_rules! bail {
    ($e:expr) => {
        return Err(crate::error::Error::from($e))
    };
}

pub(crate) use bail;
pub(crate) use wrap;

pub type Result<T> = std::result::Result<T, Error>;
