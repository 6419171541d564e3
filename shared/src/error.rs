#![allow(dead_code)]

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // wire-format errors
    #[error("malformed message")]
    ErrMalformedMsg,
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for resource length")]
    ErrResourceLen,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("compression pointer not pointing backward")]
    ErrInvalidPtr,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("name too long")]
    ErrNameTooLong,
    #[error("entry index out of range")]
    ErrEntryOutOfRange,

    // registry errors
    #[error("host name must not be empty")]
    ErrHostnameEmpty,
    #[error("malformed txt record data")]
    ErrInvalidTxtRecord,

    // server shell errors
    #[error("mtu too small for ip and udp headers")]
    ErrMtuTooSmall,
    #[error("no such interface")]
    ErrUnknownInterface,
    #[error("interface already registered")]
    ErrInterfaceExists,
    #[error("responder closed")]
    ErrResponderClosed,

    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
