use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy of the bus layer.
///
/// `NoDevice` is non-fatal at the bus level: during a scan it only means
/// "nothing behind this port", and the remaining ports are still probed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("no device present")]
    NoDevice,

    #[error("i/o failure: {0}")]
    Io(&'static str),

    #[error("out of space: {0}")]
    OutOfSpace(&'static str),

    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}
