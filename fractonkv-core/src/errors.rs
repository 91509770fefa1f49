use thiserror::Error;

/// Errors raised while decoding a request off the wire.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed or truncated request frame")]
    BadFrame,
}

/// Errors raised while turning a decoded frame into a `Command`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("wrong number of arguments or non-integer index")]
    BadArgs,
}

/// Errors raised by shard/store operations. Never sent to the wire
/// directly — the dispatcher collapses every variant to a single failure
/// byte before handing a reply to the writer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("shard index out of range")]
    BadIndex,
    #[error("key does not exist")]
    NoSuchKey,
    #[error("stored value is not an integer")]
    NotInteger,
}

/// Errors surfaced from the recovery log. `Append` failures are logged by
/// the caller and never turned into one of these; only `Replay` propagates
/// them, and a `Replay` failure is bootstrap-fatal.
#[derive(Debug, Error)]
pub enum ReclogError {
    #[error("recovery log i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed recovery log record: {0}")]
    Malformed(String),
}

/// Errors that can abort the bootstrap sequence before the listener ever
/// opens.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to replay recovery log: {0}")]
    Reclog(#[from] ReclogError),
    #[error("failed to open listening socket: {0}")]
    Io(#[from] std::io::Error),
}
