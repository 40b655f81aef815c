use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The sticky "unbounded" flag read low after a session had observed it
    /// high, with no reset or new start in between.
    #[error("status flag dropped after divergence at iteration {iteration} ({cycles} cycles later)")]
    StatusDropped { iteration: u32, cycles: u64 },
    #[error("invalid scan configuration: {0}")]
    InvalidScan(String),
    #[error("unknown protocol version {0:?} (expected \"bytewise\" or \"nibble\")")]
    UnknownProtocol(String),
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
}
