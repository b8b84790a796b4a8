use thiserror::Error;

/// Failures of the selection stores. Invalid request input is never an
/// error: unrecognized or out-of-vocabulary parameters are skipped during
/// derivation instead.
#[derive(Debug, Clone, Error)]
pub enum ListFilterError {
    #[error("selection store read failed: {0}")]
    StoreRead(String),

    #[error("selection store write failed: {0}")]
    StoreWrite(String),

    #[error("selection store delete failed: {0}")]
    StoreDelete(String),

    #[error("persisted selection could not be decoded: {0}")]
    Decode(String),
}
