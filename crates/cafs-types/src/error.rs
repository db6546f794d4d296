use thiserror::Error;

use crate::key::KEY_SIZE;

/// Errors produced when building or decoding content keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Raw key material of the wrong length. The offending bytes are kept
    /// verbatim for diagnostics.
    #[error("{} has invalid size of {}, expected {expected}", hex::encode(.key), .key.len(), expected = KEY_SIZE)]
    BadKeySize { key: Vec<u8> },

    #[error("leaf directory length {len} is not a multiple of {expected}", expected = KEY_SIZE)]
    BadDirectoryLength { len: usize },
}
