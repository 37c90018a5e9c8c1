// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt::{Debug, Display};

use ledger_eth_apdu::{
    chunk::ChunkError, path::PathError, tlv::TlvError, FrameError, Outcome,
};

use crate::{descriptor::DescriptorError, keychain::KeychainError};

/// Ethereum clear-signing API error type
#[derive(Debug, thiserror::Error)]
pub enum Error<E: Display + Debug> {
    /// Transport error
    #[error("Transport error: {0}")]
    Transport(E),

    /// User rejected the operation on the device
    #[error("Operation rejected by user")]
    UserRejected,

    /// Device reported a non-OK status word
    #[error("Device reported status {0:#06x}")]
    Device(u16),

    /// Device response too short or unparseable
    #[error("Unexpected device response")]
    UnexpectedResponse,

    /// Reference to a struct missing from the types definition
    #[error("Unknown struct '{0}' in types definition")]
    UnknownStruct(String),

    /// Live element count disagrees with a declared fixed array bound
    #[error("Array size mismatch (expected {expected}, got {actual})")]
    ArraySizeMismatch { expected: usize, actual: usize },

    /// Message tree is missing a value a declared field requires
    #[error("Missing value for field '{0}'")]
    MissingValue(String),

    /// A value cannot be encoded under its declared type
    #[error("Unencodable value for field '{0}'")]
    InvalidValue(String),

    /// Numeric value exceeds the representable range
    #[error("Numeric value exceeds representable range")]
    Overflow,

    /// TLV encoding failed
    #[error("TLV error: {0}")]
    Tlv(#[from] TlvError),

    /// Frame construction failed
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Payload chunking failed
    #[error("Chunking error: {0}")]
    Chunk(#[from] ChunkError),

    /// Invalid derivation path
    #[error("Derivation path error: {0}")]
    Path(#[from] PathError),

    /// Key resolution or signing failed
    #[error("Keychain error: {0}")]
    Keychain(#[from] KeychainError),

    /// Descriptor construction failed
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

impl<E: Display + Debug> Error<E> {
    /// Map a device status word to an error, `None` for OK
    ///
    /// User rejection is a distinguished outcome so callers can branch on
    /// "user said no" without matching raw status words.
    pub fn from_status(sw: u16) -> Option<Self> {
        match Outcome::classify(sw) {
            Outcome::Ok => None,
            Outcome::ConditionNotSatisfied => Some(Error::UserRejected),
            _ => Some(Error::Device(sw)),
        }
    }
}
