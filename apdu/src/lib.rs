// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for Ethereum clear-signing communication
//!
//! This crate provides the wire-level building blocks shared by every command
//! the host sends to an offline signing device: the TLV record codec used by
//! all metadata descriptors, the instruction and status tables, the chunking
//! discipline for payloads larger than a single frame, and per-command frame
//! builders for the EIP-712 structured-data protocol and the metadata
//! `provide` family.
//!
//! Everything here is a pure function of its inputs. Signing, key handling
//! and transport exchange live in the host library built on top of this
//! crate.

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

pub use ledger_apdu::APDUCommand;

pub mod chunk;
pub mod eip712;
pub mod path;
pub mod prelude;
pub mod provide;
pub mod tlv;

/// Ethereum application APDU class byte
pub const ETH_APDU_CLA: u8 = 0xe0;

/// A single command frame: 5-byte header plus at most 255 payload bytes
pub type ApduFrame = APDUCommand<Vec<u8>>;

/// Build a single frame for `ins` with the given parameter bytes and payload
pub fn frame(ins: Instruction, p1: u8, p2: u8, data: Vec<u8>) -> ApduFrame {
    debug_assert!(data.len() <= chunk::MAX_FRAME_DATA);

    APDUCommand {
        cla: ETH_APDU_CLA,
        ins: ins as u8,
        p1,
        p2,
        data,
    }
}

/// Ethereum application instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, Display, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch public key and address for a derivation path
    GetPublicAddr = 0x02,

    /// Sign an externally built raw transaction
    Sign = 0x04,

    /// Sign an EIP-191 personal message
    PersonalSign = 0x08,

    /// Deliver ERC-20 token display metadata
    ProvideErc20TokenInformation = 0x0a,

    /// Finalise an EIP-712 message and produce a signature
    Eip712Sign = 0x0c,

    /// Deliver NFT collection display metadata
    ProvideNftInformation = 0x14,

    /// Register a contract / selector plugin binding
    SetPlugin = 0x16,

    /// Stream one EIP-712 type-definition frame
    Eip712SendStructDef = 0x1a,

    /// Stream one EIP-712 implementation frame
    Eip712SendStructImpl = 0x1c,

    /// Stream one EIP-712 filtering frame
    Eip712SendFiltering = 0x1e,

    /// Fetch a 4-byte anti-replay challenge
    GetChallenge = 0x20,

    /// Deliver a trusted-name descriptor
    ProvideTrustedName = 0x22,

    /// Deliver an enum-value descriptor
    ProvideEnumValue = 0x24,

    /// Deliver a transaction-info (calldata schema) descriptor
    ProvideTransactionInfo = 0x26,

    /// Deliver a calldata field descriptor
    ProvideField = 0x28,

    /// Deliver a proxy-implementation descriptor
    ProvideProxyInfo = 0x2a,

    /// Sign an EIP-7702 delegation authorization
    SignEip7702Authorization = 0x2c,

    /// Deliver a dynamic network descriptor (and optional icon)
    ProvideNetworkInformation = 0x30,

    /// Deliver a transaction-simulation verdict
    ProvideTxSimulation = 0x32,

    /// Deliver a safe / signer account descriptor
    ProvideSafeAccount = 0x34,

    /// Deliver a gating banner descriptor
    ProvideGating = 0x36,
}

/// `p1` values used across instructions
pub mod p1 {
    /// Payload fits in this frame
    pub const COMPLETE_SEND: u8 = 0x00;
    /// More payload frames follow
    pub const PARTIAL_SEND: u8 = 0x01;

    /// First frame of a chunked `provide` payload
    pub const FIRST_CHUNK: u8 = 0x01;
    /// Subsequent frame of a chunked `provide` payload
    pub const FOLLOWING_CHUNK: u8 = 0x00;

    /// First frame of a signing payload
    pub const SIGN_FIRST_CHUNK: u8 = 0x00;
    /// Subsequent frame of a signing payload
    pub const SIGN_SUBSQT_CHUNK: u8 = 0x80;
}

/// `p2` values selecting sub-instruction variants
pub mod p2 {
    pub const STRUCT_NAME: u8 = 0x00;
    pub const STRUCT_FIELD: u8 = 0xff;
    pub const ARRAY: u8 = 0x0f;

    pub const LEGACY_IMPLEM: u8 = 0x00;
    pub const NEW_IMPLEM: u8 = 0x01;

    pub const FILTERING_ACTIVATE: u8 = 0x00;
    pub const FILTERING_DISCARDED_PATH: u8 = 0x01;
    pub const FILTERING_MESSAGE_INFO: u8 = 0x0f;
    pub const FILTERING_TRUSTED_NAME: u8 = 0xfb;
    pub const FILTERING_DATETIME: u8 = 0xfc;
    pub const FILTERING_TOKEN_ADDR_CHECK: u8 = 0xfd;
    pub const FILTERING_AMOUNT_FIELD: u8 = 0xfe;
    pub const FILTERING_RAW: u8 = 0xff;

    pub const NETWORK_CONFIG: u8 = 0x00;
    pub const NETWORK_ICON: u8 = 0x01;
}

/// Device status words
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, Display, TryFromPrimitive)]
#[repr(u16)]
pub enum StatusWord {
    Ok = 0x9000,
    ExceptionOverflow = 0x6807,
    ConditionNotSatisfied = 0x6985,
    CommandNotAllowed = 0x6986,
    ErrorNoInfo = 0x6a00,
    InvalidData = 0x6a80,
    InsufficientMemory = 0x6a84,
    RefDataNotFound = 0x6a88,
    InvalidP1P2 = 0x6b00,
    InvalidIns = 0x6d00,
}

/// Status outcome classes, abstracted from raw status words
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Command accepted
    Ok,
    /// Malformed, unsigned or mis-keyed payload
    InvalidData,
    /// User rejected the operation
    ConditionNotSatisfied,
    /// Command used in an unsupported configuration
    CommandNotAllowed,
    /// Feature disabled in the current configuration
    NotImplemented,
    /// Numeric field exceeds the representable range
    ExceptionOverflow,
    /// Status word outside the known table
    Unknown(u16),
}

impl Outcome {
    /// Classify a raw status word
    pub fn classify(sw: u16) -> Self {
        match StatusWord::try_from(sw) {
            Ok(StatusWord::Ok) => Outcome::Ok,
            Ok(StatusWord::ConditionNotSatisfied) => Outcome::ConditionNotSatisfied,
            Ok(StatusWord::CommandNotAllowed) => Outcome::CommandNotAllowed,
            Ok(StatusWord::InvalidIns) => Outcome::NotImplemented,
            Ok(StatusWord::ExceptionOverflow) => Outcome::ExceptionOverflow,
            Ok(_) => Outcome::InvalidData,
            Err(_) => Outcome::Unknown(sw),
        }
    }
}

/// Frame construction errors
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum FrameError {
    /// A length-prefixed field exceeds its one-byte length encoding
    #[error("value too long for length-prefixed field ({0} bytes)")]
    Oversize(usize),

    /// A single-frame payload exceeds the frame limit
    #[error("payload too large for a single frame ({0} bytes)")]
    PayloadTooLarge(usize),
}

/// Append a one-byte-length-prefixed byte string to `out`
pub(crate) fn push_prefixed(out: &mut Vec<u8>, value: &[u8]) -> Result<(), FrameError> {
    if value.len() > u8::MAX as usize {
        return Err(FrameError::Oversize(value.len()));
    }
    out.push(value.len() as u8);
    out.extend_from_slice(value);
    Ok(())
}

/// Build a single frame, rejecting payloads that cannot fit
pub(crate) fn checked_frame(
    ins: Instruction,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
) -> Result<ApduFrame, FrameError> {
    if data.len() > chunk::MAX_FRAME_DATA {
        return Err(FrameError::PayloadTooLarge(data.len()));
    }
    Ok(frame(ins, p1, p2, data))
}
