// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ethereum clear-signing client library
//!
//! An offline signing device cannot interpret arbitrary contract calls or
//! typed-data messages on its own; an external authority supplies, in a
//! compact signed binary form, both the data to describe and the proof that
//! the description is authentic. This crate is the host side of that
//! protocol: category-bound signing keys, the TLV metadata descriptors, the
//! generic calldata schema, and the EIP-712 structured-data encoder with its
//! field-filtering sub-protocol.
//!
//! Wire-level definitions (TLV codec, instructions, chunking, frame
//! builders) live in `ledger-eth-apdu`, re-exported here as [`apdu`].

/// Re-export protocol definitions for consumers
pub use ledger_eth_apdu as apdu;

mod error;
pub use error::Error;

mod transport;
pub use transport::Exchange;

mod handle;
pub use handle::{AddressInfo, DeviceHandle, DeviceSignature};

pub mod descriptor;
pub mod eip712;
pub mod gcs;
pub mod keychain;
