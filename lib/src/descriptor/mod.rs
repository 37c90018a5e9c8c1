// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Metadata descriptor records
//!
//! One record type per metadata category. Each record serializes to a TLV
//! sequence ending in a signature suffix computed over all preceding bytes of
//! that same record, in field order, with the key bound to the record's
//! category. Construction validates record shape up front so that
//! [`Descriptor::serialize`] cannot fail on a validly built instance (key
//! resolution aside).

use ledger_eth_apdu::tlv;
use thiserror::Error;

use crate::keychain::{Category, Keychain, KeychainError};

mod account;
mod auth7702;
mod enum_value;
mod gating;
mod network;
mod proxy;
mod simulation;
mod token;
mod trusted_name;

pub use account::{AccountType, MultisigRole, SafeAccount};
pub use auth7702::DelegationAuthorization;
pub use enum_value::EnumValue;
pub use gating::Gating;
pub use network::DynamicNetwork;
pub use proxy::ProxyInfo;
pub use simulation::{SimulationType, TxSimulation};
pub use token::{NftCollection, PluginDescriptor, TokenMetadata};
pub use trusted_name::{TrustedName, TrustedNameSource, TrustedNameType};

/// TLV tags shared across descriptor records
///
/// Values above 0x7f pick up a DER length prefix on the wire; tags are only
/// unique within one record type.
pub(crate) mod tag {
    pub const STRUCT_TYPE: u64 = 0x01;
    pub const STRUCT_VERSION: u64 = 0x02;
    pub const NOT_VALID_AFTER: u64 = 0x10;
    pub const CHALLENGE: u64 = 0x12;
    pub const SIGNER_KEY_ID: u64 = 0x13;
    pub const SIGNER_ALGO: u64 = 0x14;
    pub const DER_SIGNATURE: u64 = 0x15;
    pub const TRUSTED_NAME: u64 = 0x20;
    pub const COIN_TYPE: u64 = 0x21;
    pub const ADDRESS: u64 = 0x22;
    pub const CHAIN_ID: u64 = 0x23;
    pub const TX_HASH: u64 = 0x27;
    pub const DOMAIN_HASH: u64 = 0x28;
    pub const SELECTOR: u64 = 0x28;
    pub const IMPL_ADDRESS: u64 = 0x29;
    pub const HASH_SELECTOR: u64 = 0x40;
    pub const BLOCKCHAIN_FAMILY: u64 = 0x51;
    pub const NETWORK_NAME: u64 = 0x52;
    pub const TICKER: u64 = 0x24;
    pub const NETWORK_ICON_HASH: u64 = 0x53;
    pub const TRUSTED_NAME_TYPE: u64 = 0x70;
    pub const TRUSTED_NAME_SOURCE: u64 = 0x71;
    pub const NFT_ID: u64 = 0x72;
    pub const OWNER: u64 = 0x74;
    pub const NORMALIZED_RISK: u64 = 0x80;
    pub const NORMALIZED_CATEGORY: u64 = 0x81;
    pub const PROVIDER_MSG: u64 = 0x82;
    pub const INTRO_MSG: u64 = 0x82;
    pub const TINY_URL: u64 = 0x83;
    pub const TX_TYPE: u64 = 0x84;
    pub const THRESHOLD: u64 = 0xa0;
    pub const SIGNERS_COUNT: u64 = 0xa1;
    pub const ROLE: u64 = 0xa2;
}

/// Descriptor construction errors (fail-fast, before any wire bytes)
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// A signer account carries at least one address
    #[error("a signer account carries at least one address")]
    NoAddresses,

    /// Threshold and signer count must be positive for safe accounts
    #[error("threshold and signer count must be positive")]
    InvalidThreshold,

    /// A plain-transaction banner requires a chain id
    #[error("a transaction banner requires a chain id")]
    MissingChainId,

    /// A typed-data banner requires a schema-hash selector
    #[error("a typed-data banner requires a selector hash")]
    MissingSelector,

    /// A required text field is empty
    #[error("field '{0}' must not be empty")]
    Empty(&'static str),
}

/// Transaction kinds referenced by gating and simulation records
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TxType {
    Transaction = 0x00,
    TypedData = 0x01,
    PersonalMessage = 0x02,
}

/// A signed TLV metadata record
pub trait Descriptor {
    /// Signing key category for this record
    fn category(&self) -> Category;

    /// TLV tag carrying the trailing signature
    fn signature_tag(&self) -> u64 {
        tag::DER_SIGNATURE
    }

    /// Record body, excluding the signature suffix
    fn body(&self) -> Vec<u8>;

    /// Externally provided signature, when the record was signed out of band
    fn signature(&self) -> Option<&[u8]> {
        None
    }

    /// Serialize the record with its signature suffix
    fn serialize(&self, keychain: &Keychain) -> Result<Vec<u8>, KeychainError> {
        let mut payload = self.body();
        let sig = match self.signature() {
            Some(s) => s.to_vec(),
            None => keychain.sign(self.category(), &payload)?,
        };
        payload.extend(tlv::encode_bytes(self.signature_tag(), &sig));
        Ok(payload)
    }
}
