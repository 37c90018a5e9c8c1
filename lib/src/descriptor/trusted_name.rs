// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trusted-name descriptor: an authenticated human-readable alias for an
//! address (ENS, address book, aggregator records, ...)

use ledger_eth_apdu::tlv;

use super::{tag, Descriptor, DescriptorError};
use crate::keychain::Category;

const STRUCT_TYPE: u64 = 0x03;

/// Key identities declared inside the record, matched by the device against
/// the key that actually signed it
const KEY_ID_TRUSTED_NAME: u64 = 0x07;
const KEY_ID_CAL: u64 = 0x09;

const ALGO_SECP256K1_SHA256: u64 = 0x01;

/// What the named entity is
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TrustedNameType {
    Account = 0x01,
    Contract = 0x02,
    Nft = 0x03,
    Token = 0x04,
    Wallet = 0x05,
    ContextAddress = 0x06,
}

/// Who vouches for the name
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TrustedNameSource {
    LocalAddressBook = 0x00,
    Cal = 0x01,
    Ens = 0x02,
    UnstoppableDomains = 0x03,
    Freename = 0x04,
    Dns = 0x05,
    DynamicResolver = 0x06,
    MultisigAddressBook = 0x07,
}

/// Trusted-name record
///
/// The signing key is a pure function of the declared source: aggregator
/// records authenticate with the aggregator key, everything else with the
/// trusted-name key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustedName {
    version: u64,
    name: String,
    address: Vec<u8>,
    coin_type: Option<u64>,
    not_valid_after: Option<(u8, u8, u8)>,
    name_type: Option<TrustedNameType>,
    name_source: Option<TrustedNameSource>,
    chain_id: Option<u64>,
    challenge: Option<u32>,
    nft_id: Option<Vec<u8>>,
    owner: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
}

impl TrustedName {
    /// Build a trusted-name record for `address`
    pub fn new(version: u64, name: &str, address: &[u8]) -> Result<Self, DescriptorError> {
        if name.is_empty() {
            return Err(DescriptorError::Empty("name"));
        }
        if address.is_empty() {
            return Err(DescriptorError::Empty("address"));
        }
        Ok(Self {
            version,
            name: name.to_string(),
            address: address.to_vec(),
            coin_type: None,
            not_valid_after: None,
            name_type: None,
            name_source: None,
            chain_id: None,
            challenge: None,
            nft_id: None,
            owner: None,
            signature: None,
        })
    }

    pub fn with_coin_type(mut self, slip44: u64) -> Self {
        self.coin_type = Some(slip44);
        self
    }

    /// Expiry as a `(major, minor, patch)` application version
    pub fn with_not_valid_after(mut self, version: (u8, u8, u8)) -> Self {
        self.not_valid_after = Some(version);
        self
    }

    pub fn with_type(mut self, t: TrustedNameType) -> Self {
        self.name_type = Some(t);
        self
    }

    pub fn with_source(mut self, s: TrustedNameSource) -> Self {
        self.name_source = Some(s);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_challenge(mut self, challenge: u32) -> Self {
        self.challenge = Some(challenge);
        self
    }

    pub fn with_nft_id(mut self, id: &[u8]) -> Self {
        self.nft_id = Some(id.to_vec());
        self
    }

    pub fn with_owner(mut self, owner: &[u8]) -> Self {
        self.owner = Some(owner.to_vec());
        self
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }

    fn key_id(&self) -> u64 {
        match self.name_source {
            Some(TrustedNameSource::Cal) => KEY_ID_CAL,
            _ => KEY_ID_TRUSTED_NAME,
        }
    }
}

impl Descriptor for TrustedName {
    fn category(&self) -> Category {
        match self.name_source {
            Some(TrustedNameSource::Cal) => Category::Cal,
            _ => Category::TrustedName,
        }
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(tag::STRUCT_TYPE, STRUCT_TYPE);
        payload.extend(tlv::encode_int(tag::STRUCT_VERSION, self.version));
        if let Some(coin_type) = self.coin_type {
            payload.extend(tlv::encode_int(tag::COIN_TYPE, coin_type));
        }
        if let Some((major, minor, patch)) = self.not_valid_after {
            payload.extend(tlv::encode_bytes(
                tag::NOT_VALID_AFTER,
                &[major, minor, patch],
            ));
        }
        if let Some(t) = self.name_type {
            payload.extend(tlv::encode_int(tag::TRUSTED_NAME_TYPE, t as u64));
        }
        if let Some(s) = self.name_source {
            payload.extend(tlv::encode_int(tag::TRUSTED_NAME_SOURCE, s as u64));
        }
        payload.extend(tlv::encode_str(tag::TRUSTED_NAME, &self.name));
        if let Some(chain_id) = self.chain_id {
            payload.extend(tlv::encode_int(tag::CHAIN_ID, chain_id));
        }
        payload.extend(tlv::encode_bytes(tag::ADDRESS, &self.address));
        if let Some(challenge) = self.challenge {
            payload.extend(tlv::encode_int(tag::CHALLENGE, challenge as u64));
        }
        if let Some(nft_id) = &self.nft_id {
            payload.extend(tlv::encode_bytes(tag::NFT_ID, nft_id));
        }
        if let Some(owner) = &self.owner {
            payload.extend(tlv::encode_bytes(tag::OWNER, owner));
        }
        payload.extend(tlv::encode_int(tag::SIGNER_KEY_ID, self.key_id()));
        payload.extend(tlv::encode_int(tag::SIGNER_ALGO, ALGO_SECP256K1_SHA256));
        payload
    }

    fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}
