// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Token, NFT-collection and plugin records
//!
//! These three predate the TLV envelope and keep their packed layouts: a
//! fixed field sequence followed by a DER signature over all preceding bytes.

use byteorder::{BigEndian, ByteOrder};

use super::DescriptorError;
use crate::keychain::{Category, Keychain, KeychainError};

const ALGO_SECP256K1_SHA256: u8 = 0x01;

/// ERC-20 token display metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMetadata {
    ticker: String,
    address: [u8; 20],
    decimals: u32,
    chain_id: u32,
    signature: Option<Vec<u8>>,
}

impl TokenMetadata {
    /// Build a token record
    pub fn new(
        ticker: &str,
        address: [u8; 20],
        decimals: u32,
        chain_id: u32,
    ) -> Result<Self, DescriptorError> {
        if ticker.is_empty() || ticker.len() > u8::MAX as usize {
            return Err(DescriptorError::Empty("ticker"));
        }
        Ok(Self {
            ticker: ticker.to_string(),
            address,
            decimals,
            chain_id,
            signature: None,
        })
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }

    /// Packed record: length-prefixed ticker, address, decimals, chain id,
    /// then the aggregator signature
    pub fn serialize(&self, keychain: &Keychain) -> Result<Vec<u8>, KeychainError> {
        let mut payload = Vec::with_capacity(self.ticker.len() + 32);
        payload.push(self.ticker.len() as u8);
        payload.extend_from_slice(self.ticker.as_bytes());
        payload.extend_from_slice(&self.address);

        let mut word = [0u8; 4];
        BigEndian::write_u32(&mut word, self.decimals);
        payload.extend_from_slice(&word);
        BigEndian::write_u32(&mut word, self.chain_id);
        payload.extend_from_slice(&word);

        let sig = match &self.signature {
            Some(s) => s.clone(),
            None => keychain.sign(Category::Cal, &payload)?,
        };
        payload.extend_from_slice(&sig);
        Ok(payload)
    }
}

/// NFT collection display metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftCollection {
    collection_name: String,
    address: [u8; 20],
    chain_id: u64,
    key_id: u8,
    signature: Option<Vec<u8>>,
}

impl NftCollection {
    /// Build an NFT collection record; `key_id` names the device-side key
    /// slot expected to verify it
    pub fn new(
        collection_name: &str,
        address: [u8; 20],
        chain_id: u64,
        key_id: u8,
    ) -> Result<Self, DescriptorError> {
        if collection_name.is_empty() || collection_name.len() > u8::MAX as usize {
            return Err(DescriptorError::Empty("collection_name"));
        }
        Ok(Self {
            collection_name: collection_name.to_string(),
            address,
            chain_id,
            key_id,
            signature: None,
        })
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }

    /// Packed record with a length-prefixed trailing signature
    pub fn serialize(&self, keychain: &Keychain) -> Result<Vec<u8>, KeychainError> {
        let mut payload = Vec::with_capacity(self.collection_name.len() + 40);
        payload.push(0x01); // type
        payload.push(0x01); // version
        payload.push(self.collection_name.len() as u8);
        payload.extend_from_slice(self.collection_name.as_bytes());
        payload.extend_from_slice(&self.address);

        let mut word = [0u8; 8];
        BigEndian::write_u64(&mut word, self.chain_id);
        payload.extend_from_slice(&word);

        payload.push(self.key_id);
        payload.push(ALGO_SECP256K1_SHA256);

        let sig = match &self.signature {
            Some(s) => s.clone(),
            None => keychain.sign(Category::Nft, &payload)?,
        };
        payload.push(sig.len() as u8);
        payload.extend_from_slice(&sig);
        Ok(payload)
    }
}

/// Contract / selector to plugin binding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginDescriptor {
    plugin_name: String,
    address: [u8; 20],
    selector: [u8; 4],
    chain_id: u64,
    key_id: u8,
    signature: Option<Vec<u8>>,
}

impl PluginDescriptor {
    /// Build a plugin registration record
    pub fn new(
        plugin_name: &str,
        address: [u8; 20],
        selector: [u8; 4],
        chain_id: u64,
        key_id: u8,
    ) -> Result<Self, DescriptorError> {
        if plugin_name.is_empty() || plugin_name.len() > u8::MAX as usize {
            return Err(DescriptorError::Empty("plugin_name"));
        }
        Ok(Self {
            plugin_name: plugin_name.to_string(),
            address,
            selector,
            chain_id,
            key_id,
            signature: None,
        })
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }

    /// Packed record with a length-prefixed trailing signature
    pub fn serialize(&self, keychain: &Keychain) -> Result<Vec<u8>, KeychainError> {
        let mut payload = Vec::with_capacity(self.plugin_name.len() + 44);
        payload.push(0x01); // type
        payload.push(0x01); // version
        payload.push(self.plugin_name.len() as u8);
        payload.extend_from_slice(self.plugin_name.as_bytes());
        payload.extend_from_slice(&self.address);
        payload.extend_from_slice(&self.selector);

        let mut word = [0u8; 8];
        BigEndian::write_u64(&mut word, self.chain_id);
        payload.extend_from_slice(&word);

        payload.push(self.key_id);
        payload.push(ALGO_SECP256K1_SHA256);

        let sig = match &self.signature {
            Some(s) => s.clone(),
            None => keychain.sign(Category::SetPlugin, &payload)?,
        };
        payload.push(sig.len() as u8);
        payload.extend_from_slice(&sig);
        Ok(payload)
    }
}
