// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Dynamic network descriptor

use ledger_eth_apdu::tlv;
use sha2::{Digest, Sha256};

use super::{tag, Descriptor, DescriptorError};
use crate::keychain::Category;

const STRUCT_TYPE: u64 = 0x08;
const ETHEREUM_FAMILY: u64 = 0x01;

/// Network descriptor for chains the device has no built-in table entry for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicNetwork {
    name: String,
    ticker: String,
    chain_id: u64,
    icon: Option<Vec<u8>>,
}

impl DynamicNetwork {
    /// Build a network descriptor
    pub fn new(name: &str, ticker: &str, chain_id: u64) -> Result<Self, DescriptorError> {
        if name.is_empty() {
            return Err(DescriptorError::Empty("name"));
        }
        if ticker.is_empty() {
            return Err(DescriptorError::Empty("ticker"));
        }
        Ok(Self {
            name: name.to_string(),
            ticker: ticker.to_string(),
            chain_id,
            icon: None,
        })
    }

    /// Attach an icon; the record carries its hash, the image itself streams
    /// in separate frames
    pub fn with_icon(mut self, icon: Vec<u8>) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Icon image bytes, if any
    pub fn icon(&self) -> Option<&[u8]> {
        self.icon.as_deref()
    }
}

impl Descriptor for DynamicNetwork {
    fn category(&self) -> Category {
        Category::Network
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(tag::STRUCT_TYPE, STRUCT_TYPE);
        payload.extend(tlv::encode_int(tag::STRUCT_VERSION, 1));
        payload.extend(tlv::encode_int(tag::BLOCKCHAIN_FAMILY, ETHEREUM_FAMILY));
        payload.extend(tlv::encode_int(tag::CHAIN_ID, self.chain_id));
        payload.extend(tlv::encode_str(tag::NETWORK_NAME, &self.name));
        payload.extend(tlv::encode_str(tag::TICKER, &self.ticker));
        if let Some(icon) = &self.icon {
            let hash = Sha256::digest(icon);
            payload.extend(tlv::encode_bytes(tag::NETWORK_ICON_HASH, &hash));
        }
        payload
    }
}
