// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Enum-value descriptor: maps one raw enum constant of one contract
//! function parameter to a display name

use ledger_eth_apdu::tlv;

use super::{Descriptor, DescriptorError};
use crate::keychain::Category;

// This record predates the shared tag table and numbers its fields locally
const TAG_VERSION: u64 = 0x00;
const TAG_CHAIN_ID: u64 = 0x01;
const TAG_CONTRACT_ADDR: u64 = 0x02;
const TAG_SELECTOR: u64 = 0x03;
const TAG_ID: u64 = 0x04;
const TAG_VALUE: u64 = 0x05;
const TAG_NAME: u64 = 0x06;
const TAG_SIGNATURE: u64 = 0xff;

/// Enum-value record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    version: u64,
    chain_id: u64,
    contract_addr: [u8; 20],
    selector: [u8; 4],
    id: u8,
    value: u8,
    name: String,
    signature: Option<Vec<u8>>,
}

impl EnumValue {
    /// Build an enum-value record
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: u64,
        chain_id: u64,
        contract_addr: [u8; 20],
        selector: [u8; 4],
        id: u8,
        value: u8,
        name: &str,
    ) -> Result<Self, DescriptorError> {
        if name.is_empty() {
            return Err(DescriptorError::Empty("name"));
        }
        Ok(Self {
            version,
            chain_id,
            contract_addr,
            selector,
            id,
            value,
            name: name.to_string(),
            signature: None,
        })
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }
}

impl Descriptor for EnumValue {
    fn category(&self) -> Category {
        Category::Calldata
    }

    fn signature_tag(&self) -> u64 {
        TAG_SIGNATURE
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(TAG_VERSION, self.version);
        payload.extend(tlv::encode_int(TAG_CHAIN_ID, self.chain_id));
        payload.extend(tlv::encode_bytes(TAG_CONTRACT_ADDR, &self.contract_addr));
        payload.extend(tlv::encode_bytes(TAG_SELECTOR, &self.selector));
        payload.extend(tlv::encode_int(TAG_ID, self.id as u64));
        payload.extend(tlv::encode_int(TAG_VALUE, self.value as u64));
        payload.extend(tlv::encode_str(TAG_NAME, &self.name));
        payload
    }

    fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}
