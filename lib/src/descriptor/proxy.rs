// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Proxy-implementation descriptor: binds a proxy contract address to the
//! implementation address whose schema actually decodes its calldata

use ledger_eth_apdu::tlv;

use super::{tag, Descriptor};
use crate::keychain::Category;

const STRUCT_TYPE: u64 = 0x26;

/// Proxy resolution record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyInfo {
    challenge: u32,
    address: [u8; 20],
    chain_id: u64,
    selector: Option<[u8; 4]>,
    impl_address: [u8; 20],
    signature: Option<Vec<u8>>,
}

impl ProxyInfo {
    /// Build a proxy record mapping `address` to `impl_address`
    pub fn new(challenge: u32, address: [u8; 20], chain_id: u64, impl_address: [u8; 20]) -> Self {
        Self {
            challenge,
            address,
            chain_id,
            selector: None,
            impl_address,
            signature: None,
        }
    }

    /// Restrict the mapping to a single function selector
    pub fn with_selector(mut self, selector: [u8; 4]) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }
}

impl Descriptor for ProxyInfo {
    fn category(&self) -> Category {
        Category::Calldata
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(tag::STRUCT_TYPE, STRUCT_TYPE);
        payload.extend(tlv::encode_int(tag::STRUCT_VERSION, 1));
        payload.extend(tlv::encode_int(tag::CHALLENGE, self.challenge as u64));
        payload.extend(tlv::encode_bytes(tag::ADDRESS, &self.address));
        payload.extend(tlv::encode_int(tag::CHAIN_ID, self.chain_id));
        if let Some(selector) = &self.selector {
            payload.extend(tlv::encode_bytes(tag::SELECTOR, selector));
        }
        payload.extend(tlv::encode_bytes(tag::IMPL_ADDRESS, &self.impl_address));
        payload
    }

    fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}
