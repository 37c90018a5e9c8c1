// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Gating banner descriptor: an authenticated interstitial the device shows
//! before a flagged operation

use ledger_eth_apdu::tlv;

use super::{tag, Descriptor, DescriptorError, TxType};
use crate::keychain::Category;

const STRUCT_TYPE: u64 = 0x0d;

/// Gating record
///
/// Plain transactions are keyed by chain id, typed-data messages by their
/// schema hash; each kind requires its own discriminator and never both are
/// optional at once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gating {
    tx_type: TxType,
    address: [u8; 20],
    intro_message: String,
    tiny_url: String,
    chain_id: Option<u64>,
    selector: Option<[u8; 32]>,
    signature: Option<Vec<u8>>,
}

impl Gating {
    /// Build a gating record
    pub fn new(
        tx_type: TxType,
        address: [u8; 20],
        intro_message: &str,
        tiny_url: &str,
        chain_id: Option<u64>,
        selector: Option<[u8; 32]>,
    ) -> Result<Self, DescriptorError> {
        if intro_message.is_empty() {
            return Err(DescriptorError::Empty("intro_message"));
        }
        if tiny_url.is_empty() {
            return Err(DescriptorError::Empty("tiny_url"));
        }
        if tx_type == TxType::Transaction && chain_id.is_none() {
            return Err(DescriptorError::MissingChainId);
        }
        if tx_type == TxType::TypedData && selector.is_none() {
            return Err(DescriptorError::MissingSelector);
        }
        Ok(Self {
            tx_type,
            address,
            intro_message: intro_message.to_string(),
            tiny_url: tiny_url.to_string(),
            chain_id,
            selector,
            signature: None,
        })
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }
}

impl Descriptor for Gating {
    fn category(&self) -> Category {
        Category::Gating
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(tag::STRUCT_TYPE, STRUCT_TYPE);
        payload.extend(tlv::encode_int(tag::STRUCT_VERSION, 1));
        payload.extend(tlv::encode_int(tag::TX_TYPE, self.tx_type as u64));
        payload.extend(tlv::encode_bytes(tag::ADDRESS, &self.address));
        if let Some(chain_id) = self.chain_id {
            payload.extend(tlv::encode_bytes(tag::CHAIN_ID, &chain_id.to_be_bytes()));
        }
        payload.extend(tlv::encode_str(tag::INTRO_MSG, &self.intro_message));
        payload.extend(tlv::encode_str(tag::TINY_URL, &self.tiny_url));
        if let Some(selector) = &self.selector {
            payload.extend(tlv::encode_bytes(tag::HASH_SELECTOR, selector));
        }
        payload
    }

    fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transaction_banner_requires_chain_id() {
        let err = Gating::new(
            TxType::Transaction,
            [0u8; 20],
            "intro",
            "url",
            None,
            None,
        );
        assert_eq!(err.unwrap_err(), DescriptorError::MissingChainId);
    }

    #[test]
    fn typed_data_banner_requires_selector() {
        let err = Gating::new(TxType::TypedData, [0u8; 20], "intro", "url", Some(1), None);
        assert_eq!(err.unwrap_err(), DescriptorError::MissingSelector);
    }
}
