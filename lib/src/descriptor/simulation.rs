// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction-simulation verdict descriptor

use ledger_eth_apdu::tlv;

use super::{tag, Descriptor, DescriptorError};
use crate::keychain::Category;

const STRUCT_TYPE: u64 = 0x09;

/// What was simulated
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SimulationType {
    Transaction = 0x00,
    TypedData = 0x01,
    PersonalMessage = 0x02,
}

/// Third-party simulation verdict for one pending operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSimulation {
    simulation_type: SimulationType,
    from_addr: [u8; 20],
    tx_hash: [u8; 32],
    risk: u16,
    category: u8,
    tiny_url: String,
    chain_id: Option<u64>,
    domain_hash: Option<[u8; 32]>,
    provider_message: Option<String>,
    signature: Option<Vec<u8>>,
}

impl TxSimulation {
    /// Build a simulation verdict for the operation hashed as `tx_hash`
    pub fn new(
        simulation_type: SimulationType,
        from_addr: [u8; 20],
        tx_hash: [u8; 32],
        risk: u16,
        category: u8,
        tiny_url: &str,
    ) -> Result<Self, DescriptorError> {
        if tiny_url.is_empty() {
            return Err(DescriptorError::Empty("tiny_url"));
        }
        Ok(Self {
            simulation_type,
            from_addr,
            tx_hash,
            risk,
            category,
            tiny_url: tiny_url.to_string(),
            chain_id: None,
            domain_hash: None,
            provider_message: None,
            signature: None,
        })
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Typed-data verdicts also pin the domain separator
    pub fn with_domain_hash(mut self, hash: [u8; 32]) -> Self {
        self.domain_hash = Some(hash);
        self
    }

    pub fn with_provider_message(mut self, message: &str) -> Self {
        self.provider_message = Some(message.to_string());
        self
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }
}

impl Descriptor for TxSimulation {
    fn category(&self) -> Category {
        Category::Web3Check
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(tag::STRUCT_TYPE, STRUCT_TYPE);
        payload.extend(tlv::encode_int(tag::STRUCT_VERSION, 1));
        payload.extend(tlv::encode_int(tag::TX_TYPE, self.simulation_type as u64));
        payload.extend(tlv::encode_bytes(tag::ADDRESS, &self.from_addr));
        payload.extend(tlv::encode_bytes(tag::TX_HASH, &self.tx_hash));
        payload.extend(tlv::encode_int(tag::NORMALIZED_RISK, self.risk as u64));
        payload.extend(tlv::encode_int(
            tag::NORMALIZED_CATEGORY,
            self.category as u64,
        ));
        payload.extend(tlv::encode_str(tag::TINY_URL, &self.tiny_url));
        if let Some(chain_id) = self.chain_id {
            payload.extend(tlv::encode_bytes(tag::CHAIN_ID, &chain_id.to_be_bytes()));
        }
        if let Some(hash) = &self.domain_hash {
            payload.extend(tlv::encode_bytes(tag::DOMAIN_HASH, hash));
        }
        if let Some(message) = &self.provider_message {
            payload.extend(tlv::encode_str(tag::PROVIDER_MSG, message));
        }
        payload
    }

    fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}
