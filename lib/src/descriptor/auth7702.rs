// Copyright (c) 2022-2023 The MobileCoin Foundation

//! EIP-7702 delegation authorization
//!
//! Unsigned on the host side: the record describes what the device itself is
//! asked to sign, so it carries no authenticating suffix.

use ledger_eth_apdu::{path::DerivationPath, tlv};

// Local tag numbering, this record never shares a parser with the
// descriptor family
const TAG_STRUCT_VERSION: u64 = 0x00;
const TAG_DERIVATION_IDX: u64 = 0x01;
const TAG_DELEGATE_ADDR: u64 = 0x02;
const TAG_CHAIN_ID: u64 = 0x03;
const TAG_NONCE: u64 = 0x04;

/// Delegation authorization request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationAuthorization {
    path: DerivationPath,
    delegate: [u8; 20],
    nonce: u64,
    chain_id: u64,
}

impl DelegationAuthorization {
    /// Build an authorization delegating `path`'s account to `delegate`
    ///
    /// A chain id of zero authorizes every chain.
    pub fn new(path: DerivationPath, delegate: [u8; 20], nonce: u64, chain_id: u64) -> Self {
        Self {
            path,
            delegate,
            nonce,
            chain_id,
        }
    }

    /// TLV form consumed by the signing instruction
    pub fn serialize(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(TAG_STRUCT_VERSION, 1);
        for &component in self.path.components() {
            payload.extend(tlv::encode_bytes(
                TAG_DERIVATION_IDX,
                &component.to_be_bytes(),
            ));
        }
        payload.extend(tlv::encode_bytes(TAG_DELEGATE_ADDR, &self.delegate));
        payload.extend(tlv::encode_bytes(TAG_NONCE, &self.nonce.to_be_bytes()));
        payload.extend(tlv::encode_bytes(TAG_CHAIN_ID, &self.chain_id.to_be_bytes()));
        payload
    }
}
