// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Safe / signer account descriptors
//!
//! A safe-type record describes a multisig account: exactly one address, a
//! role, a positive signing threshold and signer count. A signer-type record
//! lists member addresses and nothing else; the device only accepts it after
//! a safe record established the context.

use ledger_eth_apdu::tlv;

use super::{tag, Descriptor, DescriptorError};
use crate::keychain::Category;

const STRUCT_TYPE: u64 = 0x27;

/// Record flavour
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountType {
    Safe = 0x00,
    Signer = 0x01,
}

/// Role of the wallet key inside the multisig
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MultisigRole {
    Signer = 0x00,
    Proposer = 0x01,
}

/// Safe / signer account record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafeAccount {
    account_type: AccountType,
    challenge: u32,
    addresses: Vec<[u8; 20]>,
    role: Option<MultisigRole>,
    threshold: u64,
    signer_count: u64,
    signature: Option<Vec<u8>>,
}

impl SafeAccount {
    /// Build a safe-type record
    pub fn safe(
        challenge: u32,
        address: [u8; 20],
        role: MultisigRole,
        threshold: u64,
        signer_count: u64,
    ) -> Result<Self, DescriptorError> {
        if threshold == 0 || signer_count == 0 {
            return Err(DescriptorError::InvalidThreshold);
        }
        Ok(Self {
            account_type: AccountType::Safe,
            challenge,
            addresses: vec![address],
            role: Some(role),
            threshold,
            signer_count,
            signature: None,
        })
    }

    /// Build a signer-type record listing member addresses
    pub fn signer(challenge: u32, addresses: Vec<[u8; 20]>) -> Result<Self, DescriptorError> {
        if addresses.is_empty() {
            return Err(DescriptorError::NoAddresses);
        }
        Ok(Self {
            account_type: AccountType::Signer,
            challenge,
            addresses,
            role: None,
            threshold: 0,
            signer_count: 0,
            signature: None,
        })
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }

    /// Record flavour
    pub fn account_type(&self) -> AccountType {
        self.account_type
    }
}

impl Descriptor for SafeAccount {
    fn category(&self) -> Category {
        Category::Safe
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(tag::STRUCT_TYPE, STRUCT_TYPE);
        payload.extend(tlv::encode_int(tag::STRUCT_VERSION, 1));
        payload.extend(tlv::encode_int(tag::CHALLENGE, self.challenge as u64));
        for address in &self.addresses {
            payload.extend(tlv::encode_bytes(tag::ADDRESS, address));
        }
        if self.account_type == AccountType::Safe {
            // role presence is guaranteed by construction
            if let Some(role) = self.role {
                payload.extend(tlv::encode_int(tag::ROLE, role as u64));
            }
            payload.extend(tlv::encode_int(tag::THRESHOLD, self.threshold));
            payload.extend(tlv::encode_int(tag::SIGNERS_COUNT, self.signer_count));
        }
        payload
    }

    fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}
