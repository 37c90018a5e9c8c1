// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Generic calldata schema
//!
//! The device cannot run an ABI decoder for arbitrary contracts. Instead a
//! schema names, types and locates each displayable value inside the raw
//! calldata: a [`Field`] pairs a display name with a [`Param`] rendering
//! recipe, each built on [`Value`] sources (a calldata path, an enclosing
//! transaction parameter, or a constant). The ordered field list is hashed
//! into an instruction hash that the signed [`TxInfo`] record binds to one
//! `(chain id, contract, selector)` tuple: any mutation or reordering of the
//! fields invalidates the binding.

use ledger_eth_apdu::tlv;
use sha3::{Digest, Sha3_256};
use thiserror::Error;

use crate::{
    descriptor::{Descriptor, TrustedNameSource, TrustedNameType},
    keychain::Category,
};

mod path;
pub use path::{build_path, AbiParam, DataPath, LeafType, PathElement};

/// Schema construction errors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GcsError {
    /// ABI type string outside the supported grammar
    #[error("unsupported ABI type '{0}'")]
    UnsupportedType(String),

    /// Joined onto a path that does not terminate in a leaf
    #[error("data path does not terminate in a leaf")]
    UnterminatedPath,

    /// Array element head size exceeds the one-byte weight encoding
    #[error("array element weight too large ({0} words)")]
    WeightTooLarge(u64),
}

/// Solidity type families a value can decode as
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeFamily {
    Uint = 0x01,
    Int = 0x02,
    Ufixed = 0x03,
    Fixed = 0x04,
    Address = 0x05,
    Bool = 0x06,
    Bytes = 0x07,
    String = 0x08,
}

/// Transaction parameters a value can read instead of calldata
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ContainerPath {
    From = 0x00,
    To = 0x01,
    Value = 0x02,
}

// Value record tags
const VALUE_TAG_VERSION: u64 = 0x00;
const VALUE_TAG_TYPE_FAMILY: u64 = 0x01;
const VALUE_TAG_TYPE_SIZE: u64 = 0x02;
const VALUE_TAG_DATA_PATH: u64 = 0x03;
const VALUE_TAG_CONTAINER_PATH: u64 = 0x04;
const VALUE_TAG_CONSTANT: u64 = 0x05;

/// Where a displayable value comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueSource {
    /// Located inside the calldata by a path program
    Calldata(DataPath),
    /// Read from an enclosing transaction parameter
    Container(ContainerPath),
    /// Fixed bytes embedded in the schema
    Constant(Vec<u8>),
}

/// A typed value source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    family: TypeFamily,
    type_size: Option<u8>,
    source: ValueSource,
}

impl Value {
    /// Value read from calldata
    pub fn calldata(family: TypeFamily, path: DataPath) -> Self {
        Self {
            family,
            type_size: None,
            source: ValueSource::Calldata(path),
        }
    }

    /// Value read from an enclosing transaction parameter
    pub fn container(family: TypeFamily, container: ContainerPath) -> Self {
        Self {
            family,
            type_size: None,
            source: ValueSource::Container(container),
        }
    }

    /// Constant value embedded in the schema
    pub fn constant(family: TypeFamily, bytes: &[u8]) -> Self {
        Self {
            family,
            type_size: None,
            source: ValueSource::Constant(bytes.to_vec()),
        }
    }

    /// Declare the encoded size in bytes (1 to 32)
    pub fn with_size(mut self, size: u8) -> Self {
        self.type_size = Some(size);
        self
    }

    fn serialize(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(VALUE_TAG_VERSION, 1);
        payload.extend(tlv::encode_int(
            VALUE_TAG_TYPE_FAMILY,
            self.family as u64,
        ));
        if let Some(size) = self.type_size {
            payload.extend(tlv::encode_int(VALUE_TAG_TYPE_SIZE, size as u64));
        }
        match &self.source {
            ValueSource::Calldata(path) => {
                payload.extend(tlv::encode_bytes(VALUE_TAG_DATA_PATH, &path.serialize()));
            }
            ValueSource::Container(container) => {
                payload.extend(tlv::encode_int(
                    VALUE_TAG_CONTAINER_PATH,
                    *container as u64,
                ));
            }
            ValueSource::Constant(bytes) => {
                payload.extend(tlv::encode_bytes(VALUE_TAG_CONSTANT, bytes));
            }
        }
        payload
    }
}

/// Display variants a field can render as
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamType {
    Raw = 0x00,
    Amount = 0x01,
    TokenAmount = 0x02,
    Nft = 0x03,
    Datetime = 0x04,
    Duration = 0x05,
    Unit = 0x06,
    Enum = 0x07,
    TrustedName = 0x08,
}

/// How a datetime value is interpreted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DatetimeKind {
    Unix = 0x00,
    BlockHeight = 0x01,
}

/// A rendering recipe for one displayable value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Param {
    /// Verbatim display of the decoded value
    Raw { value: Value },

    /// Native-currency amount
    Amount { value: Value },

    /// Token amount joined with token metadata for ticker and decimals
    TokenAmount {
        value: Value,
        token: Option<Value>,
        native_currencies: Vec<Value>,
        threshold: Option<Vec<u8>>,
        above_threshold_message: Option<String>,
    },

    /// NFT identified by token id within a collection
    Nft { id: Value, collection: Value },

    /// Timestamp or block height
    Datetime { value: Value, kind: DatetimeKind },

    /// Relative time span in seconds
    Duration { value: Value },

    /// Quantity with a fixed display unit
    Unit {
        value: Value,
        base: String,
        decimals: Option<u8>,
        prefix: Option<bool>,
    },

    /// Enum constant resolved through enum-value records
    Enum { id: u8, value: Value },

    /// Address displayed through the trusted-name records it matches
    TrustedName {
        value: Value,
        types: Vec<TrustedNameType>,
        sources: Vec<TrustedNameSource>,
    },
}

impl Param {
    /// Variant discriminant on the wire
    pub fn param_type(&self) -> ParamType {
        match self {
            Param::Raw { .. } => ParamType::Raw,
            Param::Amount { .. } => ParamType::Amount,
            Param::TokenAmount { .. } => ParamType::TokenAmount,
            Param::Nft { .. } => ParamType::Nft,
            Param::Datetime { .. } => ParamType::Datetime,
            Param::Duration { .. } => ParamType::Duration,
            Param::Unit { .. } => ParamType::Unit,
            Param::Enum { .. } => ParamType::Enum,
            Param::TrustedName { .. } => ParamType::TrustedName,
        }
    }

    fn serialize(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(0x00, 1); // param version
        match self {
            Param::Raw { value } | Param::Amount { value } | Param::Duration { value } => {
                payload.extend(tlv::encode_bytes(0x01, &value.serialize()));
            }
            Param::TokenAmount {
                value,
                token,
                native_currencies,
                threshold,
                above_threshold_message,
            } => {
                payload.extend(tlv::encode_bytes(0x01, &value.serialize()));
                if let Some(token) = token {
                    payload.extend(tlv::encode_bytes(0x02, &token.serialize()));
                }
                for currency in native_currencies {
                    payload.extend(tlv::encode_bytes(0x03, &currency.serialize()));
                }
                if let Some(threshold) = threshold {
                    payload.extend(tlv::encode_bytes(0x04, threshold));
                }
                if let Some(message) = above_threshold_message {
                    payload.extend(tlv::encode_str(0x05, message));
                }
            }
            Param::Nft { id, collection } => {
                payload.extend(tlv::encode_bytes(0x01, &id.serialize()));
                payload.extend(tlv::encode_bytes(0x02, &collection.serialize()));
            }
            Param::Datetime { value, kind } => {
                payload.extend(tlv::encode_bytes(0x01, &value.serialize()));
                payload.extend(tlv::encode_int(0x02, *kind as u64));
            }
            Param::Unit {
                value,
                base,
                decimals,
                prefix,
            } => {
                payload.extend(tlv::encode_bytes(0x01, &value.serialize()));
                payload.extend(tlv::encode_str(0x02, base));
                if let Some(decimals) = decimals {
                    payload.extend(tlv::encode_int(0x03, *decimals as u64));
                }
                if let Some(prefix) = prefix {
                    payload.extend(tlv::encode_int(0x04, *prefix as u64));
                }
            }
            Param::Enum { id, value } => {
                payload.extend(tlv::encode_int(0x01, *id as u64));
                payload.extend(tlv::encode_bytes(0x02, &value.serialize()));
            }
            Param::TrustedName {
                value,
                types,
                sources,
            } => {
                payload.extend(tlv::encode_bytes(0x01, &value.serialize()));
                let types: Vec<u8> = types.iter().map(|t| *t as u8).collect();
                payload.extend(tlv::encode_bytes(0x02, &types));
                let sources: Vec<u8> = sources.iter().map(|s| *s as u8).collect();
                payload.extend(tlv::encode_bytes(0x03, &sources));
            }
        }
        payload
    }
}

// Field record tags
const FIELD_TAG_VERSION: u64 = 0x00;
const FIELD_TAG_NAME: u64 = 0x01;
const FIELD_TAG_PARAM_TYPE: u64 = 0x02;
const FIELD_TAG_PARAM: u64 = 0x03;

/// One displayable field: a name and its rendering recipe
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    param: Param,
}

impl Field {
    /// Build a field displayed under `name`
    pub fn new(name: &str, param: Param) -> Self {
        Self {
            name: name.to_string(),
            param,
        }
    }

    /// TLV body delivered to the device (and hashed into the instruction
    /// hash)
    pub fn serialize(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(FIELD_TAG_VERSION, 1);
        payload.extend(tlv::encode_str(FIELD_TAG_NAME, &self.name));
        payload.extend(tlv::encode_int(
            FIELD_TAG_PARAM_TYPE,
            self.param.param_type() as u64,
        ));
        payload.extend(tlv::encode_bytes(FIELD_TAG_PARAM, &self.param.serialize()));
        payload
    }
}

/// Hash binding an ordered field list: SHA3-256 over each field's serialized
/// bytes, concatenated in list order
pub fn instruction_hash(fields: &[Field]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    for field in fields {
        hasher.update(field.serialize());
    }
    hasher.finalize().into()
}

// TxInfo record tags (local numbering, like the other calldata records)
const TXINFO_TAG_VERSION: u64 = 0x00;
const TXINFO_TAG_CHAIN_ID: u64 = 0x01;
const TXINFO_TAG_CONTRACT_ADDR: u64 = 0x02;
const TXINFO_TAG_SELECTOR: u64 = 0x03;
const TXINFO_TAG_FIELDS_HASH: u64 = 0x04;
const TXINFO_TAG_OPERATION_TYPE: u64 = 0x05;
const TXINFO_TAG_CREATOR_NAME: u64 = 0x06;
const TXINFO_TAG_CREATOR_LEGAL_NAME: u64 = 0x07;
const TXINFO_TAG_CREATOR_URL: u64 = 0x08;
const TXINFO_TAG_CONTRACT_NAME: u64 = 0x09;
const TXINFO_TAG_DEPLOY_DATE: u64 = 0x0a;
const TXINFO_TAG_SIGNATURE: u64 = 0xff;

/// Transaction-info record binding an instruction hash to one transaction
/// shape
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInfo {
    version: u64,
    chain_id: u64,
    contract_addr: [u8; 20],
    selector: [u8; 4],
    fields_hash: [u8; 32],
    operation_type: String,
    creator_name: Option<String>,
    creator_legal_name: Option<String>,
    creator_url: Option<String>,
    contract_name: Option<String>,
    deploy_date: Option<u32>,
    signature: Option<Vec<u8>>,
}

impl TxInfo {
    /// Build a transaction-info record
    ///
    /// `fields_hash` comes from [`instruction_hash`] over the finalized field
    /// list.
    pub fn new(
        version: u64,
        chain_id: u64,
        contract_addr: [u8; 20],
        selector: [u8; 4],
        fields_hash: [u8; 32],
        operation_type: &str,
    ) -> Self {
        Self {
            version,
            chain_id,
            contract_addr,
            selector,
            fields_hash,
            operation_type: operation_type.to_string(),
            creator_name: None,
            creator_legal_name: None,
            creator_url: None,
            contract_name: None,
            deploy_date: None,
            signature: None,
        }
    }

    pub fn with_creator(mut self, name: &str, legal_name: &str, url: &str) -> Self {
        self.creator_name = Some(name.to_string());
        self.creator_legal_name = Some(legal_name.to_string());
        self.creator_url = Some(url.to_string());
        self
    }

    pub fn with_contract_name(mut self, name: &str) -> Self {
        self.contract_name = Some(name.to_string());
        self
    }

    /// Deployment date as a Unix timestamp
    pub fn with_deploy_date(mut self, date: u32) -> Self {
        self.deploy_date = Some(date);
        self
    }

    /// Use an externally computed signature instead of the keychain
    pub fn with_signature(mut self, sig: &[u8]) -> Self {
        self.signature = Some(sig.to_vec());
        self
    }
}

impl Descriptor for TxInfo {
    fn category(&self) -> Category {
        Category::Cal
    }

    fn signature_tag(&self) -> u64 {
        TXINFO_TAG_SIGNATURE
    }

    fn body(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(TXINFO_TAG_VERSION, self.version);
        payload.extend(tlv::encode_int(TXINFO_TAG_CHAIN_ID, self.chain_id));
        payload.extend(tlv::encode_bytes(
            TXINFO_TAG_CONTRACT_ADDR,
            &self.contract_addr,
        ));
        payload.extend(tlv::encode_bytes(TXINFO_TAG_SELECTOR, &self.selector));
        payload.extend(tlv::encode_bytes(TXINFO_TAG_FIELDS_HASH, &self.fields_hash));
        payload.extend(tlv::encode_str(
            TXINFO_TAG_OPERATION_TYPE,
            &self.operation_type,
        ));
        if let Some(name) = &self.creator_name {
            payload.extend(tlv::encode_str(TXINFO_TAG_CREATOR_NAME, name));
        }
        if let Some(name) = &self.creator_legal_name {
            payload.extend(tlv::encode_str(TXINFO_TAG_CREATOR_LEGAL_NAME, name));
        }
        if let Some(url) = &self.creator_url {
            payload.extend(tlv::encode_str(TXINFO_TAG_CREATOR_URL, url));
        }
        if let Some(name) = &self.contract_name {
            payload.extend(tlv::encode_str(TXINFO_TAG_CONTRACT_NAME, name));
        }
        if let Some(date) = self.deploy_date {
            payload.extend(tlv::encode_int(TXINFO_TAG_DEPLOY_DATE, date as u64));
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

    fn raw_field(name: &str, index: u16) -> Field {
        let path = build_path(
            &AbiParam {
                name: name.to_string(),
                kind: "uint256".to_string(),
                components: vec![],
            },
            index,
        )
        .unwrap();
        Field::new(name, Param::Raw {
            value: Value::calldata(TypeFamily::Uint, path).with_size(32),
        })
    }

    #[test]
    fn instruction_hash_is_order_sensitive() {
        let a = raw_field("amount", 0);
        let b = raw_field("deadline", 1);

        let forward = instruction_hash(&[a.clone(), b.clone()]);
        let reversed = instruction_hash(&[b, a]);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn instruction_hash_is_stable() {
        let fields = vec![raw_field("amount", 0), raw_field("deadline", 1)];
        assert_eq!(instruction_hash(&fields), instruction_hash(&fields));
    }
}
