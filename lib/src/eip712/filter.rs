// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Field-filtering / display-selection sub-protocol
//!
//! A filtered message shows only a curated subset of fields, each under an
//! authenticated display name. Every filter frame signs a variant-specific
//! magic byte, the message's signing context (chain id, verifying contract,
//! schema hash), the dotted field path and the display name, so a filter
//! valid for one message shape cannot be replayed against another.

use core::fmt::{Debug, Display};

use serde::Deserialize;
use serde_json::{Map, Value as Json};
use sha2::{Digest, Sha224};

use crate::error::Error;

/// Magic bytes separating the filter signature domains
pub(crate) const MAGIC_MESSAGE_INFO: u8 = 183;
pub(crate) const MAGIC_AMOUNT_JOIN_TOKEN: u8 = 11;
pub(crate) const MAGIC_AMOUNT_JOIN_VALUE: u8 = 22;
pub(crate) const MAGIC_DATETIME: u8 = 33;
pub(crate) const MAGIC_TRUSTED_NAME: u8 = 44;
pub(crate) const MAGIC_RAW: u8 = 72;

/// Caller-supplied display selection for one message shape
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageFilters {
    /// Display name of the message; falls back to the domain name
    #[serde(default)]
    pub name: Option<String>,

    /// Overrides the domain's verifying contract in the signing context
    #[serde(default)]
    pub address: Option<String>,

    /// Token metadata referenced by join filters; empty entries are
    /// placeholders keeping later indexes stable
    #[serde(default)]
    pub tokens: Vec<TokenRef>,

    /// Ordered dotted-path to filter map
    #[serde(default)]
    pub fields: Map<String, Json>,
}

impl MessageFilters {
    /// Parse the raw field map into ordered `(path, filter)` pairs
    pub(crate) fn parsed_fields<E: Display + Debug>(
        &self,
    ) -> Result<Vec<(String, FieldFilter)>, Error<E>> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (path, raw) in &self.fields {
            let filter: FieldFilter = serde_json::from_value(raw.clone())
                .map_err(|_| Error::InvalidValue(path.clone()))?;
            fields.push((path.clone(), filter));
        }
        Ok(fields)
    }
}

/// Token metadata entry referenced by join filters
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenRef {
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub chain_id: u32,
}

impl TokenRef {
    /// Placeholder entries carry no metadata to deliver
    pub fn is_placeholder(&self) -> bool {
        self.addr.is_none()
    }
}

/// One registered field filter
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldFilter {
    /// Token half of an amount join; no token index means the verifying
    /// contract itself is the token (ERC-2612 permit)
    AmountJoinToken {
        #[serde(default)]
        token: Option<usize>,
    },

    /// Value half of an amount join
    AmountJoinValue {
        name: String,
        #[serde(default)]
        token: Option<usize>,
    },

    /// Display as a date
    Datetime { name: String },

    /// Display through matching trusted-name records
    TrustedName {
        name: String,
        #[serde(default)]
        tn_type: Vec<u8>,
        #[serde(default)]
        tn_source: Vec<u8>,
    },

    /// Verbatim display under a custom name
    Raw { name: String },
}

/// Per-message signing context shared by every filter signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SigningContext {
    chain_id: [u8; 8],
    contract_addr: [u8; 20],
    schema_hash: [u8; 28],
}

impl SigningContext {
    /// Build the context from the declared types, domain and filters
    pub fn new<E: Display + Debug>(
        types: &Map<String, Json>,
        domain: &Json,
        filters: &MessageFilters,
    ) -> Result<Self, Error<E>> {
        let chain_id = match domain.get("chainId") {
            None => 0,
            Some(v) => json_u64(v).ok_or_else(|| Error::InvalidValue("chainId".to_string()))?,
        };

        let addr_str = match &filters.address {
            Some(a) => a.as_str(),
            None => domain
                .get("verifyingContract")
                .and_then(Json::as_str)
                .unwrap_or("0x0000000000000000000000000000000000000000"),
        };
        let addr = hex::decode(addr_str.trim_start_matches("0x"))
            .map_err(|_| Error::InvalidValue("verifyingContract".to_string()))?;
        let contract_addr: [u8; 20] = addr
            .try_into()
            .map_err(|_| Error::InvalidValue("verifyingContract".to_string()))?;

        // canonical schema form: compact JSON of the declared types, in
        // declaration order
        let schema = serde_json::to_string(types)
            .map_err(|_| Error::InvalidValue("types".to_string()))?;
        let schema_hash: [u8; 28] = Sha224::digest(schema.as_bytes()).into();

        Ok(Self {
            chain_id: chain_id.to_be_bytes(),
            contract_addr,
            schema_hash,
        })
    }

    /// Common signature payload prefix: magic, chain id, contract, schema
    /// hash
    pub fn payload(&self, magic: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 8 + 20 + 28);
        out.push(magic);
        out.extend_from_slice(&self.chain_id);
        out.extend_from_slice(&self.contract_addr);
        out.extend_from_slice(&self.schema_hash);
        out
    }
}

fn json_u64(value: &Json) -> Option<u64> {
    match value {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => {
            if let Some(hex_digits) = s.strip_prefix("0x") {
                u64::from_str_radix(hex_digits, 16).ok()
            } else {
                s.parse().ok()
            }
        }
        _ => None,
    }
}
