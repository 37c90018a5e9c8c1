// Copyright (c) 2022-2023 The MobileCoin Foundation

//! EIP-712 structured-data encoder
//!
//! Walks a caller-supplied type graph and value tree and produces the
//! ordered frame sequence the device consumes: type definitions, optional
//! filtering activation, the domain implementation, an optional signed
//! message-info frame, the message implementation and the final sign frame.
//!
//! The encoder is a pure frame generator with all per-message state (signing
//! context, filter registry, token sent-flags, current path) owned by one
//! instance created per message; frames are transmitted strictly one at a
//! time by the device handle afterwards. Nothing in the stream depends on
//! device responses, which keeps encoding testable without a transport.

use core::fmt::{Debug, Display};
use core::marker::PhantomData;

use log::debug;
use serde_json::Value as Json;

use ledger_eth_apdu::{
    eip712 as wire, eip712::FieldType, path::DerivationPath, provide, ApduFrame,
};

use crate::{
    descriptor::TokenMetadata,
    error::Error,
    keychain::{Category, Keychain},
};

mod filter;
mod types;

pub use filter::{FieldFilter, MessageFilters, TokenRef};
pub use types::TypedData;

use filter::{
    SigningContext, MAGIC_AMOUNT_JOIN_TOKEN, MAGIC_AMOUNT_JOIN_VALUE, MAGIC_DATETIME,
    MAGIC_MESSAGE_INFO, MAGIC_RAW, MAGIC_TRUSTED_NAME,
};
use types::{encode_value, FieldDef, TypeGraph};

/// Root struct name of the domain pass
const DOMAIN_TYPE: &str = "EIP712Domain";

/// Token index standing for the verifying contract itself
const TOKEN_IDX_SELF: u8 = 0xff;

/// Complete frame sequence for `data`, ending with the streaming sign frame
pub fn typed_data_frames<E: Display + Debug>(
    keychain: &Keychain,
    data: &TypedData,
    filters: Option<&MessageFilters>,
    path: &DerivationPath,
) -> Result<Vec<ApduFrame>, Error<E>> {
    let mut frames = message_frames(keychain, data, filters)?;
    frames.push(wire::sign_new(path));
    Ok(frames)
}

/// Complete frame sequence finalised with the legacy two-hash sign frame
///
/// The hashes come from an external typed-data library; this protocol never
/// computes them.
pub fn typed_data_frames_legacy<E: Display + Debug>(
    keychain: &Keychain,
    data: &TypedData,
    filters: Option<&MessageFilters>,
    path: &DerivationPath,
    domain_hash: &[u8; 32],
    message_hash: &[u8; 32],
) -> Result<Vec<ApduFrame>, Error<E>> {
    let mut frames = message_frames(keychain, data, filters)?;
    frames.push(wire::sign_legacy(path, domain_hash, message_hash));
    Ok(frames)
}

/// Message stream without the trailing sign frame
pub fn message_frames<E: Display + Debug>(
    keychain: &Keychain,
    data: &TypedData,
    filters: Option<&MessageFilters>,
) -> Result<Vec<ApduFrame>, Error<E>> {
    let graph = TypeGraph::parse(&data.types)?;
    let mut encoder = Encoder::new(keychain, data, filters)?;
    encoder.run(&graph, data)?;
    Ok(encoder.frames)
}

struct TokenEntry {
    meta: Option<TokenMetadata>,
    sent: bool,
}

/// Per-message encoding state
struct Encoder<'a, E: Display + Debug> {
    keychain: &'a Keychain,
    /// Filtering mode requested for this message
    active: bool,
    ctx: Option<SigningContext>,
    display_name: Option<String>,
    filters: Vec<(String, FieldFilter)>,
    tokens: Vec<TokenEntry>,
    frames: Vec<ApduFrame>,
    _err: PhantomData<E>,
}

impl<'a, E: Display + Debug> Encoder<'a, E> {
    fn new(
        keychain: &'a Keychain,
        data: &TypedData,
        filters: Option<&MessageFilters>,
    ) -> Result<Self, Error<E>> {
        let mut encoder = Self {
            keychain,
            active: false,
            ctx: None,
            display_name: None,
            filters: Vec::new(),
            tokens: Vec::new(),
            frames: Vec::new(),
            _err: PhantomData,
        };

        if let Some(filters) = filters {
            encoder.active = true;
            encoder.ctx = Some(SigningContext::new(&data.types, &data.domain, filters)?);
            encoder.display_name = filters.name.clone();
            encoder.filters = filters.parsed_fields()?;
            for token in &filters.tokens {
                encoder.tokens.push(TokenEntry {
                    meta: token_metadata(token)?,
                    sent: false,
                });
            }
        }
        Ok(encoder)
    }

    fn run(&mut self, graph: &TypeGraph, data: &TypedData) -> Result<(), Error<E>> {
        debug!(
            "encoding typed data: {} structs, filtering {}",
            graph.structs.len(),
            if self.active { "on" } else { "off" },
        );

        // definition pass
        for def in &graph.structs {
            self.frames.push(wire::struct_def_name(&def.name)?);
            for field in &def.fields {
                self.frames.push(wire::struct_def_field(
                    field.field_type,
                    &field.type_name,
                    field.type_size,
                    &field.array_levels,
                    &field.name,
                )?);
            }
        }

        // filtering must activate before any implementation data
        if self.active {
            self.frames.push(wire::filtering_activate());
        }

        // implementation pass: domain, then message
        self.frames.push(wire::struct_impl_root(DOMAIN_TYPE)?);
        self.send_struct(graph, &data.domain, DOMAIN_TYPE, &[])?;

        if self.active {
            let name = match &self.display_name {
                Some(name) => name.clone(),
                None => data
                    .domain
                    .get("name")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            self.send_message_info(&name)?;
        }

        self.frames.push(wire::struct_impl_root(&data.primary_type)?);
        self.send_struct(graph, &data.message, &data.primary_type, &[])
    }

    fn send_struct(
        &mut self,
        graph: &TypeGraph,
        value: &Json,
        struct_name: &str,
        path: &[String],
    ) -> Result<(), Error<E>> {
        let def = graph.get(struct_name)?;
        for field in &def.fields {
            let sub = value
                .get(&field.name)
                .ok_or_else(|| Error::MissingValue(field.name.clone()))?;
            self.evaluate_field(graph, sub, field, path, field.array_levels.len(), true)?;
        }
        Ok(())
    }

    fn evaluate_field(
        &mut self,
        graph: &TypeGraph,
        value: &Json,
        field: &FieldDef,
        path: &[String],
        levels_left: usize,
        new_level: bool,
    ) -> Result<(), Error<E>> {
        let mut current = path.to_vec();
        if new_level {
            current.push(field.name.clone());
        }

        if !field.array_levels.is_empty() && levels_left > 0 {
            let items = value
                .as_array()
                .ok_or_else(|| Error::InvalidValue(field.name.clone()))?;

            // the one place a size contract is enforced against live data
            if let Some(declared) = field.array_levels[levels_left - 1] {
                if declared as usize != items.len() {
                    return Err(Error::ArraySizeMismatch {
                        expected: declared as usize,
                        actual: items.len(),
                    });
                }
            }
            if items.len() > u8::MAX as usize {
                return Err(Error::Overflow);
            }
            self.frames.push(wire::struct_impl_array(items.len() as u8));

            // a collapsed array still owes one acknowledgement per filter
            // path underneath it
            if items.is_empty() {
                let prefix = format!("{}.[]", current.join("."));
                let discarded: Vec<String> = self
                    .filters
                    .iter()
                    .map(|(p, _)| p.clone())
                    .filter(|p| p.starts_with(&prefix))
                    .collect();
                for p in discarded {
                    self.frames.push(wire::filtering_discarded_path(&p)?);
                    self.send_filter(&p, true)?;
                }
            }

            for item in items {
                let mut sub = current.clone();
                sub.push("[]".to_string());
                self.evaluate_field(graph, item, field, &sub, levels_left - 1, false)?;
            }
            return Ok(());
        }

        if field.field_type == FieldType::Custom {
            self.send_struct(graph, value, &field.type_name, &current)
        } else {
            self.send_leaf(value, field, &current)
        }
    }

    fn send_leaf(
        &mut self,
        value: &Json,
        field: &FieldDef,
        path: &[String],
    ) -> Result<(), Error<E>> {
        let data = encode_value(field, value)?;

        if self.active {
            let dotted = path.join(".");
            if self.filters.iter().any(|(p, _)| *p == dotted) {
                self.send_filter(&dotted, false)?;
            }
        }

        self.frames.extend(wire::struct_impl_field(&data)?);
        Ok(())
    }

    fn ctx_payload(&self, magic: u8) -> Result<Vec<u8>, Error<E>> {
        self.ctx
            .as_ref()
            .map(|ctx| ctx.payload(magic))
            .ok_or_else(|| Error::InvalidValue("filtering context".to_string()))
    }

    fn send_message_info(&mut self, name: &str) -> Result<(), Error<E>> {
        let count = self.filters.len();
        if count > u8::MAX as usize {
            return Err(Error::Overflow);
        }

        let mut to_sign = self.ctx_payload(MAGIC_MESSAGE_INFO)?;
        to_sign.push(count as u8);
        to_sign.extend_from_slice(name.as_bytes());
        let sig = self.keychain.sign(Category::Cal, &to_sign)?;

        self.frames
            .push(wire::filtering_message_info(name, count as u8, &sig)?);
        Ok(())
    }

    fn send_filter(&mut self, path: &str, discarded: bool) -> Result<(), Error<E>> {
        let filter = self
            .filters
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, f)| f.clone())
            .ok_or_else(|| Error::InvalidValue(path.to_string()))?;

        match filter {
            FieldFilter::AmountJoinToken { token } => {
                let idx = self.resolve_token(token)?;
                let mut to_sign = self.ctx_payload(MAGIC_AMOUNT_JOIN_TOKEN)?;
                to_sign.extend_from_slice(path.as_bytes());
                to_sign.push(idx);
                let sig = self.keychain.sign(Category::Cal, &to_sign)?;
                self.frames
                    .push(wire::filtering_amount_join_token(idx, &sig, discarded)?);
            }
            FieldFilter::AmountJoinValue { name, token } => {
                let idx = self.resolve_token(token)?;
                let mut to_sign = self.ctx_payload(MAGIC_AMOUNT_JOIN_VALUE)?;
                to_sign.extend_from_slice(path.as_bytes());
                to_sign.extend_from_slice(name.as_bytes());
                to_sign.push(idx);
                let sig = self.keychain.sign(Category::Cal, &to_sign)?;
                self.frames.push(wire::filtering_amount_join_value(
                    idx, &name, &sig, discarded,
                )?);
            }
            FieldFilter::Datetime { name } => {
                let mut to_sign = self.ctx_payload(MAGIC_DATETIME)?;
                to_sign.extend_from_slice(path.as_bytes());
                to_sign.extend_from_slice(name.as_bytes());
                let sig = self.keychain.sign(Category::Cal, &to_sign)?;
                self.frames
                    .push(wire::filtering_datetime(&name, &sig, discarded)?);
            }
            FieldFilter::TrustedName {
                name,
                tn_type,
                tn_source,
            } => {
                let mut to_sign = self.ctx_payload(MAGIC_TRUSTED_NAME)?;
                to_sign.extend_from_slice(path.as_bytes());
                to_sign.extend_from_slice(name.as_bytes());
                to_sign.extend_from_slice(&tn_type);
                to_sign.extend_from_slice(&tn_source);
                let sig = self.keychain.sign(Category::Cal, &to_sign)?;
                self.frames.push(wire::filtering_trusted_name(
                    &name, &tn_type, &tn_source, &sig, discarded,
                )?);
            }
            FieldFilter::Raw { name } => {
                let mut to_sign = self.ctx_payload(MAGIC_RAW)?;
                to_sign.extend_from_slice(path.as_bytes());
                to_sign.extend_from_slice(name.as_bytes());
                let sig = self.keychain.sign(Category::Cal, &to_sign)?;
                self.frames.push(wire::filtering_raw(&name, &sig, discarded)?);
            }
        }
        Ok(())
    }

    /// Resolve a filter's token reference, delivering its metadata first
    ///
    /// No index means the verifying contract itself is the token: entry 0
    /// still ships, but the frame carries the self-token marker.
    fn resolve_token(&mut self, token: Option<usize>) -> Result<u8, Error<E>> {
        match token {
            Some(idx) => {
                if idx >= self.tokens.len() || idx >= TOKEN_IDX_SELF as usize {
                    return Err(Error::InvalidValue(format!("token index {idx}")));
                }
                self.send_token_metadata(idx)?;
                Ok(idx as u8)
            }
            None => {
                if self.tokens.is_empty() {
                    return Err(Error::InvalidValue("token index".to_string()));
                }
                self.send_token_metadata(0)?;
                Ok(TOKEN_IDX_SELF)
            }
        }
    }

    /// Deliver token metadata at most once per message
    fn send_token_metadata(&mut self, idx: usize) -> Result<(), Error<E>> {
        let keychain = self.keychain;
        let entry = &mut self.tokens[idx];
        if let Some(meta) = &entry.meta {
            if !entry.sent {
                let payload = meta.serialize(keychain)?;
                self.frames
                    .push(provide::provide_erc20_token_information(payload)?);
                entry.sent = true;
            }
        }
        Ok(())
    }
}

/// Build the token descriptor for a non-placeholder entry
fn token_metadata<E: Display + Debug>(
    token: &TokenRef,
) -> Result<Option<TokenMetadata>, Error<E>> {
    if token.is_placeholder() {
        return Ok(None);
    }

    let bad = || Error::InvalidValue("token".to_string());
    let addr_str = token.addr.as_deref().unwrap_or_default();
    let bytes = hex::decode(addr_str.trim_start_matches("0x")).map_err(|_| bad())?;
    let addr: [u8; 20] = bytes.try_into().map_err(|_| bad())?;
    let ticker = token.ticker.as_deref().ok_or_else(bad)?;

    Ok(Some(TokenMetadata::new(
        ticker,
        addr,
        token.decimals,
        token.chain_id,
    )?))
}
