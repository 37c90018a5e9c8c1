// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Typed-data input model
//!
//! The caller supplies the standard EIP-712 JSON document: a type graph, a
//! primary type name, and domain plus message value trees. The graph is
//! parsed once per message into a closed descriptor form (type family, fixed
//! size, array levels) and consumed by the encoder in two passes.

use core::fmt::{Debug, Display};

use serde::Deserialize;
use serde_json::{Map, Value as Json};

use ledger_eth_apdu::eip712::FieldType;

use crate::error::Error;

/// An EIP-712 message as supplied by the caller
///
/// Declared type order is preserved: it drives both the definition frame
/// order and the schema hash.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Type graph: type name to ordered field list
    pub types: Map<String, Json>,

    /// Root type of the message tree
    pub primary_type: String,

    /// Domain value tree
    pub domain: Json,

    /// Message value tree
    pub message: Json,
}

/// One parsed field of a struct definition
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FieldDef {
    pub name: String,
    /// Base type with array suffixes and size digits stripped; names the
    /// struct to recurse into for custom fields
    pub type_name: String,
    pub field_type: FieldType,
    pub type_size: Option<u8>,
    /// Array levels in declaration order (innermost first), `None` for
    /// dynamic bounds
    pub array_levels: Vec<Option<u8>>,
}

/// One struct of the type graph
#[derive(Clone, Debug)]
pub(crate) struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// The parsed type graph, in declaration order
#[derive(Clone, Debug)]
pub(crate) struct TypeGraph {
    pub structs: Vec<StructDef>,
}

impl TypeGraph {
    pub fn parse<E: Display + Debug>(types: &Map<String, Json>) -> Result<Self, Error<E>> {
        let mut structs = Vec::with_capacity(types.len());
        for (name, fields) in types {
            let defs = fields
                .as_array()
                .ok_or_else(|| Error::InvalidValue(name.clone()))?;

            let mut parsed = Vec::with_capacity(defs.len());
            for def in defs {
                let field_name = def
                    .get("name")
                    .and_then(Json::as_str)
                    .ok_or_else(|| Error::InvalidValue(name.clone()))?;
                let type_str = def
                    .get("type")
                    .and_then(Json::as_str)
                    .ok_or_else(|| Error::InvalidValue(field_name.to_string()))?;
                parsed.push(FieldDef::parse(field_name, type_str)?);
            }
            structs.push(StructDef {
                name: name.clone(),
                fields: parsed,
            });
        }
        Ok(Self { structs })
    }

    pub fn get<E: Display + Debug>(&self, name: &str) -> Result<&StructDef, Error<E>> {
        self.structs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::UnknownStruct(name.to_string()))
    }
}

impl FieldDef {
    /// Parse a declared type string, e.g. `uint8[2][]` or `Person`
    pub fn parse<E: Display + Debug>(name: &str, type_str: &str) -> Result<Self, Error<E>> {
        let bad = || Error::InvalidValue(format!("{name}: {type_str}"));

        // peel array levels off the end, outermost last
        let mut base = type_str;
        let mut array_levels = Vec::new();
        while let Some(stripped) = base.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(bad)?;
            let bound = &stripped[open + 1..];
            let level = if bound.is_empty() {
                None
            } else {
                Some(bound.parse::<u8>().map_err(|_| bad())?)
            };
            array_levels.insert(0, level);
            base = &stripped[..open];
        }

        // split a trailing size suffix off the base name
        let digits = base.len() - base.bytes().rev().take_while(u8::is_ascii_digit).count();
        let (stem, size_str) = base.split_at(digits);

        let (type_name, field_type, type_size) = match stem {
            "int" | "uint" => {
                let bits: u16 = if size_str.is_empty() {
                    256
                } else {
                    size_str.parse().map_err(|_| bad())?
                };
                if bits == 0 || bits > 256 || bits % 8 != 0 {
                    return Err(bad());
                }
                let t = if stem == "int" {
                    FieldType::Int
                } else {
                    FieldType::Uint
                };
                (stem.to_string(), t, Some((bits / 8) as u8))
            }
            "bytes" if !size_str.is_empty() => {
                let size: u8 = size_str.parse().map_err(|_| bad())?;
                if size == 0 || size > 32 {
                    return Err(bad());
                }
                (stem.to_string(), FieldType::FixBytes, Some(size))
            }
            "bytes" => (stem.to_string(), FieldType::DynBytes, None),
            "address" if size_str.is_empty() => (stem.to_string(), FieldType::Address, None),
            "bool" if size_str.is_empty() => (stem.to_string(), FieldType::Bool, None),
            "string" if size_str.is_empty() => (stem.to_string(), FieldType::String, None),
            _ => (base.to_string(), FieldType::Custom, None),
        };

        Ok(Self {
            name: name.to_string(),
            type_name,
            field_type,
            type_size,
            array_levels,
        })
    }
}

/// Encode a leaf value under its declared type
pub(crate) fn encode_value<E: Display + Debug>(
    field: &FieldDef,
    value: &Json,
) -> Result<Vec<u8>, Error<E>> {
    let bad = || Error::InvalidValue(field.name.clone());

    match field.field_type {
        FieldType::Int | FieldType::Uint => {
            encode_integer(value, field.type_size.unwrap_or(32) as usize, &field.name)
        }
        FieldType::Bool => encode_integer(value, 1, &field.name),
        FieldType::Address => {
            let s = value.as_str().ok_or_else(bad)?;
            encode_hex_exact(s, 20, &field.name)
        }
        FieldType::FixBytes => {
            let s = value.as_str().ok_or_else(bad)?;
            encode_hex_exact(s, field.type_size.unwrap_or(32) as usize, &field.name)
        }
        FieldType::DynBytes => {
            let s = value.as_str().ok_or_else(bad)?;
            decode_hex(s).ok_or_else(bad)
        }
        FieldType::String => Ok(value.as_str().ok_or_else(bad)?.as_bytes().to_vec()),
        FieldType::Custom => Err(bad()),
    }
}

/// Hex-decode `0x...`, tolerating an odd digit count
fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.len() % 2 == 0 {
        hex::decode(digits).ok()
    } else {
        hex::decode(format!("0{digits}")).ok()
    }
}

/// Hex-decode to exactly `size` bytes, left-padding short input
fn encode_hex_exact<E: Display + Debug>(
    s: &str,
    size: usize,
    name: &str,
) -> Result<Vec<u8>, Error<E>> {
    let bytes = decode_hex(s).ok_or_else(|| Error::InvalidValue(name.to_string()))?;
    if bytes.len() > size {
        return Err(Error::Overflow);
    }
    let mut out = vec![0u8; size - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// 256-bit two's-complement window of a signed value
fn int_words(value: i128) -> [u8; 32] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut out = [fill; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

fn uint_words(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Encode an integer as its minimal big-endian bytes within `typesize`
///
/// Negative values fold their sign into the declared size as two's
/// complement; zero is a single zero byte.
fn encode_integer<E: Display + Debug>(
    value: &Json,
    typesize: usize,
    name: &str,
) -> Result<Vec<u8>, Error<E>> {
    let bad = || Error::InvalidValue(name.to_string());

    let full: [u8; 32] = match value {
        Json::Bool(b) => uint_words(*b as u128),
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                uint_words(u as u128)
            } else if let Some(i) = n.as_i64() {
                int_words(i as i128)
            } else {
                return Err(bad());
            }
        }
        Json::String(s) => {
            if let Some(bytes) = decode_hex(s) {
                if bytes.len() > 32 {
                    return Err(Error::Overflow);
                }
                let mut out = [0u8; 32];
                out[32 - bytes.len()..].copy_from_slice(&bytes);
                out
            } else if let Some(digits) = s.strip_prefix('-') {
                let magnitude: i128 = digits.parse::<i128>().map(|v| -v).map_err(|_| {
                    if digits.bytes().all(|b| b.is_ascii_digit()) {
                        Error::Overflow
                    } else {
                        bad()
                    }
                })?;
                int_words(magnitude)
            } else {
                let parsed: u128 = s.parse().map_err(|_| {
                    if s.bytes().all(|b| b.is_ascii_digit()) && !s.is_empty() {
                        Error::Overflow
                    } else {
                        bad()
                    }
                })?;
                uint_words(parsed)
            }
        }
        _ => return Err(bad()),
    };

    let window = &full[32 - typesize..];
    match window.iter().position(|&b| b != 0) {
        Some(first) => Ok(window[first..].to_vec()),
        None => Ok(vec![0x00]),
    }
}

#[cfg(test)]
mod test {
    use core::convert::Infallible;

    use super::*;

    fn field(type_str: &str) -> FieldDef {
        FieldDef::parse::<Infallible>("f", type_str).unwrap()
    }

    #[test]
    fn type_parsing() {
        let f = field("uint8[2][][4]");
        assert_eq!(f.field_type, FieldType::Uint);
        assert_eq!(f.type_size, Some(1));
        assert_eq!(f.array_levels, vec![Some(2), None, Some(4)]);

        let f = field("bool");
        assert_eq!(f.field_type, FieldType::Bool);
        assert_eq!(f.type_size, None);
        assert!(f.array_levels.is_empty());

        let f = field("bytes32");
        assert_eq!(f.field_type, FieldType::FixBytes);
        assert_eq!(f.type_size, Some(32));

        let f = field("Person[]");
        assert_eq!(f.field_type, FieldType::Custom);
        assert_eq!(f.type_name, "Person");
        assert_eq!(f.array_levels, vec![None]);
    }

    #[test]
    fn rejects_bad_type_strings() {
        assert!(FieldDef::parse::<Infallible>("f", "uint7").is_err());
        assert!(FieldDef::parse::<Infallible>("f", "bytes33").is_err());
        assert!(FieldDef::parse::<Infallible>("f", "uint8[300]").is_err());
    }

    #[test]
    fn integer_encoding_is_minimal() {
        let f = field("uint32");
        assert_eq!(encode_value::<Infallible>(&f, &Json::from(0)).unwrap(), vec![0x00]);
        assert_eq!(encode_value::<Infallible>(&f, &Json::from(5)).unwrap(), vec![0x05]);
        assert_eq!(
            encode_value::<Infallible>(&f, &Json::from(0x1234)).unwrap(),
            vec![0x12, 0x34]
        );
        // strings parse with radix detection
        assert_eq!(
            encode_value::<Infallible>(&f, &Json::from("0x0102")).unwrap(),
            vec![0x01, 0x02]
        );
        assert_eq!(
            encode_value::<Infallible>(&f, &Json::from("300")).unwrap(),
            vec![0x01, 0x2c]
        );
    }

    #[test]
    fn negative_integers_fold_sign_into_size() {
        let f = field("int8");
        assert_eq!(
            encode_value::<Infallible>(&f, &Json::from(-1)).unwrap(),
            vec![0xff]
        );
        let f = field("int16");
        assert_eq!(
            encode_value::<Infallible>(&f, &Json::from(-2)).unwrap(),
            vec![0xff, 0xfe]
        );
    }

    #[test]
    fn address_pads_to_exact_length() {
        let f = field("address");
        let out = encode_value::<Infallible>(&f, &Json::from("0x01")).unwrap();
        assert_eq!(out.len(), 20);
        assert_eq!(out[19], 0x01);

        assert!(matches!(
            encode_value::<Infallible>(&f, &Json::from(format!("0x{}", "11".repeat(21)))),
            Err(Error::Overflow)
        ));
    }

    #[test]
    fn oversized_decimal_is_overflow() {
        let f = field("uint256");
        // above u128: only hex strings can carry it
        let big = "340282366920938463463374607431768211456"; // 2^128
        assert!(matches!(
            encode_value::<Infallible>(&f, &Json::from(big)),
            Err(Error::Overflow)
        ));
    }
}
