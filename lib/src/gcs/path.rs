// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Calldata path model and construction
//!
//! A data path is a short declarative program the device walks against raw
//! ABI-encoded calldata: tuple elements advance the read offset by a word
//! count, refs follow a 32-byte offset word, arrays iterate a length-prefixed
//! group, and a single terminal leaf reads the located value. Path
//! construction mirrors the ABI head/tail encoding rules: a divergence here
//! silently mis-locates a field, so the builder stays as close as possible to
//! the parameter classification the encoder itself uses.

use serde::Deserialize;

use ledger_eth_apdu::tlv;

use super::GcsError;

const TAG_VERSION: u64 = 0x00;
const TAG_TUPLE: u64 = 0x01;
const TAG_ARRAY: u64 = 0x02;
const TAG_REF: u64 = 0x03;
const TAG_LEAF: u64 = 0x04;
const TAG_SLICE: u64 = 0x05;

// sub-tags of the array element
const ARRAY_TAG_WEIGHT: u64 = 0x01;
const ARRAY_TAG_START: u64 = 0x02;
const ARRAY_TAG_END: u64 = 0x03;

// sub-tags of the slice element
const SLICE_TAG_START: u64 = 0x01;
const SLICE_TAG_END: u64 = 0x02;

/// What a terminal leaf reads
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LeafType {
    Array = 0x01,
    Tuple = 0x02,
    /// One 32-byte word in place
    Static = 0x03,
    /// Length word followed by that many bytes
    Dynamic = 0x04,
}

/// One step of a calldata path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathElement {
    /// Advance the offset by a word count inside the current frame
    Tuple(u16),

    /// Iterate a length-prefixed group, `weight` words per element;
    /// negative bounds index from the end
    Array {
        weight: u8,
        start: Option<i16>,
        end: Option<i16>,
    },

    /// Follow a 32-byte offset word (ABI tail indirection)
    Ref,

    /// Read the located value
    Leaf(LeafType),

    /// Restrict the previously read value to a byte range
    Slice {
        start: Option<i16>,
        end: Option<i16>,
    },
}

impl PathElement {
    fn serialize(&self) -> Vec<u8> {
        match self {
            PathElement::Tuple(index) => tlv::encode_int(TAG_TUPLE, *index as u64),
            PathElement::Array { weight, start, end } => {
                let mut inner = tlv::encode_int(ARRAY_TAG_WEIGHT, *weight as u64);
                if let Some(start) = start {
                    inner.extend(tlv::encode_bytes(ARRAY_TAG_START, &start.to_be_bytes()));
                }
                if let Some(end) = end {
                    inner.extend(tlv::encode_bytes(ARRAY_TAG_END, &end.to_be_bytes()));
                }
                tlv::encode_bytes(TAG_ARRAY, &inner)
            }
            PathElement::Ref => tlv::encode_bytes(TAG_REF, &[]),
            PathElement::Leaf(leaf) => tlv::encode_int(TAG_LEAF, *leaf as u64),
            PathElement::Slice { start, end } => {
                let mut inner = Vec::new();
                if let Some(start) = start {
                    inner.extend(tlv::encode_bytes(SLICE_TAG_START, &start.to_be_bytes()));
                }
                if let Some(end) = end {
                    inner.extend(tlv::encode_bytes(SLICE_TAG_END, &end.to_be_bytes()));
                }
                tlv::encode_bytes(TAG_SLICE, &inner)
            }
        }
    }
}

/// A versioned element sequence terminating in exactly one leaf
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataPath {
    version: u64,
    elements: Vec<PathElement>,
}

impl DataPath {
    /// Build a path from raw elements
    pub fn new(version: u64, elements: Vec<PathElement>) -> Self {
        Self { version, elements }
    }

    /// Path elements in walk order
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// TLV body of the path
    pub fn serialize(&self) -> Vec<u8> {
        let mut payload = tlv::encode_int(TAG_VERSION, self.version);
        for element in &self.elements {
            payload.extend(element.serialize());
        }
        payload
    }

    /// Concatenate `self` with a nested segment, stripping the trailing leaf
    ///
    /// Expresses access to a tuple field, an array-of-tuples element or a
    /// frame nested one call deeper: the outer segment locates the container,
    /// the inner segment continues from there.
    pub fn join(&self, inner: &DataPath) -> Result<DataPath, GcsError> {
        match self.elements.last() {
            Some(PathElement::Leaf(_)) => {}
            _ => return Err(GcsError::UnterminatedPath),
        }
        let mut elements = self.elements[..self.elements.len() - 1].to_vec();
        elements.extend(inner.elements.iter().cloned());
        Ok(DataPath {
            version: self.version,
            elements,
        })
    }
}

/// One parameter of a contract-ABI description tree
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AbiParam {
    /// Parameter name as declared in the ABI
    #[serde(default)]
    pub name: String,

    /// Solidity type string, e.g. `uint256`, `string`, `uint256[]`
    #[serde(rename = "type")]
    pub kind: String,

    /// Tuple members, present when `kind` is a tuple (or tuple array)
    #[serde(default)]
    pub components: Vec<AbiParam>,
}

/// Split the outermost array level off a type string
///
/// `uint256[2][]` is an array of `uint256[2]`: the outermost level is the
/// last bracket group.
fn split_array(kind: &str) -> Option<(&str, Option<usize>)> {
    let kind = kind.strip_suffix(']')?;
    let open = kind.rfind('[')?;
    let bound = &kind[open + 1..];
    let size = if bound.is_empty() {
        None
    } else {
        bound.parse().ok()
    };
    Some((&kind[..open], size))
}

fn is_elementary_static(kind: &str) -> bool {
    if kind == "address" || kind == "bool" {
        return true;
    }
    for prefix in ["uint", "int", "ufixed", "fixed", "bytes"] {
        if let Some(suffix) = kind.strip_prefix(prefix) {
            // "bytes" alone is dynamic, the sized forms are one word
            if suffix.is_empty() {
                return prefix != "bytes";
            }
            return suffix.bytes().all(|b| b.is_ascii_digit() || b == b'x');
        }
    }
    false
}

/// Whether the parameter needs tail (offset) encoding
fn is_dynamic(kind: &str, components: &[AbiParam]) -> bool {
    if split_array(kind).is_some() {
        return true;
    }
    match kind {
        "string" | "bytes" => true,
        "tuple" => components.iter().any(|c| is_dynamic(&c.kind, &c.components)),
        _ => false,
    }
}

/// Head size of a parameter in 32-byte words (1 for anything dynamic)
fn head_words(kind: &str, components: &[AbiParam]) -> Result<u64, GcsError> {
    if is_dynamic(kind, components) {
        return Ok(1);
    }
    match kind {
        "tuple" => {
            let mut words = 0;
            for c in components {
                words += head_words(&c.kind, &c.components)?;
            }
            Ok(words)
        }
        _ if is_elementary_static(kind) => Ok(1),
        _ => Err(GcsError::UnsupportedType(kind.to_string())),
    }
}

fn push_tail(
    kind: &str,
    components: &[AbiParam],
    out: &mut Vec<PathElement>,
) -> Result<(), GcsError> {
    if let Some((element_kind, _bound)) = split_array(kind) {
        let weight = head_words(element_kind, components)?;
        if weight > u8::MAX as u64 {
            return Err(GcsError::WeightTooLarge(weight));
        }
        out.push(PathElement::Ref);
        out.push(PathElement::Array {
            weight: weight as u8,
            start: None,
            end: None,
        });
        return push_tail(element_kind, components, out);
    }

    match kind {
        "string" | "bytes" => {
            out.push(PathElement::Ref);
            out.push(PathElement::Leaf(LeafType::Dynamic));
        }
        "tuple" => {
            if is_dynamic(kind, components) {
                out.push(PathElement::Ref);
            }
            out.push(PathElement::Leaf(LeafType::Tuple));
        }
        _ if is_elementary_static(kind) => {
            out.push(PathElement::Leaf(LeafType::Static));
        }
        _ => return Err(GcsError::UnsupportedType(kind.to_string())),
    }
    Ok(())
}

/// Build the path locating `param` at head-slot `tuple_index` of a call frame
///
/// Static parameters resolve to a direct static leaf; dynamic parameters
/// follow their offset word, with an array iteration step per array level.
pub fn build_path(param: &AbiParam, tuple_index: u16) -> Result<DataPath, GcsError> {
    let mut elements = vec![PathElement::Tuple(tuple_index)];
    push_tail(&param.kind, &param.components, &mut elements)?;
    Ok(DataPath::new(1, elements))
}

#[cfg(test)]
mod test {
    use super::*;

    fn param(kind: &str) -> AbiParam {
        AbiParam {
            name: "p".to_string(),
            kind: kind.to_string(),
            components: vec![],
        }
    }

    #[test]
    fn static_param_is_a_direct_leaf() {
        // ERC-20 transfer(address,uint256): the `_to` parameter
        let path = build_path(&param("address"), 0).unwrap();
        assert_eq!(
            path.elements(),
            &[PathElement::Tuple(0), PathElement::Leaf(LeafType::Static)]
        );
    }

    #[test]
    fn string_param_refs_a_dynamic_leaf() {
        let path = build_path(&param("string"), 1).unwrap();
        assert_eq!(
            path.elements(),
            &[
                PathElement::Tuple(1),
                PathElement::Ref,
                PathElement::Leaf(LeafType::Dynamic)
            ]
        );
    }

    #[test]
    fn uint_array_iterates_static_leaves() {
        // ERC-1155 safeBatchTransferFrom: the `_ids` parameter
        let path = build_path(&param("uint256[]"), 2).unwrap();
        assert_eq!(
            path.elements(),
            &[
                PathElement::Tuple(2),
                PathElement::Ref,
                PathElement::Array {
                    weight: 1,
                    start: None,
                    end: None
                },
                PathElement::Leaf(LeafType::Static)
            ]
        );
    }

    #[test]
    fn nested_arrays_stack_iterations() {
        let path = build_path(&param("uint256[][]"), 0).unwrap();
        assert_eq!(
            path.elements(),
            &[
                PathElement::Tuple(0),
                PathElement::Ref,
                PathElement::Array {
                    weight: 1,
                    start: None,
                    end: None
                },
                PathElement::Ref,
                PathElement::Array {
                    weight: 1,
                    start: None,
                    end: None
                },
                PathElement::Leaf(LeafType::Static)
            ]
        );
    }

    #[test]
    fn string_array_refs_each_element() {
        let path = build_path(&param("string[]"), 3).unwrap();
        assert_eq!(
            path.elements(),
            &[
                PathElement::Tuple(3),
                PathElement::Ref,
                PathElement::Array {
                    weight: 1,
                    start: None,
                    end: None
                },
                PathElement::Ref,
                PathElement::Leaf(LeafType::Dynamic)
            ]
        );
    }

    #[test]
    fn join_strips_the_outer_leaf() {
        let outer = build_path(&param("uint256[]"), 1).unwrap();
        let inner = DataPath::new(1, vec![
            PathElement::Tuple(2),
            PathElement::Leaf(LeafType::Static),
        ]);
        let joined = outer.join(&inner).unwrap();
        assert_eq!(
            joined.elements(),
            &[
                PathElement::Tuple(1),
                PathElement::Ref,
                PathElement::Array {
                    weight: 1,
                    start: None,
                    end: None
                },
                PathElement::Tuple(2),
                PathElement::Leaf(LeafType::Static)
            ]
        );

        // a path without a trailing leaf cannot be extended
        let bare = DataPath::new(1, vec![PathElement::Tuple(0)]);
        assert_eq!(bare.join(&inner), Err(GcsError::UnterminatedPath));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert_eq!(
            build_path(&param("uint256what"), 0),
            Err(GcsError::UnsupportedType("uint256what".to_string()))
        );
    }

    #[test]
    fn serialized_path_tags() {
        let path = build_path(&param("uint256[]"), 2).unwrap();
        let bytes = path.serialize();
        // version, tuple(2), ref, array{weight 1}, leaf(static)
        assert_eq!(
            bytes,
            vec![
                0x00, 0x01, 0x01, // version = 1
                0x01, 0x01, 0x02, // tuple 2
                0x03, 0x00, // ref
                0x02, 0x03, 0x01, 0x01, 0x01, // array { weight: 1 }
                0x04, 0x01, 0x03, // leaf static
            ]
        );
    }
}
