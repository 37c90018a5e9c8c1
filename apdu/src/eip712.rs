// Copyright (c) 2022-2023 The MobileCoin Foundation

//! EIP-712 structured-data command frames
//!
//! The structured-data protocol streams a message in two passes: type
//! definitions (one struct-name frame, then one struct-field frame per
//! field), then implementations (root-struct, array-size and value frames).
//! The optional filtering sub-protocol interleaves authenticated display
//! frames with the value stream.
//!
//! These builders produce frames only; the walk order is driven by the host
//! library's encoder.

use num_enum::TryFromPrimitive;

use crate::{
    checked_frame, chunk, frame, p1, p2, path::DerivationPath, push_prefixed, ApduFrame,
    FrameError, Instruction,
};

/// Field type discriminants carried in struct-field definition frames
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum FieldType {
    Custom = 0,
    Int = 1,
    Uint = 2,
    Address = 3,
    Bool = 4,
    String = 5,
    FixBytes = 6,
    DynBytes = 7,
}

/// Struct-name definition frame
pub fn struct_def_name(name: &str) -> Result<ApduFrame, FrameError> {
    checked_frame(
        Instruction::Eip712SendStructDef,
        p1::COMPLETE_SEND,
        p2::STRUCT_NAME,
        name.as_bytes().to_vec(),
    )
}

/// Struct-field definition frame
///
/// The type descriptor byte folds the array and fixed-size presence flags
/// into the type discriminant: `(is_array << 7) | (has_size << 6) | type`.
pub fn struct_def_field(
    field_type: FieldType,
    type_name: &str,
    type_size: Option<u8>,
    array_levels: &[Option<u8>],
    key_name: &str,
) -> Result<ApduFrame, FrameError> {
    let mut data = Vec::new();

    let mut typedesc = field_type as u8;
    if !array_levels.is_empty() {
        typedesc |= 1 << 7;
    }
    if type_size.is_some() {
        typedesc |= 1 << 6;
    }
    data.push(typedesc);

    if field_type == FieldType::Custom {
        push_prefixed(&mut data, type_name.as_bytes())?;
    }
    if let Some(size) = type_size {
        data.push(size);
    }
    if !array_levels.is_empty() {
        data.push(array_levels.len() as u8);
        for level in array_levels {
            match level {
                None => data.push(0),
                Some(size) => {
                    data.push(1);
                    data.push(*size);
                }
            }
        }
    }
    push_prefixed(&mut data, key_name.as_bytes())?;

    checked_frame(
        Instruction::Eip712SendStructDef,
        p1::COMPLETE_SEND,
        p2::STRUCT_FIELD,
        data,
    )
}

/// Root-struct implementation frame
pub fn struct_impl_root(name: &str) -> Result<ApduFrame, FrameError> {
    checked_frame(
        Instruction::Eip712SendStructImpl,
        p1::COMPLETE_SEND,
        p2::STRUCT_NAME,
        name.as_bytes().to_vec(),
    )
}

/// Array-size implementation frame
pub fn struct_impl_array(size: u8) -> ApduFrame {
    frame(
        Instruction::Eip712SendStructImpl,
        p1::COMPLETE_SEND,
        p2::ARRAY,
        vec![size],
    )
}

/// Value implementation frames: 2-byte length prefix, chunked
pub fn struct_impl_field(value: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    let chunks = chunk::chunk(value)?;
    Ok(chunks
        .into_iter()
        .map(|c| {
            let flag = if c.complete {
                p1::COMPLETE_SEND
            } else {
                p1::PARTIAL_SEND
            };
            frame(
                Instruction::Eip712SendStructImpl,
                flag,
                p2::STRUCT_FIELD,
                c.data,
            )
        })
        .collect())
}

/// Sign frame, streaming variant: the device hashes state already sent
pub fn sign_new(path: &DerivationPath) -> ApduFrame {
    frame(
        Instruction::Eip712Sign,
        p1::COMPLETE_SEND,
        p2::NEW_IMPLEM,
        path.pack(),
    )
}

/// Sign frame, legacy variant carrying precomputed domain and message hashes
pub fn sign_legacy(
    path: &DerivationPath,
    domain_hash: &[u8; 32],
    message_hash: &[u8; 32],
) -> ApduFrame {
    let mut data = path.pack();
    data.extend_from_slice(domain_hash);
    data.extend_from_slice(message_hash);
    frame(
        Instruction::Eip712Sign,
        p1::COMPLETE_SEND,
        p2::LEGACY_IMPLEM,
        data,
    )
}

/// Switch the device into filtering mode (before any implementation frame)
pub fn filtering_activate() -> ApduFrame {
    frame(
        Instruction::Eip712SendFiltering,
        p1::COMPLETE_SEND,
        p2::FILTERING_ACTIVATE,
        Vec::new(),
    )
}

fn discarded_p1(discarded: bool) -> u8 {
    discarded as u8
}

/// Signed message-info frame, sent between the domain and the message
pub fn filtering_message_info(
    name: &str,
    filters_count: u8,
    sig: &[u8],
) -> Result<ApduFrame, FrameError> {
    let mut data = Vec::new();
    push_prefixed(&mut data, name.as_bytes())?;
    data.push(filters_count);
    push_prefixed(&mut data, sig)?;
    checked_frame(
        Instruction::Eip712SendFiltering,
        p1::COMPLETE_SEND,
        p2::FILTERING_MESSAGE_INFO,
        data,
    )
}

/// Announce a filter path collapsed by an empty array instance
pub fn filtering_discarded_path(path: &str) -> Result<ApduFrame, FrameError> {
    let mut data = Vec::new();
    push_prefixed(&mut data, path.as_bytes())?;
    checked_frame(
        Instruction::Eip712SendFiltering,
        p1::COMPLETE_SEND,
        p2::FILTERING_DISCARDED_PATH,
        data,
    )
}

/// Token-join filter frame carrying only the token index
pub fn filtering_amount_join_token(
    token_idx: u8,
    sig: &[u8],
    discarded: bool,
) -> Result<ApduFrame, FrameError> {
    let mut data = vec![token_idx];
    push_prefixed(&mut data, sig)?;
    checked_frame(
        Instruction::Eip712SendFiltering,
        discarded_p1(discarded),
        p2::FILTERING_TOKEN_ADDR_CHECK,
        data,
    )
}

/// Value-join filter frame carrying a display name and token index
pub fn filtering_amount_join_value(
    token_idx: u8,
    name: &str,
    sig: &[u8],
    discarded: bool,
) -> Result<ApduFrame, FrameError> {
    let mut data = Vec::new();
    push_prefixed(&mut data, name.as_bytes())?;
    data.push(token_idx);
    push_prefixed(&mut data, sig)?;
    checked_frame(
        Instruction::Eip712SendFiltering,
        discarded_p1(discarded),
        p2::FILTERING_AMOUNT_FIELD,
        data,
    )
}

fn named_filter(
    p2: u8,
    name: &str,
    sig: &[u8],
    discarded: bool,
) -> Result<ApduFrame, FrameError> {
    let mut data = Vec::new();
    push_prefixed(&mut data, name.as_bytes())?;
    push_prefixed(&mut data, sig)?;
    checked_frame(
        Instruction::Eip712SendFiltering,
        discarded_p1(discarded),
        p2,
        data,
    )
}

/// Datetime filter frame
pub fn filtering_datetime(name: &str, sig: &[u8], discarded: bool) -> Result<ApduFrame, FrameError> {
    named_filter(p2::FILTERING_DATETIME, name, sig, discarded)
}

/// Trusted-name filter frame with allowed type and source lists
pub fn filtering_trusted_name(
    name: &str,
    name_types: &[u8],
    name_sources: &[u8],
    sig: &[u8],
    discarded: bool,
) -> Result<ApduFrame, FrameError> {
    let mut data = Vec::new();
    push_prefixed(&mut data, name.as_bytes())?;
    push_prefixed(&mut data, name_types)?;
    push_prefixed(&mut data, name_sources)?;
    push_prefixed(&mut data, sig)?;
    checked_frame(
        Instruction::Eip712SendFiltering,
        discarded_p1(discarded),
        p2::FILTERING_TRUSTED_NAME,
        data,
    )
}

/// Raw display filter frame
pub fn filtering_raw(name: &str, sig: &[u8], discarded: bool) -> Result<ApduFrame, FrameError> {
    named_filter(p2::FILTERING_RAW, name, sig, discarded)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn struct_def_field_typedesc_flags() {
        // uint8: sized, no array levels
        let f = struct_def_field(FieldType::Uint, "uint", Some(1), &[], "value").unwrap();
        assert_eq!(f.p2, p2::STRUCT_FIELD);
        assert_eq!(f.data[0], (1 << 6) | FieldType::Uint as u8);
        assert_eq!(f.data[1], 1); // type size
        assert_eq!(f.data[2], 5); // key name length
        assert_eq!(&f.data[3..], b"value");
    }

    #[test]
    fn struct_def_field_array_levels() {
        // uint8[2][] -> two levels, first fixed at 2, second dynamic
        let f = struct_def_field(
            FieldType::Uint,
            "uint",
            Some(1),
            &[Some(2), None],
            "ids",
        )
        .unwrap();
        assert_eq!(f.data[0], (1 << 7) | (1 << 6) | FieldType::Uint as u8);
        // size, then level count and level descriptors
        assert_eq!(&f.data[1..6], &[1, 2, 1, 2, 0]);
    }

    #[test]
    fn struct_def_field_custom_type() {
        let f = struct_def_field(FieldType::Custom, "Person", None, &[], "from").unwrap();
        assert_eq!(f.data[0], FieldType::Custom as u8);
        assert_eq!(f.data[1], 6);
        assert_eq!(&f.data[2..8], b"Person");
    }

    #[test]
    fn value_frames_chunk_and_flag() {
        let frames = struct_impl_field(&[0xaa; 300]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].p1, p1::PARTIAL_SEND);
        assert_eq!(frames[1].p1, p1::COMPLETE_SEND);
        // first frame leads with the 2-byte total length
        assert_eq!(&frames[0].data[..2], &[0x01, 0x2c]);
    }

    #[test]
    fn sign_frames_select_variant() {
        let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(sign_new(&path).p2, p2::NEW_IMPLEM);

        let legacy = sign_legacy(&path, &[0u8; 32], &[1u8; 32]);
        assert_eq!(legacy.p2, p2::LEGACY_IMPLEM);
        assert_eq!(legacy.data.len(), path.pack().len() + 64);
    }

    #[test]
    fn discarded_flag_rides_p1() {
        let f = filtering_raw("field", &[0u8; 70], false).unwrap();
        assert_eq!(f.p1, 0);
        let f = filtering_raw("field", &[0u8; 70], true).unwrap();
        assert_eq!(f.p1, 1);
    }
}
