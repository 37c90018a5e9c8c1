// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Metadata delivery, key fetch and signing command frames
//!
//! Descriptor payloads arrive here already serialized (and signed where the
//! record carries a signature); these builders only wrap them into frames
//! with the right instruction, parameter flags and chunking discipline.

use byteorder::{BigEndian, ByteOrder};

use crate::{
    checked_frame, chunk, frame, p1, p2, path::DerivationPath, ApduFrame, FrameError, Instruction,
};

/// Challenge request frame
pub fn get_challenge() -> ApduFrame {
    frame(Instruction::GetChallenge, 0x00, 0x00, Vec::new())
}

/// Public key / address request frame
///
/// `display` asks the device to show the address for confirmation;
/// `chaincode` requests the BIP-32 chain code in the response.
pub fn get_public_addr(
    display: bool,
    chaincode: bool,
    path: &DerivationPath,
    chain_id: Option<u64>,
) -> ApduFrame {
    let mut data = path.pack();
    if let Some(id) = chain_id {
        let mut word = [0u8; 8];
        BigEndian::write_u64(&mut word, id);
        data.extend_from_slice(&word);
    }
    frame(
        Instruction::GetPublicAddr,
        display as u8,
        chaincode as u8,
        data,
    )
}

/// Raw transaction signing frames: packed path followed by the RLP payload
pub fn sign_transaction(path: &DerivationPath, rlp: &[u8]) -> Vec<ApduFrame> {
    let mut payload = path.pack();
    payload.extend_from_slice(rlp);
    chunk::sign_frames(Instruction::Sign, 0x00, &payload)
}

/// EIP-191 personal message signing frames
///
/// The message is prefixed with its 4-byte big-endian length; the device
/// streams the remainder across chunks.
pub fn personal_sign(path: &DerivationPath, message: &[u8]) -> Vec<ApduFrame> {
    let mut payload = path.pack();
    let mut word = [0u8; 4];
    BigEndian::write_u32(&mut word, message.len() as u32);
    payload.extend_from_slice(&word);
    payload.extend_from_slice(message);
    chunk::sign_frames(Instruction::PersonalSign, 0x00, &payload)
}

/// Trusted-name descriptor frames
pub fn provide_trusted_name(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideTrustedName, tlv)
}

/// Enum-value descriptor frames
pub fn provide_enum_value(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideEnumValue, tlv)
}

/// Transaction-info descriptor frames
pub fn provide_transaction_info(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideTransactionInfo, tlv)
}

/// Calldata field descriptor frames
pub fn provide_field(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideField, tlv)
}

/// Proxy-info descriptor frames
pub fn provide_proxy_info(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideProxyInfo, tlv)
}

/// Transaction-simulation descriptor frames
pub fn provide_tx_simulation(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideTxSimulation, tlv)
}

/// Safe / signer account descriptor frames
pub fn provide_safe_account(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideSafeAccount, tlv)
}

/// Gating banner descriptor frames
pub fn provide_gating(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::ProvideGating, tlv)
}

/// EIP-7702 authorization signing frames
pub fn sign_eip7702_authorization(tlv: &[u8]) -> Result<Vec<ApduFrame>, chunk::ChunkError> {
    chunk::tlv_frames(Instruction::SignEip7702Authorization, tlv)
}

/// Network descriptor frames: one config frame plus optional icon chunks
///
/// The configuration record must fit a single frame; the icon streams with
/// its own first/following flags under the icon `p2` selector.
pub fn provide_network_information(
    tlv: &[u8],
    icon: Option<&[u8]>,
) -> Result<Vec<ApduFrame>, FrameError> {
    if tlv.len() > chunk::MAX_FRAME_DATA {
        return Err(FrameError::PayloadTooLarge(tlv.len()));
    }

    let mut frames = vec![frame(
        Instruction::ProvideNetworkInformation,
        0x00,
        p2::NETWORK_CONFIG,
        tlv.to_vec(),
    )];

    if let Some(icon) = icon {
        let mut rest = icon;
        let mut flag = p1::FIRST_CHUNK;
        while !rest.is_empty() {
            let take = rest.len().min(chunk::MAX_FRAME_DATA);
            frames.push(frame(
                Instruction::ProvideNetworkInformation,
                flag,
                p2::NETWORK_ICON,
                rest[..take].to_vec(),
            ));
            rest = &rest[take..];
            flag = p1::FOLLOWING_CHUNK;
        }
    }
    Ok(frames)
}

/// ERC-20 token metadata frame (packed payload, signature included)
pub fn provide_erc20_token_information(payload: Vec<u8>) -> Result<ApduFrame, FrameError> {
    checked_frame(
        Instruction::ProvideErc20TokenInformation,
        0x00,
        0x00,
        payload,
    )
}

/// NFT collection metadata frame (packed payload, signature included)
pub fn provide_nft_information(payload: Vec<u8>) -> Result<ApduFrame, FrameError> {
    checked_frame(Instruction::ProvideNftInformation, 0x00, 0x00, payload)
}

/// Plugin registration frame (packed payload, signature included)
pub fn set_plugin(payload: Vec<u8>) -> Result<ApduFrame, FrameError> {
    checked_frame(Instruction::SetPlugin, 0x00, 0x00, payload)
}

#[cfg(test)]
mod test {
    use super::*;

    fn path() -> DerivationPath {
        "m/44'/60'/0'/0/0".parse().unwrap()
    }

    #[test]
    fn get_public_addr_flags_and_chain() {
        let f = get_public_addr(true, false, &path(), Some(5));
        assert_eq!(f.p1, 1);
        assert_eq!(f.p2, 0);
        // packed path then 8-byte chain id
        assert_eq!(f.data.len(), 21 + 8);
        assert_eq!(&f.data[21..], &[0, 0, 0, 0, 0, 0, 0, 5]);
    }

    #[test]
    fn personal_sign_length_prefix() {
        let frames = personal_sign(&path(), b"hello");
        assert_eq!(frames.len(), 1);
        let data = &frames[0].data;
        assert_eq!(&data[21..25], &[0, 0, 0, 5]);
        assert_eq!(&data[25..], b"hello");
    }

    #[test]
    fn network_info_rejects_oversized_config() {
        assert!(matches!(
            provide_network_information(&[0u8; 300], None),
            Err(FrameError::PayloadTooLarge(300))
        ));
    }

    #[test]
    fn network_icon_chunks() {
        let frames = provide_network_information(&[1, 2, 3], Some(&[0xaa; 300])).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].p2, p2::NETWORK_CONFIG);
        assert_eq!(frames[1].p2, p2::NETWORK_ICON);
        assert_eq!(frames[1].p1, p1::FIRST_CHUNK);
        assert_eq!(frames[2].p1, p1::FOLLOWING_CHUNK);
    }
}
