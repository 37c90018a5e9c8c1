// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Payload chunking for multi-frame commands
//!
//! A frame carries at most 255 payload bytes. Anything larger is prefixed
//! with its 2-byte big-endian total length and split into consecutive frames;
//! every frame but the last is marked partial. Reassembly on the receiving
//! side is length-driven: it consumes frames until the declared length is
//! satisfied, independent of each frame's own marking.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::{frame, p1, ApduFrame, Instruction};

/// Maximum payload bytes in a single frame
pub const MAX_FRAME_DATA: usize = 0xff;

/// Chunking / reassembly errors
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// Frames ran out before the declared length was satisfied
    #[error("chunk stream truncated")]
    Truncated,

    /// Payload exceeds the 2-byte length prefix
    #[error("payload too large to chunk ({0} bytes)")]
    PayloadTooLarge(usize),
}

/// One chunk of an oversized payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Set on the final chunk of the payload
    pub complete: bool,
    /// At most [`MAX_FRAME_DATA`] bytes
    pub data: Vec<u8>,
}

/// Length-prefix `payload` and split it into chunks
pub fn chunk(payload: &[u8]) -> Result<Vec<Chunk>, ChunkError> {
    if payload.len() > u16::MAX as usize {
        return Err(ChunkError::PayloadTooLarge(payload.len()));
    }

    let mut data = Vec::with_capacity(payload.len() + 2);
    let mut prefix = [0u8; 2];
    BigEndian::write_u16(&mut prefix, payload.len() as u16);
    data.extend_from_slice(&prefix);
    data.extend_from_slice(payload);

    let mut chunks = Vec::with_capacity(data.len() / MAX_FRAME_DATA + 1);
    let mut rest = &data[..];
    loop {
        let take = rest.len().min(MAX_FRAME_DATA);
        chunks.push(Chunk {
            complete: rest.len() <= MAX_FRAME_DATA,
            data: rest[..take].to_vec(),
        });
        rest = &rest[take..];
        if rest.is_empty() {
            break;
        }
    }
    Ok(chunks)
}

/// Reassemble a chunk stream back into the original payload
pub fn reassemble(chunks: &[Chunk]) -> Result<Vec<u8>, ChunkError> {
    let mut buf = Vec::new();
    let mut chunks = chunks.iter();

    // the declared length spans the first two bytes, which may themselves
    // straddle frames on a degenerate transport
    while buf.len() < 2 {
        let c = chunks.next().ok_or(ChunkError::Truncated)?;
        buf.extend_from_slice(&c.data);
    }
    let declared = BigEndian::read_u16(&buf[..2]) as usize;

    while buf.len() < declared + 2 {
        let c = chunks.next().ok_or(ChunkError::Truncated)?;
        buf.extend_from_slice(&c.data);
    }

    Ok(buf[2..declared + 2].to_vec())
}

/// Build the frame stream for a chunked TLV `provide` payload
///
/// The first frame carries `p1 = 0x01`, following frames `p1 = 0x00`.
pub fn tlv_frames(ins: Instruction, payload: &[u8]) -> Result<Vec<ApduFrame>, ChunkError> {
    let chunks = chunk(payload)?;
    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let flag = if i == 0 {
                p1::FIRST_CHUNK
            } else {
                p1::FOLLOWING_CHUNK
            };
            frame(ins, flag, 0x00, c.data)
        })
        .collect())
}

/// Build the frame stream for a raw signing payload
///
/// No length prefix: the payload is self-delimiting. The first frame carries
/// the first-chunk sign flag, following frames the subsequent-chunk flag.
pub fn sign_frames(ins: Instruction, p2: u8, payload: &[u8]) -> Vec<ApduFrame> {
    let mut frames = Vec::with_capacity(payload.len() / MAX_FRAME_DATA + 1);
    let mut rest = payload;
    let mut flag = p1::SIGN_FIRST_CHUNK;
    loop {
        let take = rest.len().min(MAX_FRAME_DATA);
        frames.push(frame(ins, flag, p2, rest[..take].to_vec()));
        rest = &rest[take..];
        flag = p1::SIGN_SUBSQT_CHUNK;
        if rest.is_empty() {
            break;
        }
    }
    frames
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip(len: usize) {
        let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let chunks = chunk(&payload).unwrap();

        // every chunk but the last is partial
        for c in &chunks[..chunks.len() - 1] {
            assert!(!c.complete);
            assert_eq!(c.data.len(), MAX_FRAME_DATA);
        }
        assert!(chunks.last().unwrap().complete);

        assert_eq!(reassemble(&chunks).unwrap(), payload);
    }

    #[test]
    fn chunk_round_trips_at_boundaries() {
        for len in [0, 1, 254, 255, 256, 65535] {
            round_trip(len);
        }
    }

    #[test]
    fn exact_frame_payload_needs_two_chunks() {
        // 255 bytes plus the length prefix always spills into a second frame
        let chunks = chunk(&[0xaa; 255]).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].data.len(), 2);
    }

    #[test]
    fn reassembly_is_length_driven() {
        let mut chunks = chunk(&[0xbb; 300]).unwrap();
        // markers are advisory for the receiver
        for c in chunks.iter_mut() {
            c.complete = false;
        }
        assert_eq!(reassemble(&chunks).unwrap(), vec![0xbb; 300]);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let chunks = chunk(&[0xcc; 300]).unwrap();
        assert_eq!(
            reassemble(&chunks[..1]),
            Err(ChunkError::Truncated)
        );
    }

    #[test]
    fn tlv_frame_flags() {
        let frames = tlv_frames(Instruction::ProvideTrustedName, &[0u8; 300]).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].p1, p1::FIRST_CHUNK);
        assert_eq!(frames[1].p1, p1::FOLLOWING_CHUNK);
    }

    #[test]
    fn sign_frame_flags() {
        let frames = sign_frames(Instruction::Sign, 0x00, &[0u8; 600]);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].p1, p1::SIGN_FIRST_CHUNK);
        assert_eq!(frames[1].p1, p1::SIGN_SUBSQT_CHUNK);
        assert_eq!(frames[2].p1, p1::SIGN_SUBSQT_CHUNK);
    }
}
