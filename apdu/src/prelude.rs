// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Prelude to simplify downstream use of protocol objects
//!

pub use crate::{
    chunk::{chunk, reassemble, Chunk, ChunkError, MAX_FRAME_DATA},
    eip712::FieldType,
    frame,
    path::DerivationPath,
    tlv::{self, TlvError},
    ApduFrame, FrameError, Instruction, Outcome, StatusWord, ETH_APDU_CLA,
};
