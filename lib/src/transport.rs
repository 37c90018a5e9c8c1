// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transport seam
//!
//! The physical exchange (USB HID, TCP, simulator) is an external
//! collaborator; the library only requires a way to send one frame and block
//! for its reply. The protocol is strictly synchronous: a frame must be
//! fully acknowledged before the next is sent, so implementations never
//! pipeline.

use core::fmt::{Debug, Display};

use async_trait::async_trait;

use ledger_eth_apdu::ApduFrame;

/// A single-frame request/response transport
///
/// Confirming frames (signing, address display) resolve only after the
/// remote side completes its approval step; cancellation surfaces as the
/// condition-not-satisfied status, never as a timeout inside this layer.
#[async_trait]
pub trait Exchange {
    /// Transport-level error type
    type Error: Display + Debug + Send;

    /// Exchange one frame for a `(status word, response payload)` pair
    async fn exchange(&mut self, frame: &ApduFrame) -> Result<(u16, Vec<u8>), Self::Error>;
}
