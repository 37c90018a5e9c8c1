// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shared test fixtures: a scripted mock transport and a keychain with
//! injected keys

#![allow(dead_code)]

use std::collections::VecDeque;
use std::str::FromStr;

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use log::LevelFilter;
use simplelog::SimpleLogger;

use ledger_eth::{
    apdu::ApduFrame,
    keychain::{Category, Keychain},
    Exchange,
};

/// Category list with the fixed key byte used to derive its test key
const TEST_KEYS: [(Category, u8); 9] = [
    (Category::Cal, 0x11),
    (Category::TrustedName, 0x12),
    (Category::SetPlugin, 0x13),
    (Category::Nft, 0x14),
    (Category::Network, 0x15),
    (Category::Gating, 0x16),
    (Category::Web3Check, 0x17),
    (Category::Safe, 0x18),
    (Category::Calldata, 0x19),
];

/// Setup logging once per test binary
pub fn init_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Info,
    };
    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Keychain with a deterministic key bound to every category
pub fn test_keychain() -> Keychain {
    let keychain = Keychain::detached();
    for (category, byte) in TEST_KEYS {
        keychain.insert(category, SigningKey::from_slice(&[byte; 32]).unwrap());
    }
    keychain
}

/// The signing key [`test_keychain`] binds to `category`
pub fn category_key(category: Category) -> SigningKey {
    let (_, byte) = TEST_KEYS.iter().find(|(c, _)| *c == category).unwrap();
    SigningKey::from_slice(&[*byte; 32]).unwrap()
}

/// One recorded frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentFrame {
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

/// Transport double: records every frame, replays scripted responses
///
/// With no scripted response left, every frame is acknowledged OK with a
/// 65-byte placeholder payload (enough for signature parses).
pub struct MockExchange {
    pub sent: Vec<SentFrame>,
    pub responses: VecDeque<(u16, Vec<u8>)>,
}

impl MockExchange {
    pub fn acknowledging() -> Self {
        Self {
            sent: Vec::new(),
            responses: VecDeque::new(),
        }
    }

    pub fn scripted(responses: impl IntoIterator<Item = (u16, Vec<u8>)>) -> Self {
        Self {
            sent: Vec::new(),
            responses: responses.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Exchange for MockExchange {
    type Error = String;

    async fn exchange(&mut self, frame: &ApduFrame) -> Result<(u16, Vec<u8>), String> {
        self.sent.push(SentFrame {
            ins: frame.ins,
            p1: frame.p1,
            p2: frame.p2,
            data: frame.data.clone(),
        });
        Ok(self
            .responses
            .pop_front()
            .unwrap_or((0x9000, vec![0x1b; 65])))
    }
}
