// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Category-bound signing keys
//!
//! Every metadata record is authenticated with a deterministic ECDSA
//! (secp256k1) signature from a key the device associates with that record's
//! category. The binding is a fixed table: callers pick a [`Category`], never
//! a key.
//!
//! Key material is loaded lazily from per-category PEM (SEC1 or PKCS#8) or
//! DER files on first use and cached for the life of the [`Keychain`]. The
//! cache is append-once: cells are never replaced after a successful load, so
//! the keychain can be shared across messages.

use std::{
    fs,
    path::{Path, PathBuf},
};

use k256::{
    ecdsa::{signature::Signer, Signature, SigningKey},
    pkcs8::DecodePrivateKey,
    SecretKey,
};
use once_cell::sync::OnceCell;
use strum::{Display, EnumIter};
use thiserror::Error;

/// Metadata categories, each bound to exactly one signing key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum Category {
    /// Metadata-aggregation authority (tokens, calldata schemas, filters)
    Cal,
    /// Trusted-name records from non-aggregator sources
    TrustedName,
    /// Plugin registration records
    SetPlugin,
    /// NFT collection records
    Nft,
    /// Dynamic network records
    Network,
    /// Gating banner records
    Gating,
    /// Transaction-simulation verdicts
    Web3Check,
    /// Safe / signer account records
    Safe,
    /// Enum-value and proxy records
    Calldata,
}

const CATEGORY_COUNT: usize = 9;

impl Category {
    fn index(&self) -> usize {
        *self as usize
    }

    /// Key file stem for this category
    fn stem(&self) -> &'static str {
        match self {
            Category::Cal => "cal",
            Category::TrustedName => "trusted_name",
            Category::SetPlugin => "set_plugin",
            Category::Nft => "nft",
            Category::Network => "network",
            Category::Gating => "gating",
            Category::Web3Check => "web3_check",
            Category::Safe => "safe",
            Category::Calldata => "calldata",
        }
    }
}

/// Key resolution and signing errors
#[derive(Debug, Error)]
pub enum KeychainError {
    /// No key bound for the category (detached keychain, nothing injected)
    #[error("no key bound for category {0}")]
    UnknownCategory(Category),

    /// Key material absent or corrupt
    #[error("could not load key material for {0}: {1}")]
    KeyLoad(Category, String),
}

/// Holds one signing key per metadata category
pub struct Keychain {
    dir: Option<PathBuf>,
    keys: [OnceCell<SigningKey>; CATEGORY_COUNT],
}

impl Keychain {
    /// Keychain backed by a key-file directory
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
            keys: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    /// Keychain with no backing directory; keys must be injected
    pub fn detached() -> Self {
        Self {
            dir: None,
            keys: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    /// Bind a key directly, bypassing file loading
    ///
    /// Has no effect if the category already holds a key.
    pub fn insert(&self, category: Category, key: SigningKey) {
        let _ = self.keys[category.index()].set(key);
    }

    fn key(&self, category: Category) -> Result<&SigningKey, KeychainError> {
        self.keys[category.index()].get_or_try_init(|| self.load(category))
    }

    fn load(&self, category: Category) -> Result<SigningKey, KeychainError> {
        let dir = match &self.dir {
            Some(d) => d,
            None => return Err(KeychainError::UnknownCategory(category)),
        };

        let pem_path = dir.join(format!("{}.pem", category.stem()));
        if pem_path.exists() {
            let text = fs::read_to_string(&pem_path)
                .map_err(|e| KeychainError::KeyLoad(category, e.to_string()))?;
            let secret = SecretKey::from_pkcs8_pem(&text)
                .or_else(|_| SecretKey::from_sec1_pem(&text))
                .map_err(|e| KeychainError::KeyLoad(category, e.to_string()))?;
            return Ok(SigningKey::from(secret));
        }

        let der_path = dir.join(format!("{}.der", category.stem()));
        if der_path.exists() {
            let bytes = fs::read(&der_path)
                .map_err(|e| KeychainError::KeyLoad(category, e.to_string()))?;
            let secret = SecretKey::from_pkcs8_der(&bytes)
                .map_err(|e| KeychainError::KeyLoad(category, e.to_string()))?;
            return Ok(SigningKey::from(secret));
        }

        Err(KeychainError::KeyLoad(
            category,
            format!("no key file for '{}'", category.stem()),
        ))
    }

    /// DER-encoded deterministic ECDSA signature over `payload`
    ///
    /// SHA-256 digest, RFC 6979 nonce: byte-identical across calls for the
    /// same `(category, payload)`.
    pub fn sign(&self, category: Category, payload: &[u8]) -> Result<Vec<u8>, KeychainError> {
        let key = self.key(category)?;
        let signature: Signature = key.sign(payload);
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_keychain() -> Keychain {
        let kc = Keychain::detached();
        kc.insert(
            Category::Cal,
            SigningKey::from_slice(&[0x42; 32]).unwrap(),
        );
        kc
    }

    #[test]
    fn signing_is_deterministic() {
        let kc = test_keychain();
        let a = kc.sign(Category::Cal, b"payload").unwrap();
        let b = kc.sign(Category::Cal, b"payload").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, kc.sign(Category::Cal, b"payload2").unwrap());
    }

    #[test]
    fn unbound_category_is_an_error() {
        let kc = test_keychain();
        assert!(matches!(
            kc.sign(Category::Network, b"payload"),
            Err(KeychainError::UnknownCategory(Category::Network))
        ));
    }

    #[test]
    fn insert_does_not_replace() {
        let kc = test_keychain();
        let before = kc.sign(Category::Cal, b"x").unwrap();
        kc.insert(Category::Cal, SigningKey::from_slice(&[0x43; 32]).unwrap());
        assert_eq!(before, kc.sign(Category::Cal, b"x").unwrap());
    }
}
