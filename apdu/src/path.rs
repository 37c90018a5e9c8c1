// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP-32 derivation path parsing and wire packing

use core::fmt;
use core::str::FromStr;

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// Hardened-index bit
pub const HARDENED: u32 = 0x8000_0000;

/// Maximum path depth accepted by the device
pub const MAX_DEPTH: usize = 10;

/// Derivation path errors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path does not start with the `m` master marker
    #[error("derivation path must start with 'm'")]
    MissingMaster,

    /// A component is empty or not a valid index
    #[error("invalid derivation path component '{0}'")]
    InvalidComponent(String),

    /// Path exceeds the device depth limit
    #[error("derivation path too deep ({0} components)")]
    TooDeep(usize),
}

/// A parsed BIP-32 derivation path (hardened bit folded into each component)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// Build from raw components (hardened bit already applied)
    pub fn new(components: Vec<u32>) -> Result<Self, PathError> {
        if components.len() > MAX_DEPTH {
            return Err(PathError::TooDeep(components.len()));
        }
        Ok(Self(components))
    }

    /// Raw components
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Wire form: component count byte followed by 4-byte big-endian indexes
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.0.len() * 4);
        out.push(self.0.len() as u8);
        for &c in &self.0 {
            let mut word = [0u8; 4];
            BigEndian::write_u32(&mut word, c);
            out.extend_from_slice(&word);
        }
        out
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, PathError> {
        let mut split = s.split('/');
        if split.next() != Some("m") {
            return Err(PathError::MissingMaster);
        }

        let mut components = Vec::new();
        for part in split {
            let (digits, hardened) = match part.strip_suffix('\'') {
                Some(d) => (d, HARDENED),
                None => (part, 0),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| PathError::InvalidComponent(part.to_string()))?;
            if index >= HARDENED {
                return Err(PathError::InvalidComponent(part.to_string()));
            }
            components.push(index | hardened);
        }
        Self::new(components)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for &c in &self.0 {
            if c & HARDENED != 0 {
                write!(f, "/{}'", c & !HARDENED)?;
            } else {
                write!(f, "/{c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_pack() {
        let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(
            path.components(),
            &[
                44 | HARDENED,
                60 | HARDENED,
                HARDENED,
                0,
                0,
            ]
        );

        let packed = path.pack();
        assert_eq!(packed.len(), 1 + 5 * 4);
        assert_eq!(packed[0], 5);
        assert_eq!(&packed[1..5], &[0x80, 0, 0, 44]);
        assert_eq!(&packed[17..21], &[0, 0, 0, 0]);
    }

    #[test]
    fn display_round_trips() {
        let s = "m/44'/60'/0'/0/1";
        let path: DerivationPath = s.parse().unwrap();
        assert_eq!(path.to_string(), s);
    }

    #[test]
    fn rejects_bad_paths() {
        assert_eq!(
            "44'/60'".parse::<DerivationPath>(),
            Err(PathError::MissingMaster)
        );
        assert!(matches!(
            "m/44'/x".parse::<DerivationPath>(),
            Err(PathError::InvalidComponent(_))
        ));
        assert!(matches!(
            "m/0/0/0/0/0/0/0/0/0/0/0".parse::<DerivationPath>(),
            Err(PathError::TooDeep(11))
        ));
    }
}
