// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for a connected signing device
//!
//! Wraps an [`Exchange`] transport with one method per protocol operation.
//! Frame sequences are generated up front by the pure builders, then
//! transmitted strictly one at a time: each frame must be acknowledged
//! before the next is sent, and the first non-OK status aborts the
//! operation.

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use ledger_eth_apdu::{path::DerivationPath, provide, ApduFrame};

use crate::{
    descriptor::{
        DelegationAuthorization, Descriptor, DynamicNetwork, EnumValue, Gating, NftCollection,
        PluginDescriptor, ProxyInfo, SafeAccount, TokenMetadata, TrustedName, TxSimulation,
    },
    eip712::{self, MessageFilters, TypedData},
    gcs::{Field, TxInfo},
    keychain::Keychain,
    Error, Exchange,
};

/// A `(v, r, s)` signature as returned by the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSignature {
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl DeviceSignature {
    fn parse<E: core::fmt::Display + core::fmt::Debug>(data: &[u8]) -> Result<Self, Error<E>> {
        if data.len() < 65 {
            return Err(Error::UnexpectedResponse);
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&data[1..33]);
        s.copy_from_slice(&data[33..65]);
        Ok(Self { v: data[0], r, s })
    }
}

/// Public key, address and optional chain code for a derivation path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressInfo {
    pub public_key: Vec<u8>,
    pub address: String,
    pub chain_code: Option<[u8; 32]>,
}

impl AddressInfo {
    fn parse<E: core::fmt::Display + core::fmt::Debug>(data: &[u8]) -> Result<Self, Error<E>> {
        let (&key_len, rest) = data.split_first().ok_or(Error::UnexpectedResponse)?;
        if rest.len() < key_len as usize {
            return Err(Error::UnexpectedResponse);
        }
        let (public_key, rest) = rest.split_at(key_len as usize);

        let (&addr_len, rest) = rest.split_first().ok_or(Error::UnexpectedResponse)?;
        if rest.len() < addr_len as usize {
            return Err(Error::UnexpectedResponse);
        }
        let (addr, rest) = rest.split_at(addr_len as usize);
        let address = String::from_utf8(addr.to_vec()).map_err(|_| Error::UnexpectedResponse)?;

        let chain_code = if rest.len() >= 32 {
            let mut code = [0u8; 32];
            code.copy_from_slice(&rest[..32]);
            Some(code)
        } else {
            None
        };

        Ok(Self {
            public_key: public_key.to_vec(),
            address,
            chain_code,
        })
    }
}

/// Ethereum handle for a connected device
///
/// Generic over [`Exchange`] to support different underlying transports.
pub struct DeviceHandle<T: Exchange> {
    t: T,
}

impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self { t }
    }
}

impl<T: Exchange> DeviceHandle<T> {
    /// Recover the underlying transport
    pub fn into_inner(self) -> T {
        self.t
    }
}

impl<T: Exchange + Send> DeviceHandle<T> {
    /// Exchange one frame, mapping non-OK statuses to errors
    async fn request(&mut self, frame: &ApduFrame) -> Result<Vec<u8>, Error<T::Error>> {
        debug!(
            "-> ins {:#04x} p1 {:#04x} p2 {:#04x} ({} bytes)",
            frame.ins,
            frame.p1,
            frame.p2,
            frame.data.len()
        );
        let (sw, data) = self.t.exchange(frame).await.map_err(Error::Transport)?;
        debug!("<- status {sw:#06x} ({} bytes)", data.len());

        match Error::from_status(sw) {
            None => Ok(data),
            Some(e) => Err(e),
        }
    }

    /// Exchange a frame sequence, returning the final response payload
    async fn request_all(&mut self, frames: &[ApduFrame]) -> Result<Vec<u8>, Error<T::Error>> {
        let mut last = Vec::new();
        for frame in frames {
            last = self.request(frame).await?;
        }
        Ok(last)
    }

    /// Fetch a 4-byte anti-replay challenge
    pub async fn get_challenge(&mut self) -> Result<u32, Error<T::Error>> {
        let data = self.request(&provide::get_challenge()).await?;
        if data.len() < 4 {
            return Err(Error::UnexpectedResponse);
        }
        Ok(BigEndian::read_u32(&data[..4]))
    }

    /// Fetch the public key and address for a derivation path
    pub async fn get_address(
        &mut self,
        path: &DerivationPath,
        chain_id: Option<u64>,
        display: bool,
    ) -> Result<AddressInfo, Error<T::Error>> {
        let frame = provide::get_public_addr(display, false, path, chain_id);
        let data = self.request(&frame).await?;
        AddressInfo::parse(&data)
    }

    /// Sign an externally built raw transaction
    pub async fn sign_transaction(
        &mut self,
        path: &DerivationPath,
        rlp: &[u8],
    ) -> Result<DeviceSignature, Error<T::Error>> {
        let frames = provide::sign_transaction(path, rlp);
        let data = self.request_all(&frames).await?;
        DeviceSignature::parse(&data)
    }

    /// Sign an EIP-191 personal message
    pub async fn personal_sign(
        &mut self,
        path: &DerivationPath,
        message: &[u8],
    ) -> Result<DeviceSignature, Error<T::Error>> {
        let frames = provide::personal_sign(path, message);
        let data = self.request_all(&frames).await?;
        DeviceSignature::parse(&data)
    }

    /// Sign an EIP-712 message, streaming variant
    pub async fn sign_typed_data(
        &mut self,
        keychain: &Keychain,
        path: &DerivationPath,
        data: &TypedData,
        filters: Option<&MessageFilters>,
    ) -> Result<DeviceSignature, Error<T::Error>> {
        let frames = eip712::typed_data_frames(keychain, data, filters, path)?;
        let resp = self.request_all(&frames).await?;
        DeviceSignature::parse(&resp)
    }

    /// Sign an EIP-712 message, legacy variant with precomputed hashes
    pub async fn sign_typed_data_legacy(
        &mut self,
        keychain: &Keychain,
        path: &DerivationPath,
        data: &TypedData,
        filters: Option<&MessageFilters>,
        domain_hash: &[u8; 32],
        message_hash: &[u8; 32],
    ) -> Result<DeviceSignature, Error<T::Error>> {
        let frames = eip712::typed_data_frames_legacy(
            keychain,
            data,
            filters,
            path,
            domain_hash,
            message_hash,
        )?;
        let resp = self.request_all(&frames).await?;
        DeviceSignature::parse(&resp)
    }

    /// Sign an EIP-7702 delegation authorization
    pub async fn sign_authorization(
        &mut self,
        authorization: &DelegationAuthorization,
    ) -> Result<DeviceSignature, Error<T::Error>> {
        let frames = provide::sign_eip7702_authorization(&authorization.serialize())?;
        let data = self.request_all(&frames).await?;
        DeviceSignature::parse(&data)
    }

    /// Deliver a dynamic network descriptor (and its icon, when present)
    pub async fn provide_network_information(
        &mut self,
        keychain: &Keychain,
        network: &DynamicNetwork,
    ) -> Result<(), Error<T::Error>> {
        let tlv = network.serialize(keychain)?;
        let frames = provide::provide_network_information(&tlv, network.icon())?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver a trusted-name descriptor
    pub async fn provide_trusted_name(
        &mut self,
        keychain: &Keychain,
        name: &TrustedName,
    ) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_trusted_name(&name.serialize(keychain)?)?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver a proxy-implementation descriptor
    pub async fn provide_proxy_info(
        &mut self,
        keychain: &Keychain,
        proxy: &ProxyInfo,
    ) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_proxy_info(&proxy.serialize(keychain)?)?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver an enum-value descriptor
    pub async fn provide_enum_value(
        &mut self,
        keychain: &Keychain,
        value: &EnumValue,
    ) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_enum_value(&value.serialize(keychain)?)?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver a transaction-info record binding a calldata schema
    pub async fn provide_transaction_info(
        &mut self,
        keychain: &Keychain,
        info: &TxInfo,
    ) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_transaction_info(&info.serialize(keychain)?)?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver one calldata field of the bound schema
    pub async fn provide_field(&mut self, field: &Field) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_field(&field.serialize())?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver a transaction-simulation verdict
    pub async fn provide_tx_simulation(
        &mut self,
        keychain: &Keychain,
        simulation: &TxSimulation,
    ) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_tx_simulation(&simulation.serialize(keychain)?)?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver a safe / signer account descriptor
    pub async fn provide_safe_account(
        &mut self,
        keychain: &Keychain,
        account: &SafeAccount,
    ) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_safe_account(&account.serialize(keychain)?)?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver a gating banner descriptor
    pub async fn provide_gating(
        &mut self,
        keychain: &Keychain,
        gating: &Gating,
    ) -> Result<(), Error<T::Error>> {
        let frames = provide::provide_gating(&gating.serialize(keychain)?)?;
        self.request_all(&frames).await?;
        Ok(())
    }

    /// Deliver ERC-20 token display metadata
    pub async fn provide_token_metadata(
        &mut self,
        keychain: &Keychain,
        token: &TokenMetadata,
    ) -> Result<(), Error<T::Error>> {
        let frame = provide::provide_erc20_token_information(token.serialize(keychain)?)?;
        self.request(&frame).await?;
        Ok(())
    }

    /// Deliver NFT collection display metadata
    pub async fn provide_nft_information(
        &mut self,
        keychain: &Keychain,
        collection: &NftCollection,
    ) -> Result<(), Error<T::Error>> {
        let frame = provide::provide_nft_information(collection.serialize(keychain)?)?;
        self.request(&frame).await?;
        Ok(())
    }

    /// Register a contract / selector plugin binding
    pub async fn set_plugin(
        &mut self,
        keychain: &Keychain,
        plugin: &PluginDescriptor,
    ) -> Result<(), Error<T::Error>> {
        let frame = provide::set_plugin(plugin.serialize(keychain)?)?;
        self.request(&frame).await?;
        Ok(())
    }
}
