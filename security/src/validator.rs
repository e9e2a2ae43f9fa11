//! Parsing and verification of signed command interests.

use crate::{Error, PublicKey, SignedInterestFormat};
use bytes::{Bytes, BytesMut};
use commonware_codec::{DecodeExt as _, Write as _};
use mgmt_packet::{signature_type, tlv, Name, SignatureInfo};

/// Returns the concatenated wire encoding of the components of `name`.
pub fn signed_portion(name: &Name) -> Bytes {
    let mut buf = BytesMut::with_capacity(name.value_size());
    for component in name.iter() {
        component.write(&mut buf);
    }
    buf.freeze()
}

/// The signature extracted from a command interest name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSignature {
    format: SignedInterestFormat,
    info: SignatureInfo,
    value: Bytes,
    timestamp: u64,
    signed: Bytes,
}

impl CommandSignature {
    /// Extracts the signature from `name`, detecting the layout from the type of the signature
    /// info component.
    pub fn parse(name: &Name) -> Result<Self, Error> {
        let len = name.len();
        if len < 2 {
            return Err(Error::MissingSignature);
        }
        let info_element = tlv::Element::decode(name.components()[len - 2].value().clone())
            .map_err(|_| Error::MissingSignature)?;
        let value_element = tlv::Element::decode(name.components()[len - 1].value().clone())
            .map_err(|_| Error::MissingSignature)?;
        let info = SignatureInfo::from_element(&info_element)?;

        let (format, timestamp) = match info_element.typ {
            tlv::SIGNATURE_INFO => {
                if len < 4 {
                    return Err(Error::MissingSignature);
                }
                value_element.expect_type(tlv::SIGNATURE_VALUE)?;
                let timestamp = name.components()[len - 4].to_number()?;
                (SignedInterestFormat::V02, timestamp)
            }
            tlv::INTEREST_SIGNATURE_INFO => {
                value_element.expect_type(tlv::INTEREST_SIGNATURE_VALUE)?;
                let timestamp = info
                    .time()
                    .ok_or(mgmt_packet::Error::MissingElement(tlv::SIGNATURE_TIME))?;
                (SignedInterestFormat::V03, timestamp)
            }
            _ => return Err(Error::MissingSignature),
        };

        Ok(Self {
            format,
            info,
            value: value_element.value,
            timestamp,
            signed: signed_portion(&name.prefix(len - 1)),
        })
    }

    pub fn format(&self) -> SignedInterestFormat {
        self.format
    }

    pub fn info(&self) -> &SignatureInfo {
        &self.info
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Milliseconds since the epoch at which the command was signed.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the name of the key that signed the command.
    pub fn key_locator(&self) -> Result<&Name, Error> {
        self.info.key_locator().ok_or(Error::MissingKeyLocator)
    }

    /// Number of trailing name components holding the signature.
    pub fn suffix_len(&self) -> usize {
        match self.format {
            SignedInterestFormat::V02 => 4,
            SignedInterestFormat::V03 => 2,
        }
    }

    /// Checks the signature against `key`.
    pub fn verify(&self, key: &PublicKey) -> Result<bool, Error> {
        match self.info.signature_type() {
            signature_type::ED25519 => Ok(key.verify(&self.signed, &self.value)),
            other => Err(Error::UnsupportedSignatureType(other)),
        }
    }
}
