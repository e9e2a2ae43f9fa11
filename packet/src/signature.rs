//! Signature metadata carried by Data packets and signed Interests.
//!
//! The same [SignatureInfo] structure is encoded under two outer types: `SignatureInfo` (22) in
//! Data packets and legacy signed Interests, and `InterestSignatureInfo` (44) in current signed
//! Interests. Only the latter carries [SignatureInfo::nonce], [SignatureInfo::time] and
//! [SignatureInfo::seq_num] in practice, but both decode them.

use crate::{
    tlv::{self, element_size, nni_element_size, write_header, write_nni_element, Element},
    Error, Name,
};
use bytes::{BufMut, Bytes, BytesMut};
use commonware_codec::{EncodeSize, ReadExt as _, Write};

/// Signature types.
pub mod signature_type {
    pub const DIGEST_SHA256: u64 = 0;
    pub const SHA256_WITH_RSA: u64 = 1;
    pub const SHA256_WITH_ECDSA: u64 = 3;
    pub const HMAC_WITH_SHA256: u64 = 4;
    pub const ED25519: u64 = 5;
}

/// Describes how a packet was signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureInfo {
    signature_type: u64,
    key_locator: Option<Name>,
    nonce: Option<Bytes>,
    time: Option<u64>,
    seq_num: Option<u64>,
}

impl SignatureInfo {
    pub fn new(signature_type: u64) -> Self {
        Self {
            signature_type,
            key_locator: None,
            nonce: None,
            time: None,
            seq_num: None,
        }
    }

    pub fn with_key_locator(mut self, key_name: Name) -> Self {
        self.key_locator = Some(key_name);
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<Bytes>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the signing time in milliseconds since the UNIX epoch.
    pub fn with_time(mut self, millis: u64) -> Self {
        self.time = Some(millis);
        self
    }

    pub fn with_seq_num(mut self, seq_num: u64) -> Self {
        self.seq_num = Some(seq_num);
        self
    }

    pub fn signature_type(&self) -> u64 {
        self.signature_type
    }

    pub fn key_locator(&self) -> Option<&Name> {
        self.key_locator.as_ref()
    }

    pub fn nonce(&self) -> Option<&Bytes> {
        self.nonce.as_ref()
    }

    pub fn time(&self) -> Option<u64> {
        self.time
    }

    pub fn seq_num(&self) -> Option<u64> {
        self.seq_num
    }

    fn value_size(&self) -> usize {
        let mut size = nni_element_size(tlv::SIGNATURE_TYPE, self.signature_type);
        if let Some(key_name) = &self.key_locator {
            size += element_size(tlv::KEY_LOCATOR, key_name.encode_size());
        }
        if let Some(nonce) = &self.nonce {
            size += element_size(tlv::SIGNATURE_NONCE, nonce.len());
        }
        if let Some(time) = self.time {
            size += nni_element_size(tlv::SIGNATURE_TIME, time);
        }
        if let Some(seq_num) = self.seq_num {
            size += nni_element_size(tlv::SIGNATURE_SEQ_NUM, seq_num);
        }
        size
    }

    /// Size of this structure when encoded under the outer type `typ`.
    pub fn tlv_size(&self, typ: u64) -> usize {
        element_size(typ, self.value_size())
    }

    /// Writes this structure under the outer type `typ`.
    pub fn write_tlv(&self, typ: u64, buf: &mut impl BufMut) {
        write_header(typ, self.value_size(), buf);
        write_nni_element(tlv::SIGNATURE_TYPE, self.signature_type, buf);
        if let Some(key_name) = &self.key_locator {
            write_header(tlv::KEY_LOCATOR, key_name.encode_size(), buf);
            key_name.write(buf);
        }
        if let Some(nonce) = &self.nonce {
            tlv::write_bytes_element(tlv::SIGNATURE_NONCE, nonce, buf);
        }
        if let Some(time) = self.time {
            write_nni_element(tlv::SIGNATURE_TIME, time, buf);
        }
        if let Some(seq_num) = self.seq_num {
            write_nni_element(tlv::SIGNATURE_SEQ_NUM, seq_num, buf);
        }
    }

    /// Encodes this structure under the outer type `typ`.
    pub fn encode_tlv(&self, typ: u64) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.tlv_size(typ));
        self.write_tlv(typ, &mut buf);
        buf.freeze()
    }

    /// Decodes a `SignatureInfo` or `InterestSignatureInfo` element.
    pub fn from_element(element: &Element) -> Result<Self, Error> {
        if element.typ != tlv::SIGNATURE_INFO && element.typ != tlv::INTEREST_SIGNATURE_INFO {
            return Err(Error::UnexpectedType {
                expected: tlv::SIGNATURE_INFO,
                found: element.typ,
            });
        }
        let mut children = element.children()?.into_iter();
        let signature_type = children
            .next()
            .ok_or(Error::MissingElement(tlv::SIGNATURE_TYPE))?
            .expect_type(tlv::SIGNATURE_TYPE)?
            .as_nni()?;

        let mut info = Self::new(signature_type);
        for child in children {
            match child.typ {
                tlv::KEY_LOCATOR => {
                    let mut value = child.value.clone();
                    let name = Name::read(&mut value)?;
                    tlv::set_once(&mut info.key_locator, child.typ, name)?;
                }
                tlv::SIGNATURE_NONCE => {
                    tlv::set_once(&mut info.nonce, child.typ, child.value.clone())?
                }
                tlv::SIGNATURE_TIME => tlv::set_once(&mut info.time, child.typ, child.as_nni()?)?,
                tlv::SIGNATURE_SEQ_NUM => {
                    tlv::set_once(&mut info.seq_num, child.typ, child.as_nni()?)?
                }
                // Unrecognized non-critical elements (e.g. a validity period) are skipped
                _ => {}
            }
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_types() {
        let key: Name = "/alice/KEY/%01".parse().unwrap();
        let info = SignatureInfo::new(signature_type::ED25519)
            .with_key_locator(key.clone())
            .with_nonce(vec![1, 2, 3, 4, 5, 6, 7, 8])
            .with_time(1_000);

        for typ in [tlv::SIGNATURE_INFO, tlv::INTEREST_SIGNATURE_INFO] {
            let encoded = info.encode_tlv(typ);
            assert_eq!(encoded.len(), info.tlv_size(typ));
            assert_eq!(encoded[0] as u64, typ);

            let element = Element::read(&mut encoded.clone()).unwrap();
            let decoded = SignatureInfo::from_element(&element).unwrap();
            assert_eq!(decoded, info);
            assert_eq!(decoded.key_locator(), Some(&key));
        }
    }

    #[test]
    fn test_wrong_outer_type() {
        let element = Element::new(tlv::CONTENT, vec![0x1b, 0x01, 0x00]);
        assert!(matches!(
            SignatureInfo::from_element(&element),
            Err(Error::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_missing_type() {
        let element = Element::new(tlv::SIGNATURE_INFO, Bytes::new());
        assert!(matches!(
            SignatureInfo::from_element(&element),
            Err(Error::MissingElement(tlv::SIGNATURE_TYPE))
        ));
    }
}
