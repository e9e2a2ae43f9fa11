//! Interest packets.

use crate::{
    tlv::{self, element_size, nni_element_size, write_header, write_nni_element, Element},
    Error, Name,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, Write};
use std::time::Duration;

/// Length of an Interest nonce.
pub const NONCE_LENGTH: usize = 4;

/// A request for named content.
///
/// Command Interests carry their parameters and signature inside the [Name], so this type
/// only models the selectors a management request uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interest {
    name: Name,
    can_be_prefix: bool,
    must_be_fresh: bool,
    nonce: Option<[u8; NONCE_LENGTH]>,
    lifetime_millis: Option<u64>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            nonce: None,
            lifetime_millis: None,
        }
    }

    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    pub fn with_nonce(mut self, nonce: [u8; NONCE_LENGTH]) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Sets the lifetime in milliseconds.
    pub fn with_lifetime(mut self, millis: u64) -> Self {
        self.lifetime_millis = Some(millis);
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn can_be_prefix(&self) -> bool {
        self.can_be_prefix
    }

    pub fn must_be_fresh(&self) -> bool {
        self.must_be_fresh
    }

    pub fn nonce(&self) -> Option<[u8; NONCE_LENGTH]> {
        self.nonce
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime_millis.map(Duration::from_millis)
    }

    fn value_size(&self) -> usize {
        let mut size = self.name.encode_size();
        if self.can_be_prefix {
            size += element_size(tlv::CAN_BE_PREFIX, 0);
        }
        if self.must_be_fresh {
            size += element_size(tlv::MUST_BE_FRESH, 0);
        }
        if self.nonce.is_some() {
            size += element_size(tlv::NONCE, NONCE_LENGTH);
        }
        if let Some(lifetime) = self.lifetime_millis {
            size += nni_element_size(tlv::INTEREST_LIFETIME, lifetime);
        }
        size
    }
}

impl Write for Interest {
    fn write(&self, buf: &mut impl BufMut) {
        write_header(tlv::INTEREST, self.value_size(), buf);
        self.name.write(buf);
        if self.can_be_prefix {
            write_header(tlv::CAN_BE_PREFIX, 0, buf);
        }
        if self.must_be_fresh {
            write_header(tlv::MUST_BE_FRESH, 0, buf);
        }
        if let Some(nonce) = &self.nonce {
            tlv::write_bytes_element(tlv::NONCE, nonce, buf);
        }
        if let Some(lifetime) = self.lifetime_millis {
            write_nni_element(tlv::INTEREST_LIFETIME, lifetime, buf);
        }
    }
}

impl EncodeSize for Interest {
    fn encode_size(&self) -> usize {
        element_size(tlv::INTEREST, self.value_size())
    }
}

impl Read for Interest {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self::try_from(tlv::read_expected(buf, tlv::INTEREST)?)?)
    }
}

impl TryFrom<Element> for Interest {
    type Error = Error;

    fn try_from(element: Element) -> Result<Self, Self::Error> {
        element.expect_type(tlv::INTEREST)?;
        let mut children = element.children()?.into_iter();
        let name = children
            .next()
            .ok_or(Error::MissingElement(tlv::NAME))
            .and_then(Name::try_from)?;

        let mut interest = Interest::new(name);
        let mut last = 0;
        for child in children {
            // Known elements must appear in order; unknown ones are skipped
            let order = match child.typ {
                tlv::CAN_BE_PREFIX => 1,
                tlv::MUST_BE_FRESH => 2,
                tlv::NONCE => 3,
                tlv::INTEREST_LIFETIME => 4,
                _ => continue,
            };
            if order <= last {
                return Err(Error::InvalidData(
                    "Interest",
                    format!("element {} out of order", child.typ),
                ));
            }
            last = order;
            match child.typ {
                tlv::CAN_BE_PREFIX => interest.can_be_prefix = true,
                tlv::MUST_BE_FRESH => interest.must_be_fresh = true,
                tlv::NONCE => {
                    let nonce: [u8; NONCE_LENGTH] =
                        child.value.as_ref().try_into().map_err(|_| {
                            Error::InvalidData(
                                "Interest",
                                format!("nonce of {} bytes", child.value.len()),
                            )
                        })?;
                    interest.nonce = Some(nonce);
                }
                _ => interest.lifetime_millis = Some(child.as_nni()?),
            }
        }
        Ok(interest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt as _, Encode as _};

    #[test]
    fn test_round_trip() {
        let interest = Interest::new("/localhost/nfd/faces/list".parse().unwrap())
            .with_can_be_prefix(true)
            .with_must_be_fresh(true)
            .with_nonce([1, 2, 3, 4])
            .with_lifetime(4000);
        let encoded = interest.encode();
        assert_eq!(Interest::decode(encoded.freeze()).unwrap(), interest);
    }

    #[test]
    fn test_minimal() {
        let interest = Interest::new("/a".parse().unwrap());
        let encoded = interest.encode();
        assert_eq!(&encoded[..], &[0x05, 0x05, 0x07, 0x03, 0x08, 0x01, b'a']);
        let decoded = Interest::decode(encoded.freeze()).unwrap();
        assert!(!decoded.can_be_prefix());
        assert_eq!(decoded.nonce(), None);
    }

    #[test]
    fn test_bad_nonce() {
        let encoded = [0x05, 0x07, 0x07, 0x00, 0x0a, 0x03, 0x01, 0x02, 0x03];
        let err = Interest::decode(&encoded[..]).unwrap_err();
        assert!(matches!(Error::from(err), Error::InvalidData("Interest", _)));
    }

    #[test]
    fn test_out_of_order() {
        // Nonce before MustBeFresh
        let encoded = [
            0x05, 0x0a, 0x07, 0x00, 0x0a, 0x04, 0x01, 0x02, 0x03, 0x04, 0x12, 0x00,
        ];
        let err = Interest::decode(&encoded[..]).unwrap_err();
        assert!(matches!(Error::from(err), Error::InvalidData("Interest", _)));
    }
}
