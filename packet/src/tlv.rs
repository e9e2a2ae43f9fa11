//! TLV primitives: VAR-NUMBER, NonNegativeInteger, and raw elements.
//!
//! Type and length fields use the NDN VAR-NUMBER encoding:
//! - values below 253 take a single byte
//! - `253` is followed by a 2-byte big-endian value
//! - `254` is followed by a 4-byte big-endian value
//! - `255` is followed by an 8-byte big-endian value
//!
//! Only the shortest encoding of a value is accepted when reading.

use crate::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt as _, Write};

// Packet types
pub const INTEREST: u64 = 5;
pub const DATA: u64 = 6;

// Name and components
pub const NAME: u64 = 7;
pub const IMPLICIT_SHA256_DIGEST_COMPONENT: u64 = 1;
pub const PARAMETERS_SHA256_DIGEST_COMPONENT: u64 = 2;
pub const GENERIC_NAME_COMPONENT: u64 = 8;
pub const KEYWORD_NAME_COMPONENT: u64 = 32;
pub const SEGMENT_NAME_COMPONENT: u64 = 50;
pub const VERSION_NAME_COMPONENT: u64 = 54;
pub const TIMESTAMP_NAME_COMPONENT: u64 = 56;
pub const SEQUENCE_NUM_NAME_COMPONENT: u64 = 58;

// Interest
pub const CAN_BE_PREFIX: u64 = 33;
pub const MUST_BE_FRESH: u64 = 18;
pub const NONCE: u64 = 10;
pub const INTEREST_LIFETIME: u64 = 12;
pub const INTEREST_SIGNATURE_INFO: u64 = 44;
pub const INTEREST_SIGNATURE_VALUE: u64 = 46;

// Data
pub const META_INFO: u64 = 20;
pub const CONTENT: u64 = 21;
pub const SIGNATURE_INFO: u64 = 22;
pub const SIGNATURE_VALUE: u64 = 23;
pub const CONTENT_TYPE: u64 = 24;
pub const FRESHNESS_PERIOD: u64 = 25;
pub const FINAL_BLOCK_ID: u64 = 26;

// Signature
pub const SIGNATURE_TYPE: u64 = 27;
pub const KEY_LOCATOR: u64 = 28;
pub const SIGNATURE_NONCE: u64 = 38;
pub const SIGNATURE_TIME: u64 = 40;
pub const SIGNATURE_SEQ_NUM: u64 = 42;
pub const VALIDITY_PERIOD: u64 = 253;
pub const NOT_BEFORE: u64 = 254;
pub const NOT_AFTER: u64 = 255;

// Management
pub const CONTROL_RESPONSE: u64 = 101;
pub const STATUS_CODE: u64 = 102;
pub const STATUS_TEXT: u64 = 103;
pub const CONTROL_PARAMETERS: u64 = 104;
pub const FACE_ID: u64 = 105;
pub const COST: u64 = 106;
pub const STRATEGY: u64 = 107;
pub const FLAGS: u64 = 108;
pub const EXPIRATION_PERIOD: u64 = 109;
pub const ORIGIN: u64 = 111;
pub const MASK: u64 = 112;
pub const URI: u64 = 114;
pub const LOCAL_URI: u64 = 129;
pub const CAPACITY: u64 = 131;
pub const COUNT: u64 = 132;
pub const FACE_PERSISTENCY: u64 = 133;
pub const BASE_CONGESTION_MARKING_INTERVAL: u64 = 135;
pub const DEFAULT_CONGESTION_THRESHOLD: u64 = 136;
pub const MTU: u64 = 137;

/// Returns an error if `buf` holds fewer than `len` bytes.
#[inline]
pub(crate) fn at_least(buf: &mut impl Buf, len: usize) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(Error::Codec(CodecError::EndOfBuffer));
    }
    Ok(())
}

/// Returns the number of bytes needed to encode `value` as a VAR-NUMBER.
#[inline]
pub fn var_number_size(value: u64) -> usize {
    if value < 253 {
        1
    } else if value <= u16::MAX as u64 {
        3
    } else if value <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Writes `value` as a VAR-NUMBER.
#[inline]
pub fn write_var_number(value: u64, buf: &mut impl BufMut) {
    if value < 253 {
        buf.put_u8(value as u8);
    } else if value <= u16::MAX as u64 {
        buf.put_u8(253);
        buf.put_u16(value as u16);
    } else if value <= u32::MAX as u64 {
        buf.put_u8(254);
        buf.put_u32(value as u32);
    } else {
        buf.put_u8(255);
        buf.put_u64(value);
    }
}

/// Reads a VAR-NUMBER, rejecting encodings that are longer than necessary.
pub fn read_var_number(buf: &mut impl Buf) -> Result<u64, Error> {
    at_least(buf, 1)?;
    let (value, min) = match buf.get_u8() {
        253 => {
            at_least(buf, 2)?;
            (buf.get_u16() as u64, 253)
        }
        254 => {
            at_least(buf, 4)?;
            (buf.get_u32() as u64, u16::MAX as u64 + 1)
        }
        255 => {
            at_least(buf, 8)?;
            (buf.get_u64(), u32::MAX as u64 + 1)
        }
        first => return Ok(first as u64),
    };
    if value < min {
        return Err(Error::InvalidVarNumber);
    }
    Ok(value)
}

/// Returns the number of bytes needed to encode `value` as a NonNegativeInteger.
#[inline]
pub fn nni_size(value: u64) -> usize {
    if value <= u8::MAX as u64 {
        1
    } else if value <= u16::MAX as u64 {
        2
    } else if value <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

/// Writes `value` as a NonNegativeInteger (without a TLV header).
#[inline]
pub fn write_nni(value: u64, buf: &mut impl BufMut) {
    match nni_size(value) {
        1 => buf.put_u8(value as u8),
        2 => buf.put_u16(value as u16),
        4 => buf.put_u32(value as u32),
        _ => buf.put_u64(value),
    }
}

/// Interprets `value` as a NonNegativeInteger.
pub fn read_nni(mut value: &[u8]) -> Result<u64, Error> {
    match value.len() {
        1 => Ok(value.get_u8() as u64),
        2 => Ok(value.get_u16() as u64),
        4 => Ok(value.get_u32() as u64),
        8 => Ok(value.get_u64()),
        len => Err(Error::InvalidNonNegativeInteger(len)),
    }
}

/// Returns the size of a TLV element with a value of `len` bytes.
#[inline]
pub fn element_size(typ: u64, len: usize) -> usize {
    var_number_size(typ) + var_number_size(len as u64) + len
}

/// Writes the type and length of a TLV element.
#[inline]
pub fn write_header(typ: u64, len: usize, buf: &mut impl BufMut) {
    write_var_number(typ, buf);
    write_var_number(len as u64, buf);
}

/// Writes a TLV element holding raw bytes.
#[inline]
pub fn write_bytes_element(typ: u64, value: &[u8], buf: &mut impl BufMut) {
    write_header(typ, value.len(), buf);
    buf.put_slice(value);
}

/// Returns the size of a TLV element holding a NonNegativeInteger.
#[inline]
pub fn nni_element_size(typ: u64, value: u64) -> usize {
    element_size(typ, nni_size(value))
}

/// Writes a TLV element holding a NonNegativeInteger.
#[inline]
pub fn write_nni_element(typ: u64, value: u64, buf: &mut impl BufMut) {
    write_header(typ, nni_size(value), buf);
    write_nni(value, buf);
}

/// A raw TLV element: a type and its (unparsed) value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub typ: u64,
    pub value: Bytes,
}

impl Element {
    pub fn new(typ: u64, value: impl Into<Bytes>) -> Self {
        Self {
            typ,
            value: value.into(),
        }
    }

    /// Returns an error unless this element has type `expected`.
    pub fn expect_type(&self, expected: u64) -> Result<&Self, Error> {
        if self.typ != expected {
            return Err(Error::UnexpectedType {
                expected,
                found: self.typ,
            });
        }
        Ok(self)
    }

    /// Parses the value of this element as a sequence of nested elements.
    pub fn children(&self) -> Result<Vec<Element>, Error> {
        let mut value = self.value.clone();
        let mut children = Vec::new();
        while value.has_remaining() {
            children.push(Element::read(&mut value)?);
        }
        Ok(children)
    }

    /// Interprets the value of this element as a NonNegativeInteger.
    pub fn as_nni(&self) -> Result<u64, Error> {
        read_nni(&self.value)
    }

    /// Interprets the value of this element as a UTF-8 string.
    pub fn as_string(&self, context: &'static str) -> Result<String, Error> {
        String::from_utf8(self.value.to_vec()).map_err(|_| Error::InvalidUtf8(context))
    }

    /// Returns the full wire encoding (header included) of this element.
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encode_size());
        self.write(&mut buf);
        buf.freeze()
    }
}

impl Write for Element {
    fn write(&self, buf: &mut impl BufMut) {
        write_bytes_element(self.typ, &self.value, buf);
    }
}

impl EncodeSize for Element {
    fn encode_size(&self) -> usize {
        element_size(self.typ, self.value.len())
    }
}

impl Read for Element {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let typ = read_var_number(buf)?;
        if typ == 0 {
            return Err(Error::InvalidData("TLV", "type zero is reserved".into()).into());
        }
        let len = read_var_number(buf)?;
        let len = usize::try_from(len).map_err(|_| CodecError::InvalidUsize)?;
        at_least(buf, len)?;
        Ok(Self {
            typ,
            value: buf.copy_to_bytes(len),
        })
    }
}

/// Reads the first element of `buf` and checks its type.
pub fn read_expected(buf: &mut impl Buf, expected: u64) -> Result<Element, Error> {
    let element = Element::read(buf)?;
    element.expect_type(expected)?;
    Ok(element)
}

/// Assigns `value` to `slot`, failing if the element was already seen.
pub(crate) fn set_once<T>(slot: &mut Option<T>, typ: u64, value: T) -> Result<(), Error> {
    if slot.is_some() {
        return Err(Error::DuplicateElement(typ));
    }
    *slot = Some(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt as _, Encode as _};
    use test_case::test_case;

    #[test_case(0, &[0x00]; "zero")]
    #[test_case(252, &[0xfc]; "largest single byte")]
    #[test_case(253, &[0xfd, 0x00, 0xfd]; "smallest two byte")]
    #[test_case(65535, &[0xfd, 0xff, 0xff]; "largest two byte")]
    #[test_case(65536, &[0xfe, 0x00, 0x01, 0x00, 0x00]; "smallest four byte")]
    #[test_case(1 << 32, &[0xff, 0, 0, 0, 0x01, 0, 0, 0, 0]; "eight byte")]
    fn test_var_number(value: u64, expected: &[u8]) {
        let mut buf = Vec::new();
        write_var_number(value, &mut buf);
        assert_eq!(buf, expected);
        assert_eq!(var_number_size(value), expected.len());
        assert_eq!(read_var_number(&mut &buf[..]).unwrap(), value);
    }

    #[test]
    fn test_var_number_not_minimal() {
        let buf = [0xfd, 0x00, 0x10];
        assert!(matches!(
            read_var_number(&mut &buf[..]),
            Err(Error::InvalidVarNumber)
        ));
    }

    #[test]
    fn test_nni() {
        for (value, size) in [(0u64, 1), (255, 1), (256, 2), (65536, 4), (1 << 40, 8)] {
            let mut buf = Vec::new();
            write_nni(value, &mut buf);
            assert_eq!(buf.len(), size);
            assert_eq!(nni_size(value), size);
            assert_eq!(read_nni(&buf).unwrap(), value);
        }
        assert!(matches!(
            read_nni(&[0, 0, 1]),
            Err(Error::InvalidNonNegativeInteger(3))
        ));
    }

    #[test]
    fn test_element() {
        let element = Element::new(CONTROL_PARAMETERS, vec![0x69, 0x01, 0x0a]);
        let encoded = element.encode();
        assert_eq!(&encoded[..], &[0x68, 0x03, 0x69, 0x01, 0x0a]);

        let decoded = Element::decode(encoded.freeze()).unwrap();
        assert_eq!(decoded, element);
        let children = decoded.children().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].typ, FACE_ID);
        assert_eq!(children[0].as_nni().unwrap(), 10);
    }

    #[test]
    fn test_element_type_zero() {
        let err = Element::decode(&[0x00, 0x00][..]).unwrap_err();
        assert!(matches!(Error::from(err), Error::InvalidData("TLV", _)));
    }

    #[test]
    fn test_element_truncated() {
        assert!(matches!(
            Element::decode(&[0x15, 0x03, 0x01][..]),
            Err(CodecError::EndOfBuffer)
        ));
    }

    #[test]
    fn test_read_expected() {
        let buf = [0x07, 0x00];
        assert!(matches!(
            read_expected(&mut &buf[..], DATA),
            Err(Error::UnexpectedType {
                expected: DATA,
                found: NAME
            })
        ));
    }
}
