//! Hierarchical names.
//!
//! A [Name] is a sequence of typed [Component]s. Names print (and parse) in URI form, for
//! example `/localhost/nfd/fib/add-nexthop` or `/example/v=3/seg=0`.

use crate::{
    tlv::{self, at_least, element_size, read_nni, write_header, write_nni, Element},
    Error,
};
use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt as _, Write};
use std::{cmp::Ordering, fmt, str::FromStr};

/// A single name component: a TLV type and an opaque value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Component {
    typ: u64,
    value: Bytes,
}

impl Component {
    pub fn new(typ: u64, value: impl Into<Bytes>) -> Self {
        Self {
            typ,
            value: value.into(),
        }
    }

    pub fn generic(value: impl Into<Bytes>) -> Self {
        Self::new(tlv::GENERIC_NAME_COMPONENT, value)
    }

    pub fn keyword(value: impl Into<Bytes>) -> Self {
        Self::new(tlv::KEYWORD_NAME_COMPONENT, value)
    }

    /// A generic component holding a NonNegativeInteger.
    pub fn number(value: u64) -> Self {
        Self::from_number(tlv::GENERIC_NAME_COMPONENT, value)
    }

    pub fn version(value: u64) -> Self {
        Self::from_number(tlv::VERSION_NAME_COMPONENT, value)
    }

    pub fn segment(value: u64) -> Self {
        Self::from_number(tlv::SEGMENT_NAME_COMPONENT, value)
    }

    pub fn timestamp(value: u64) -> Self {
        Self::from_number(tlv::TIMESTAMP_NAME_COMPONENT, value)
    }

    pub fn sequence_number(value: u64) -> Self {
        Self::from_number(tlv::SEQUENCE_NUM_NAME_COMPONENT, value)
    }

    fn from_number(typ: u64, value: u64) -> Self {
        let mut buf = Vec::with_capacity(tlv::nni_size(value));
        write_nni(value, &mut buf);
        Self::new(typ, buf)
    }

    pub fn typ(&self) -> u64 {
        self.typ
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Interprets the value as a NonNegativeInteger.
    pub fn to_number(&self) -> Result<u64, Error> {
        read_nni(&self.value)
    }

    pub fn is_generic(&self) -> bool {
        self.typ == tlv::GENERIC_NAME_COMPONENT
    }

    pub fn is_version(&self) -> bool {
        self.typ == tlv::VERSION_NAME_COMPONENT && self.to_number().is_ok()
    }

    pub fn is_segment(&self) -> bool {
        self.typ == tlv::SEGMENT_NAME_COMPONENT && self.to_number().is_ok()
    }

    fn from_element(element: Element) -> Result<Self, Error> {
        match element.typ {
            tlv::IMPLICIT_SHA256_DIGEST_COMPONENT | tlv::PARAMETERS_SHA256_DIGEST_COMPONENT
                if element.value.len() != 32 =>
            {
                Err(Error::InvalidData(
                    "Component",
                    format!("digest component of {} bytes", element.value.len()),
                ))
            }
            typ if typ > u16::MAX as u64 => Err(Error::InvalidData(
                "Component",
                format!("type {typ} out of range"),
            )),
            _ => Ok(Self::new(element.typ, element.value)),
        }
    }
}

impl Ord for Component {
    /// Canonical order: by type, then by value length, then by value bytes.
    fn cmp(&self, other: &Self) -> Ordering {
        self.typ
            .cmp(&other.typ)
            .then_with(|| self.value.len().cmp(&other.value.len()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Write for Component {
    fn write(&self, buf: &mut impl BufMut) {
        tlv::write_bytes_element(self.typ, &self.value, buf);
    }
}

impl EncodeSize for Component {
    fn encode_size(&self) -> usize {
        element_size(self.typ, self.value.len())
    }
}

impl Read for Component {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self::from_element(Element::read(buf)?)?)
    }
}

fn escape(value: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.iter().all(|b| *b == b'.') {
        // "", ".", and ".." are reserved, so periods-only values gain three more
        write!(f, "...")?;
    }
    for byte in value {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                write!(f, "{}", *byte as char)?
            }
            _ => write!(f, "%{byte:02X}")?,
        }
    }
    Ok(())
}

fn unescape(value: &str) -> Result<Vec<u8>, Error> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value
                .get(i + 1..i + 3)
                .ok_or_else(|| Error::InvalidUri(value.to_string()))?;
            let byte =
                u8::from_str_radix(hex, 16).map_err(|_| Error::InvalidUri(value.to_string()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    if out.iter().all(|b| *b == b'.') {
        if out.len() < 3 {
            return Err(Error::InvalidUri(value.to_string()));
        }
        out.truncate(out.len() - 3);
    }
    Ok(out)
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.typ {
            tlv::GENERIC_NAME_COMPONENT => return escape(&self.value, f),
            tlv::VERSION_NAME_COMPONENT => "v",
            tlv::SEGMENT_NAME_COMPONENT => "seg",
            tlv::TIMESTAMP_NAME_COMPONENT => "t",
            tlv::SEQUENCE_NUM_NAME_COMPONENT => "seq",
            typ => {
                write!(f, "{typ}=")?;
                return escape(&self.value, f);
            }
        };
        match self.to_number() {
            Ok(number) => write!(f, "{prefix}={number}"),
            Err(_) => {
                write!(f, "{}=", self.typ)?;
                escape(&self.value, f)
            }
        }
    }
}

impl FromStr for Component {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((prefix, rest)) = s.split_once('=') else {
            return Ok(Self::generic(unescape(s)?));
        };
        let number = || {
            rest.parse::<u64>()
                .map_err(|_| Error::InvalidUri(s.to_string()))
        };
        match prefix {
            "v" => Ok(Self::version(number()?)),
            "seg" => Ok(Self::segment(number()?)),
            "t" => Ok(Self::timestamp(number()?)),
            "seq" => Ok(Self::sequence_number(number()?)),
            typ => match typ.parse::<u64>() {
                Ok(typ) if (1..=u16::MAX as u64).contains(&typ) => {
                    Ok(Self::new(typ, unescape(rest)?))
                }
                // '=' is also a legal character in a generic component
                _ => Ok(Self::generic(unescape(s)?)),
            },
        }
    }
}

/// A hierarchical name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// Returns an empty name (`/`).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn last(&self) -> Option<&Component> {
        self.components.last()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn push(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Appends a component, returning the extended name.
    pub fn append(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn append_generic(self, value: impl Into<Bytes>) -> Self {
        self.append(Component::generic(value))
    }

    pub fn append_number(self, value: u64) -> Self {
        self.append(Component::number(value))
    }

    pub fn append_version(self, value: u64) -> Self {
        self.append(Component::version(value))
    }

    pub fn append_segment(self, value: u64) -> Self {
        self.append(Component::segment(value))
    }

    pub fn append_keyword(self, value: impl Into<Bytes>) -> Self {
        self.append(Component::keyword(value))
    }

    /// Appends every component of `suffix`.
    pub fn concat(mut self, suffix: &Name) -> Self {
        self.components.extend(suffix.components.iter().cloned());
        self
    }

    /// Returns the first `len` components (or the whole name if it is shorter).
    pub fn prefix(&self, len: usize) -> Name {
        Self {
            components: self.components.iter().take(len).cloned().collect(),
        }
    }

    /// Returns true if `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len() && self.components[..] == other.components[..self.len()]
    }

    /// Size of the encoded components (the value of the Name element).
    pub fn value_size(&self) -> usize {
        self.components.iter().map(EncodeSize::encode_size).sum()
    }
}

impl Write for Name {
    fn write(&self, buf: &mut impl BufMut) {
        write_header(tlv::NAME, self.value_size(), buf);
        for component in &self.components {
            component.write(buf);
        }
    }
}

impl EncodeSize for Name {
    fn encode_size(&self) -> usize {
        element_size(tlv::NAME, self.value_size())
    }
}

impl Read for Name {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let element = tlv::read_expected(buf, tlv::NAME)?;
        Ok(Self::try_from(element)?)
    }
}

impl TryFrom<Element> for Name {
    type Error = Error;

    fn try_from(element: Element) -> Result<Self, Self::Error> {
        element.expect_type(tlv::NAME)?;
        let mut value = element.value;
        let mut components = Vec::new();
        while value.has_remaining() {
            at_least(&mut value, 2)?;
            components.push(Component::read(&mut value)?);
        }
        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uri = s.trim();
        let uri = uri.strip_prefix("ndn:").unwrap_or(uri);
        let uri = uri.strip_prefix('/').unwrap_or(uri);
        let mut name = Name::new();
        for part in uri.split('/') {
            if part.is_empty() {
                continue;
            }
            name.push(part.parse()?);
        }
        Ok(name)
    }
}

impl FromIterator<Component> for Name {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self::from_components(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt as _, Encode as _};

    #[test]
    fn test_parse_and_display() {
        let name: Name = "/localhost/nfd/fib/add-nexthop".parse().unwrap();
        assert_eq!(name.len(), 4);
        assert_eq!(name.get(1).unwrap().value().as_ref(), b"nfd");
        assert_eq!(name.to_string(), "/localhost/nfd/fib/add-nexthop");

        let name: Name = "ndn:/a%20b/v=3/seg=0/32=PA".parse().unwrap();
        assert_eq!(name.get(0).unwrap().value().as_ref(), b"a b");
        assert!(name.get(1).unwrap().is_version());
        assert_eq!(name.get(2).unwrap().to_number().unwrap(), 0);
        assert_eq!(name.get(3).unwrap().typ(), tlv::KEYWORD_NAME_COMPONENT);
        assert_eq!(name.to_string(), "/a%20b/v=3/seg=0/32=PA");

        assert_eq!(Name::new().to_string(), "/");
        assert_eq!("/".parse::<Name>().unwrap(), Name::new());
    }

    #[test]
    fn test_periods() {
        let name = Name::new().append_generic(&b".."[..]);
        assert_eq!(name.to_string(), "/.....");
        assert_eq!(name.to_string().parse::<Name>().unwrap(), name);
        assert!("/..".parse::<Name>().is_err());
    }

    #[test]
    fn test_invalid_escape() {
        assert!(matches!(
            "/a%2".parse::<Name>(),
            Err(Error::InvalidUri(_))
        ));
        assert!(matches!("/v=x".parse::<Name>(), Err(Error::InvalidUri(_))));
    }

    #[test]
    fn test_wire() {
        let name: Name = "/localhost/nfd".parse().unwrap();
        let encoded = name.encode();
        assert_eq!(
            &encoded[..],
            &[
                0x07, 0x10, 0x08, 0x09, b'l', b'o', b'c', b'a', b'l', b'h', b'o', b's', b't', 0x08,
                0x03, b'n', b'f', b'd'
            ]
        );
        assert_eq!(Name::decode(encoded.freeze()).unwrap(), name);
    }

    #[test]
    fn test_prefix() {
        let name: Name = "/a/b/c".parse().unwrap();
        let prefix = name.prefix(2);
        assert_eq!(prefix.to_string(), "/a/b");
        assert!(prefix.is_prefix_of(&name));
        assert!(name.is_prefix_of(&name));
        assert!(!name.is_prefix_of(&prefix));
        assert!(Name::new().is_prefix_of(&name));
        assert_eq!(name.prefix(10), name);
    }

    #[test]
    fn test_canonical_order() {
        let a: Name = "/a".parse().unwrap();
        let b: Name = "/b".parse().unwrap();
        let aa: Name = "/aa".parse().unwrap();
        let a_b: Name = "/a/b".parse().unwrap();
        let v: Name = "/v=1".parse().unwrap();
        assert!(a < b);
        assert!(b < aa); // shorter values sort first
        assert!(a < a_b);
        assert!(aa < v); // generic sorts before version
    }

    #[test]
    fn test_digest_component_length() {
        let encoded = [0x07, 0x03, 0x01, 0x01, 0x00];
        let err = Name::decode(&encoded[..]).unwrap_err();
        assert!(matches!(Error::from(err), Error::InvalidData("Component", _)));
    }
}
