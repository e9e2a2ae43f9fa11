//! Data packets.

use crate::{
    tlv::{self, element_size, nni_element_size, write_header, write_nni_element, Element},
    Component, Error, Name, SignatureInfo,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt as _, Write};
use std::time::Duration;

/// Content types.
pub mod content_type {
    pub const BLOB: u64 = 0;
    pub const LINK: u64 = 1;
    pub const KEY: u64 = 2;
    pub const NACK: u64 = 3;
    pub const PREFIX_ANN: u64 = 5;
}

/// Metadata describing the content of a [Data] packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaInfo {
    pub content_type: u64,
    /// In milliseconds.
    pub freshness: Option<u64>,
    pub final_block_id: Option<Component>,
}

impl MetaInfo {
    fn value_size(&self) -> usize {
        let mut size = 0;
        if self.content_type != content_type::BLOB {
            size += nni_element_size(tlv::CONTENT_TYPE, self.content_type);
        }
        if let Some(freshness) = self.freshness {
            size += nni_element_size(tlv::FRESHNESS_PERIOD, freshness);
        }
        if let Some(id) = &self.final_block_id {
            size += element_size(tlv::FINAL_BLOCK_ID, id.encode_size());
        }
        size
    }

    fn from_element(element: &Element) -> Result<Self, Error> {
        let mut content_type = None;
        let mut freshness = None;
        let mut final_block_id = None;
        for child in element.children()? {
            match child.typ {
                tlv::CONTENT_TYPE => tlv::set_once(&mut content_type, child.typ, child.as_nni()?)?,
                tlv::FRESHNESS_PERIOD => tlv::set_once(&mut freshness, child.typ, child.as_nni()?)?,
                tlv::FINAL_BLOCK_ID => {
                    let mut value = child.value.clone();
                    let id = Component::read(&mut value)?;
                    tlv::set_once(&mut final_block_id, child.typ, id)?;
                }
                _ => {}
            }
        }
        Ok(Self {
            content_type: content_type.unwrap_or(content_type::BLOB),
            freshness,
            final_block_id,
        })
    }
}

impl Write for MetaInfo {
    fn write(&self, buf: &mut impl BufMut) {
        write_header(tlv::META_INFO, self.value_size(), buf);
        if self.content_type != content_type::BLOB {
            write_nni_element(tlv::CONTENT_TYPE, self.content_type, buf);
        }
        if let Some(freshness) = self.freshness {
            write_nni_element(tlv::FRESHNESS_PERIOD, freshness, buf);
        }
        if let Some(id) = &self.final_block_id {
            write_header(tlv::FINAL_BLOCK_ID, id.encode_size(), buf);
            id.write(buf);
        }
    }
}

impl EncodeSize for MetaInfo {
    fn encode_size(&self) -> usize {
        element_size(tlv::META_INFO, self.value_size())
    }
}

/// A named, signed piece of content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Data {
    name: Name,
    meta: MetaInfo,
    content: Bytes,
    signature_info: Option<SignatureInfo>,
    signature_value: Bytes,
}

impl Data {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            meta: MetaInfo::default(),
            content: Bytes::new(),
            signature_info: None,
            signature_value: Bytes::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_content_type(mut self, content_type: u64) -> Self {
        self.meta.content_type = content_type;
        self
    }

    /// Sets the freshness period in milliseconds.
    pub fn with_freshness(mut self, millis: u64) -> Self {
        self.meta.freshness = Some(millis);
        self
    }

    pub fn with_final_block_id(mut self, id: Component) -> Self {
        self.meta.final_block_id = Some(id);
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn meta_info(&self) -> &MetaInfo {
        &self.meta
    }

    pub fn content_type(&self) -> u64 {
        self.meta.content_type
    }

    pub fn freshness(&self) -> Option<Duration> {
        self.meta.freshness.map(Duration::from_millis)
    }

    pub fn final_block_id(&self) -> Option<&Component> {
        self.meta.final_block_id.as_ref()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn signature_info(&self) -> Option<&SignatureInfo> {
        self.signature_info.as_ref()
    }

    pub fn signature_value(&self) -> &Bytes {
        &self.signature_value
    }

    /// Attaches a signature. `info` must be the same value that was passed to
    /// [Data::signed_portion] when the signature was computed.
    pub fn set_signature(&mut self, info: SignatureInfo, value: impl Into<Bytes>) {
        self.signature_info = Some(info);
        self.signature_value = value.into();
    }

    fn unsigned_size(&self) -> usize {
        self.name.encode_size()
            + self.meta.encode_size()
            + element_size(tlv::CONTENT, self.content.len())
    }

    fn write_unsigned(&self, buf: &mut impl BufMut) {
        self.name.write(buf);
        self.meta.write(buf);
        tlv::write_bytes_element(tlv::CONTENT, &self.content, buf);
    }

    /// Returns the bytes covered by a signature described by `info`: the encoded name, meta
    /// info, content, and signature info.
    pub fn signed_portion(&self, info: &SignatureInfo) -> Bytes {
        let size = self.unsigned_size() + info.tlv_size(tlv::SIGNATURE_INFO);
        let mut buf = BytesMut::with_capacity(size);
        self.write_unsigned(&mut buf);
        info.write_tlv(tlv::SIGNATURE_INFO, &mut buf);
        buf.freeze()
    }

    fn value_size(&self) -> usize {
        let mut size = self.unsigned_size();
        if let Some(info) = &self.signature_info {
            size += info.tlv_size(tlv::SIGNATURE_INFO);
            size += element_size(tlv::SIGNATURE_VALUE, self.signature_value.len());
        }
        size
    }
}

impl Write for Data {
    fn write(&self, buf: &mut impl BufMut) {
        write_header(tlv::DATA, self.value_size(), buf);
        self.write_unsigned(buf);
        if let Some(info) = &self.signature_info {
            info.write_tlv(tlv::SIGNATURE_INFO, buf);
            tlv::write_bytes_element(tlv::SIGNATURE_VALUE, &self.signature_value, buf);
        }
    }
}

impl EncodeSize for Data {
    fn encode_size(&self) -> usize {
        element_size(tlv::DATA, self.value_size())
    }
}

impl Read for Data {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self::try_from(tlv::read_expected(buf, tlv::DATA)?)?)
    }
}

impl TryFrom<Element> for Data {
    type Error = Error;

    fn try_from(element: Element) -> Result<Self, Self::Error> {
        element.expect_type(tlv::DATA)?;
        let mut children = element.children()?.into_iter().peekable();

        let name = children
            .next()
            .ok_or(Error::MissingElement(tlv::NAME))
            .and_then(Name::try_from)?;
        let mut data = Data::new(name);
        if let Some(child) = children.next_if(|c| c.typ == tlv::META_INFO) {
            data.meta = MetaInfo::from_element(&child)?;
        }
        if let Some(child) = children.next_if(|c| c.typ == tlv::CONTENT) {
            data.content = child.value;
        }
        if let Some(child) = children.next_if(|c| c.typ == tlv::SIGNATURE_INFO) {
            let info = SignatureInfo::from_element(&child)?;
            let value = children
                .next_if(|c| c.typ == tlv::SIGNATURE_VALUE)
                .ok_or(Error::MissingElement(tlv::SIGNATURE_VALUE))?;
            data.set_signature(info, value.value);
        }
        if let Some(child) = children.next() {
            return Err(Error::InvalidData(
                "Data",
                format!("unexpected element {}", child.typ),
            ));
        }
        Ok(data)
    }
}
