//! Control responses: the status record returned for a management command.

use crate::{
    tlv::{self, element_size, nni_element_size, write_header, write_nni_element, Element},
    Error,
};
use bytes::{Buf, BufMut, Bytes};
use commonware_codec::{Encode, EncodeSize, Error as CodecError, Read, Write};

/// Status of a control command, optionally carrying a body element.
///
/// The body is stored as the complete wire encoding of a single TLV element (typically the
/// [crate::ControlParameters] the operation echoes back).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlResponse {
    code: u32,
    text: String,
    body: Option<Bytes>,
}

impl ControlResponse {
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            body: None,
        }
    }

    /// Sets the body to the wire encoding of `value`.
    pub fn with_body(mut self, value: &impl Encode) -> Self {
        self.body = Some(value.encode().freeze());
        self
    }

    /// Sets the body to an already encoded element.
    pub fn with_raw_body(mut self, wire: Bytes) -> Self {
        self.body = Some(wire);
        self
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the body bytes, empty when there is no body.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    fn value_size(&self) -> usize {
        nni_element_size(tlv::STATUS_CODE, self.code as u64)
            + element_size(tlv::STATUS_TEXT, self.text.len())
            + self.body.as_ref().map_or(0, Bytes::len)
    }
}

impl Write for ControlResponse {
    fn write(&self, buf: &mut impl BufMut) {
        write_header(tlv::CONTROL_RESPONSE, self.value_size(), buf);
        write_nni_element(tlv::STATUS_CODE, self.code as u64, buf);
        tlv::write_bytes_element(tlv::STATUS_TEXT, self.text.as_bytes(), buf);
        if let Some(body) = &self.body {
            buf.put_slice(body);
        }
    }
}

impl EncodeSize for ControlResponse {
    fn encode_size(&self) -> usize {
        element_size(tlv::CONTROL_RESPONSE, self.value_size())
    }
}

impl Read for ControlResponse {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self::try_from(tlv::read_expected(buf, tlv::CONTROL_RESPONSE)?)?)
    }
}

impl TryFrom<Element> for ControlResponse {
    type Error = Error;

    fn try_from(element: Element) -> Result<Self, Self::Error> {
        element.expect_type(tlv::CONTROL_RESPONSE)?;
        let mut children = element.children()?.into_iter();

        let code = children
            .next()
            .ok_or(Error::MissingElement(tlv::STATUS_CODE))?
            .expect_type(tlv::STATUS_CODE)?
            .as_nni()?;
        let code = u32::try_from(code)
            .map_err(|_| Error::InvalidData("StatusCode", format!("{code} exceeds u32")))?;
        let text = children
            .next()
            .ok_or(Error::MissingElement(tlv::STATUS_TEXT))?
            .expect_type(tlv::STATUS_TEXT)?
            .as_string("StatusText")?;
        // Anything following the status text is the body; only the first element is kept
        let body = children.next().as_ref().map(Element::to_wire);
        Ok(Self { code, text, body })
    }
}
