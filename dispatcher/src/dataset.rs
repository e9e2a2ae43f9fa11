//! Status dataset production.

use bytes::{BufMut, Bytes, BytesMut};
use commonware_codec::Write;
use mgmt_packet::ControlResponse;

/// Collects the content of a status dataset, or the reason it cannot be produced.
#[derive(Debug, Default)]
pub struct StatusDatasetContext {
    content: BytesMut,
    rejection: Option<ControlResponse>,
}

impl StatusDatasetContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the encoding of `block` to the dataset.
    pub fn append(&mut self, block: &impl Write) {
        block.write(&mut self.content);
    }

    /// Appends already encoded bytes to the dataset.
    pub fn append_raw(&mut self, bytes: &[u8]) {
        self.content.put_slice(bytes);
    }

    /// Abandons the dataset, replying with `response` instead.
    pub fn reject(&mut self, response: ControlResponse) {
        self.rejection = Some(response);
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub(crate) fn finish(self) -> Result<Bytes, ControlResponse> {
        match self.rejection {
            Some(response) => Err(response),
            None => Ok(self.content.freeze()),
        }
    }
}
