//! Check captured responses against expectations.

use crate::Error;
use bytes::{Bytes, BytesMut};
use commonware_codec::DecodeExt as _;
use mgmt_packet::{tlv::Element, ControlParameters, ControlResponse, Data, Name};
use std::fmt;

/// Outcome of [check_response], in order of precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckResponseResult {
    Ok,
    OutOfBoundary,
    WrongName,
    WrongContentType,
    InvalidResponse,
    WrongCode,
    WrongText,
    WrongBodySize,
    WrongBodyValue,
}

impl fmt::Display for CheckResponseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "OK",
            Self::OutOfBoundary => "OUT_OF_BOUNDARY",
            Self::WrongName => "WRONG_NAME",
            Self::WrongContentType => "WRONG_CONTENT_TYPE",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::WrongCode => "WRONG_CODE",
            Self::WrongText => "WRONG_TEXT",
            Self::WrongBodySize => "WRONG_BODY_SIZE",
            Self::WrongBodyValue => "WRONG_BODY_VALUE",
        };
        f.write_str(s)
    }
}

/// Compares `responses[idx]` with the expected name, content type and [ControlResponse].
///
/// The first failing check determines the result: index, name, content type (skipped when
/// `expected_content_type` is `None`), decoding, code, text, body size and body value.
///
/// Bodies are compared by the value of their TLV element, so a missing body matches an empty
/// element (for example `ControlParameters` with no fields).
pub fn check_response(
    responses: &[Data],
    idx: usize,
    expected_name: &Name,
    expected: &ControlResponse,
    expected_content_type: Option<u64>,
) -> CheckResponseResult {
    let Some(data) = responses.get(idx) else {
        return CheckResponseResult::OutOfBoundary;
    };
    if data.name() != expected_name {
        return CheckResponseResult::WrongName;
    }
    if let Some(content_type) = expected_content_type {
        if data.content_type() != content_type {
            return CheckResponseResult::WrongContentType;
        }
    }
    let Ok(response) = ControlResponse::decode(data.content().clone()) else {
        return CheckResponseResult::InvalidResponse;
    };
    if response.code() != expected.code() {
        return CheckResponseResult::WrongCode;
    }
    if response.text() != expected.text() {
        return CheckResponseResult::WrongText;
    }
    let (actual_body, expected_body) = (body_value(&response), body_value(expected));
    if actual_body.len() != expected_body.len() {
        return CheckResponseResult::WrongBodySize;
    }
    if actual_body != expected_body {
        return CheckResponseResult::WrongBodyValue;
    }
    CheckResponseResult::Ok
}

/// Value of the body element, empty when there is no body. A body that is not a single TLV
/// element is compared as raw bytes.
fn body_value(response: &ControlResponse) -> Bytes {
    match response.body() {
        None => Bytes::new(),
        Some(body) => Element::decode(body.clone()).map_or_else(|_| body.clone(), |e| e.value),
    }
}

/// Concatenates the content of `count` responses starting at `start`.
///
/// A `count` of zero takes every response from `start`; a `count` running past the end is
/// clamped.
pub fn concatenate_responses(
    responses: &[Data],
    start: usize,
    count: usize,
) -> Result<Bytes, Error> {
    let len = responses.len();
    if start > len {
        return Err(Error::OutOfRange { start, len });
    }
    let end = match count {
        0 => len,
        count => start.saturating_add(count).min(len),
    };
    let range = &responses[start..end];
    let mut buf = BytesMut::with_capacity(range.iter().map(|data| data.content().len()).sum());
    for data in range {
        buf.extend_from_slice(data.content());
    }
    Ok(buf.freeze())
}

/// Builds a response whose body is `parameters`.
pub fn make_response(code: u32, text: &str, parameters: &ControlParameters) -> ControlResponse {
    ControlResponse::new(code, text).with_body(parameters)
}

/// A class of expected command outcomes, for tests generic over success and failure.
pub trait ExpectedResponse {
    fn expected() -> ControlResponse;

    /// Whether the status text is part of the expectation.
    fn checks_text() -> bool {
        true
    }
}

/// A successful command: `200 "OK"`.
pub struct CommandSuccess;

impl ExpectedResponse for CommandSuccess {
    fn expected() -> ControlResponse {
        ControlResponse::new(200, "OK")
    }
}

/// A command failing with `CODE`. The error description is not checked.
pub struct CommandFailure<const CODE: u32>;

impl<const CODE: u32> ExpectedResponse for CommandFailure<CODE> {
    fn expected() -> ControlResponse {
        ControlResponse::new(CODE, "")
    }

    fn checks_text() -> bool {
        false
    }
}

/// Checks the outcome class of `responses[idx]`: its name, code and (when `E` checks it) text.
/// The body is ignored.
pub fn check_outcome<E: ExpectedResponse>(
    responses: &[Data],
    idx: usize,
    expected_name: &Name,
) -> CheckResponseResult {
    let mut expected = E::expected();
    if let Some(actual) = responses
        .get(idx)
        .and_then(|data| ControlResponse::decode(data.content().clone()).ok())
    {
        if !E::checks_text() {
            expected = expected.with_text(actual.text());
        }
        if let Some(body) = actual.body() {
            expected = expected.with_raw_body(body.clone());
        }
    }
    check_response(responses, idx, expected_name, &expected, None)
}
