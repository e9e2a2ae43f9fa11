//! Error types for TLV operations

use commonware_codec::Error as CodecError;
use thiserror::Error;

/// Context attached to [Error]s carried inside a [CodecError].
const CONTEXT: &str = "ndn-tlv";

/// Error type for TLV operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(CodecError),
    #[error("unexpected TLV type: expected {expected}, found {found}")]
    UnexpectedType { expected: u64, found: u64 },
    #[error("missing TLV element: {0}")]
    MissingElement(u64),
    #[error("duplicate TLV element: {0}")]
    DuplicateElement(u64),
    #[error("invalid var-number")]
    InvalidVarNumber,
    #[error("invalid non-negative integer length: {0}")]
    InvalidNonNegativeInteger(usize),
    #[error("invalid data in {0}: {1}")]
    InvalidData(&'static str, String), // context, message
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
    #[error("invalid name URI: {0}")]
    InvalidUri(String),
}

impl From<Error> for CodecError {
    fn from(err: Error) -> Self {
        match err {
            Error::Codec(err) => err,
            err => CodecError::Wrapped(CONTEXT, Box::new(err)),
        }
    }
}

impl From<CodecError> for Error {
    /// Recovers an [Error] that was wrapped on its way through a [commonware_codec::Read] impl.
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Wrapped(context, inner) => match inner.downcast::<Error>() {
                Ok(err) => *err,
                Err(inner) => Error::Codec(CodecError::Wrapped(context, inner)),
            },
            err => Error::Codec(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_and_recover() {
        let wrapped = CodecError::from(Error::MissingElement(7));
        assert!(matches!(wrapped, CodecError::Wrapped(CONTEXT, _)));
        assert!(matches!(Error::from(wrapped), Error::MissingElement(7)));

        let plain = CodecError::from(Error::Codec(CodecError::EndOfBuffer));
        assert!(matches!(plain, CodecError::EndOfBuffer));
        assert!(matches!(
            Error::from(CodecError::ExtraData(2)),
            Error::Codec(CodecError::ExtraData(2))
        ));
    }
}
