//! Sign and verify management commands.
//!
//! A [KeyChain] derives one Ed25519 key per identity from a seed, an [InterestSigner] embeds
//! signatures into command interest names, and [CommandSignature] extracts and verifies them.
//!
//! # Example
//!
//! ```
//! use mgmt_security::{CommandSignature, InterestSigner, KeyChain, SignedInterestFormat};
//! use std::time::UNIX_EPOCH;
//!
//! let mut keychain = KeyChain::new(0);
//! let identity = "/operator".parse().unwrap();
//! let certificate = keychain.create_identity(identity);
//!
//! let mut signer = InterestSigner::new(0);
//! let interest = signer
//!     .make_command_interest(
//!         &keychain,
//!         "/localhost/nfd/faces/list".parse().unwrap(),
//!         &"/operator".parse().unwrap(),
//!         SignedInterestFormat::V03,
//!         UNIX_EPOCH,
//!     )
//!     .unwrap();
//!
//! let signature = CommandSignature::parse(interest.name()).unwrap();
//! assert!(signature.verify(certificate.public_key()).unwrap());
//! ```

use mgmt_packet::Name;
use thiserror::Error;

pub mod keychain;
pub mod signer;
pub mod validator;

pub use keychain::{identity_of, sign_data_digest, verify_data, Certificate, KeyChain, PublicKey};
pub use signer::{InterestSigner, SignedInterestFormat};
pub use validator::CommandSignature;

/// Errors that can occur when signing or verifying.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown identity: {0}")]
    UnknownIdentity(Name),
    #[error("missing signature")]
    MissingSignature,
    #[error("missing key locator")]
    MissingKeyLocator,
    #[error("unsupported signature type: {0}")]
    UnsupportedSignatureType(u64),
    #[error("codec error: {0}")]
    Codec(#[from] mgmt_packet::Error),
}

impl From<commonware_codec::Error> for Error {
    fn from(err: commonware_codec::Error) -> Self {
        Self::Codec(err.into())
    }
}
