//! Deterministic keychain for test identities.
//!
//! Each identity owns one Ed25519 key derived from the keychain seed and the identity name, so
//! two keychains created with the same seed sign identically.

use crate::Error;
use bytes::Bytes;
use mgmt_packet::{
    signature_type, Component, Data, Name, PrefixAnnouncement, SignatureInfo,
};
use commonware_codec::Encode as _;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

/// Name component separating an identity from its key id.
pub const KEY_COMPONENT: &[u8] = b"KEY";

const PUBLIC_KEY_LENGTH: usize = 32;
const SIGNATURE_LENGTH: usize = 64;
const KEY_ID_LENGTH: usize = 8;

/// An Ed25519 verification key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Verify that `signature` is a valid signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let key = match ed25519_consensus::VerificationKey::try_from(self.0) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let signature: [u8; SIGNATURE_LENGTH] = match signature.try_into() {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let signature = ed25519_consensus::Signature::from(signature);
        key.verify(&signature, message).is_ok()
    }
}

impl From<[u8; PUBLIC_KEY_LENGTH]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }
}

/// The public half of an identity's key, named `<identity>/KEY/<key id>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    key_name: Name,
    public_key: PublicKey,
}

impl Certificate {
    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the identity owning this key.
    pub fn identity(&self) -> Name {
        identity_of(&self.key_name).unwrap_or_else(|| self.key_name.clone())
    }
}

/// Extracts the identity from a key name of the form `<identity>/KEY/<key id>`.
pub fn identity_of(key_name: &Name) -> Option<Name> {
    let index = key_name.len().checked_sub(2)?;
    if key_name.get(index)? != &Component::generic(KEY_COMPONENT) {
        return None;
    }
    Some(key_name.prefix(index))
}

struct Key {
    certificate: Certificate,
    signer: ed25519_consensus::SigningKey,
}

/// Holds one signing key per identity.
pub struct KeyChain {
    seed: u64,
    keys: BTreeMap<Name, Key>,
}

impl KeyChain {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            keys: BTreeMap::new(),
        }
    }

    /// Creates `identity` (if it does not exist yet) and returns its certificate.
    pub fn create_identity(&mut self, identity: Name) -> Certificate {
        if let Some(key) = self.keys.get(&identity) {
            return key.certificate.clone();
        }

        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_be_bytes());
        hasher.update(identity.encode());
        let secret: [u8; 32] = hasher.finalize().into();
        let signer = ed25519_consensus::SigningKey::from(secret);
        let public_key = PublicKey(signer.verification_key().to_bytes());

        let key_id = Sha256::digest(public_key.as_bytes());
        let key_name = identity
            .clone()
            .append_generic(KEY_COMPONENT)
            .append_generic(Bytes::copy_from_slice(&key_id[..KEY_ID_LENGTH]));
        let certificate = Certificate {
            key_name,
            public_key,
        };
        debug!(%identity, key = %certificate.key_name, "created identity");
        self.keys.insert(
            identity,
            Key {
                certificate: certificate.clone(),
                signer,
            },
        );
        certificate
    }

    /// Removes `identity`, returning whether it existed.
    pub fn delete_identity(&mut self, identity: &Name) -> bool {
        self.keys.remove(identity).is_some()
    }

    pub fn has_identity(&self, identity: &Name) -> bool {
        self.keys.contains_key(identity)
    }

    pub fn certificate(&self, identity: &Name) -> Result<&Certificate, Error> {
        self.key(identity).map(|key| &key.certificate)
    }

    fn key(&self, identity: &Name) -> Result<&Key, Error> {
        self.keys
            .get(identity)
            .ok_or_else(|| Error::UnknownIdentity(identity.clone()))
    }

    /// Signs `message` with the key of `identity`.
    pub fn sign(&self, identity: &Name, message: &[u8]) -> Result<Bytes, Error> {
        let key = self.key(identity)?;
        let signature = key.signer.sign(message);
        Ok(Bytes::copy_from_slice(&signature.to_bytes()))
    }

    /// Signs `data` with the key of `identity`.
    pub fn sign_data(&self, data: &mut Data, identity: &Name) -> Result<(), Error> {
        let key = self.key(identity)?;
        let info = SignatureInfo::new(signature_type::ED25519)
            .with_key_locator(key.certificate.key_name.clone());
        let signature = key.signer.sign(&data.signed_portion(&info));
        data.set_signature(info, Bytes::copy_from_slice(&signature.to_bytes()));
        Ok(())
    }

    /// Produces a signed copy of `announcement`.
    pub fn sign_announcement(
        &self,
        announcement: &PrefixAnnouncement,
        identity: &Name,
        version: u64,
    ) -> Result<PrefixAnnouncement, Error> {
        let mut data = announcement.to_data(version);
        self.sign_data(&mut data, identity)?;
        Ok(PrefixAnnouncement::try_from(data)?)
    }
}

/// Signs `data` with a plain SHA-256 digest.
pub fn sign_data_digest(data: &mut Data) {
    let info = SignatureInfo::new(signature_type::DIGEST_SHA256);
    let digest = Sha256::digest(data.signed_portion(&info));
    data.set_signature(info, Bytes::copy_from_slice(&digest));
}

/// Verifies the signature of `data`: a DigestSha256 signature is checked against the content,
/// an Ed25519 signature against `key`.
pub fn verify_data(data: &Data, key: Option<&PublicKey>) -> bool {
    let Some(info) = data.signature_info() else {
        return false;
    };
    let portion = data.signed_portion(info);
    match info.signature_type() {
        signature_type::DIGEST_SHA256 => Sha256::digest(&portion)[..] == data.signature_value()[..],
        signature_type::ED25519 => {
            key.is_some_and(|key| key.verify(&portion, data.signature_value()))
        }
        _ => false,
    }
}
