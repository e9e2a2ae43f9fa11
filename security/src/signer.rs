//! Command interest signing.
//!
//! A signed command interest carries its signature inside the name. Two layouts exist:
//!
//! - [SignedInterestFormat::V02]: `<command>/<timestamp>/<nonce>/<SignatureInfo>/<SignatureValue>`
//! - [SignedInterestFormat::V03]: `<command>/<InterestSignatureInfo>/<InterestSignatureValue>`,
//!   where the signature info carries the nonce and timestamp itself.
//!
//! In both layouts the signature covers every name component except the signature value.

use crate::{validator::signed_portion, Error, KeyChain};
use bytes::Bytes;
use mgmt_packet::{
    interest::NONCE_LENGTH as INTEREST_NONCE_LENGTH, signature_type, tlv, Interest, Name,
    SignatureInfo,
};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Length of the nonce placed in a signed command.
pub const NONCE_LENGTH: usize = 8;

/// Layout of a signed command interest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SignedInterestFormat {
    V02,
    #[default]
    V03,
}

/// Produces signed command interests.
///
/// Timestamps are strictly increasing across calls, even when the clock does not advance.
pub struct InterestSigner {
    rng: StdRng,
    last_timestamp: Option<u64>,
}

impl InterestSigner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            last_timestamp: None,
        }
    }

    fn next_timestamp(&mut self, now: SystemTime) -> u64 {
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        let timestamp = match self.last_timestamp {
            Some(last) if millis <= last => last.saturating_add(1),
            _ => millis,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }

    /// Appends the signature components for `format` to `name` and signs them with the key
    /// of `identity`.
    pub fn make_command_interest(
        &mut self,
        keychain: &KeyChain,
        name: Name,
        identity: &Name,
        format: SignedInterestFormat,
        now: SystemTime,
    ) -> Result<Interest, Error> {
        let key_name = keychain.certificate(identity)?.key_name().clone();
        let timestamp = self.next_timestamp(now);
        let mut nonce = [0u8; NONCE_LENGTH];
        self.rng.fill_bytes(&mut nonce);

        let name = match format {
            SignedInterestFormat::V02 => {
                let info = SignatureInfo::new(signature_type::ED25519).with_key_locator(key_name);
                let name = name
                    .append_number(timestamp)
                    .append_generic(Bytes::copy_from_slice(&nonce))
                    .append_generic(info.encode_tlv(tlv::SIGNATURE_INFO));
                let value = keychain.sign(identity, &signed_portion(&name))?;
                name.append_generic(tlv::Element::new(tlv::SIGNATURE_VALUE, value).to_wire())
            }
            SignedInterestFormat::V03 => {
                let info = SignatureInfo::new(signature_type::ED25519)
                    .with_key_locator(key_name)
                    .with_nonce(Bytes::copy_from_slice(&nonce))
                    .with_time(timestamp);
                let name = name.append_generic(info.encode_tlv(tlv::INTEREST_SIGNATURE_INFO));
                let value = keychain.sign(identity, &signed_portion(&name))?;
                name.append_generic(
                    tlv::Element::new(tlv::INTEREST_SIGNATURE_VALUE, value).to_wire(),
                )
            }
        };
        debug!(%identity, ?format, timestamp, "signed command");

        let mut interest_nonce = [0u8; INTEREST_NONCE_LENGTH];
        self.rng.fill_bytes(&mut interest_nonce);
        Ok(Interest::new(name).with_nonce(interest_nonce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandSignature;
    use std::time::Duration;
    use test_case::test_case;

    fn setup() -> (KeyChain, Name) {
        let mut keychain = KeyChain::new(0);
        let identity: Name = "/operator".parse().unwrap();
        keychain.create_identity(identity.clone());
        (keychain, identity)
    }

    #[test]
    fn test_v02_layout() {
        let (keychain, identity) = setup();
        let mut signer = InterestSigner::new(0);
        let now = UNIX_EPOCH + Duration::from_secs(100);
        let command: Name = "/localhost/nfd/faces/create".parse().unwrap();
        let interest = signer
            .make_command_interest(
                &keychain,
                command.clone(),
                &identity,
                SignedInterestFormat::V02,
                now,
            )
            .unwrap();
        let name = interest.name();
        assert_eq!(name.len(), command.len() + 4);
        assert!(command.is_prefix_of(name));
        assert_eq!(name.get(command.len()).unwrap().to_number().unwrap(), 100_000);
        assert_eq!(name.get(command.len() + 1).unwrap().value().len(), NONCE_LENGTH);
        assert!(interest.nonce().is_some());
    }

    #[test]
    fn test_v03_layout() {
        let (keychain, identity) = setup();
        let mut signer = InterestSigner::new(0);
        let command: Name = "/localhost/nfd/faces/create".parse().unwrap();
        let interest = signer
            .make_command_interest(
                &keychain,
                command.clone(),
                &identity,
                SignedInterestFormat::V03,
                UNIX_EPOCH,
            )
            .unwrap();
        assert_eq!(interest.name().len(), command.len() + 2);
        let signature = CommandSignature::parse(interest.name()).unwrap();
        assert_eq!(signature.format(), SignedInterestFormat::V03);
        assert_eq!(signature.info().nonce().map(Bytes::len), Some(NONCE_LENGTH));
    }

    #[test_case(SignedInterestFormat::V02; "v02")]
    #[test_case(SignedInterestFormat::V03; "v03")]
    fn test_timestamps_increase(format: SignedInterestFormat) {
        let (keychain, identity) = setup();
        let mut signer = InterestSigner::new(0);
        let now = UNIX_EPOCH + Duration::from_secs(5);
        let mut timestamps = Vec::new();
        for _ in 0..3 {
            let interest = signer
                .make_command_interest(&keychain, "/cmd".parse().unwrap(), &identity, format, now)
                .unwrap();
            let name = interest.name();
            let timestamp = match format {
                // Timestamp, nonce, signature info, signature value
                SignedInterestFormat::V02 => {
                    name.get(name.len() - 4).unwrap().to_number().unwrap()
                }
                SignedInterestFormat::V03 => CommandSignature::parse(name).unwrap().timestamp(),
            };
            timestamps.push(timestamp);
        }
        assert_eq!(timestamps, [5_000, 5_001, 5_002]);
    }

    #[test]
    fn test_unknown_identity() {
        let (keychain, _) = setup();
        let mut signer = InterestSigner::new(0);
        let result = signer.make_command_interest(
            &keychain,
            "/cmd".parse().unwrap(),
            &"/stranger".parse().unwrap(),
            SignedInterestFormat::V02,
            UNIX_EPOCH,
        );
        assert!(matches!(result, Err(Error::UnknownIdentity(_))));
    }

    #[test]
    fn test_deterministic() {
        let (keychain, identity) = setup();
        let make = || {
            InterestSigner::new(42)
                .make_command_interest(
                    &keychain,
                    "/cmd".parse().unwrap(),
                    &identity,
                    SignedInterestFormat::V03,
                    UNIX_EPOCH,
                )
                .unwrap()
        };
        assert_eq!(make(), make());
    }
}
