//! Authorization of signed control commands.

use crate::{Authorization, RejectReply};
use mgmt_packet::{ControlParameters, Interest, Name};
use mgmt_security::{identity_of, CommandSignature, PublicKey};
use std::rc::Rc;
use tracing::debug;

/// Source of authorization decisions.
pub trait Privileges {
    /// Returns true if `identity` may use the commands of `privilege`.
    fn is_granted(&self, identity: &Name, privilege: &str) -> bool;

    /// Returns the key used to verify signatures made by `key_name`, if it is known.
    fn verification_key(&self, key_name: &Name) -> Option<PublicKey>;
}

/// Authorizes commands by verifying their signature and consulting [Privileges].
pub struct CommandAuthenticator<P: Privileges> {
    privileges: Rc<P>,
}

impl<P: Privileges> Clone for CommandAuthenticator<P> {
    fn clone(&self) -> Self {
        Self {
            privileges: self.privileges.clone(),
        }
    }
}

impl<P: Privileges + 'static> CommandAuthenticator<P> {
    pub fn new(privileges: P) -> Self {
        Self {
            privileges: Rc::new(privileges),
        }
    }

    /// Returns an [Authorization] for the commands of `module`.
    pub fn authorization(&self, module: &str) -> Authorization {
        let authenticator = self.clone();
        let module = module.to_string();
        Rc::new(
            move |_: &Name, interest: &Interest, _: Option<&ControlParameters>| {
                authenticator.authorize(&module, interest)
            },
        )
    }

    fn authorize(&self, module: &str, interest: &Interest) -> Result<String, RejectReply> {
        let name = interest.name();
        let signature = CommandSignature::parse(name).map_err(|err| {
            debug!(%name, ?err, "bad signature info");
            RejectReply::Silent
        })?;
        let key_name = signature.key_locator().map_err(|_| {
            debug!(%name, "missing key locator");
            RejectReply::Silent
        })?;
        let Some(identity) = identity_of(key_name) else {
            debug!(%name, %key_name, "bad key name");
            return Err(RejectReply::Silent);
        };

        let Some(key) = self.privileges.verification_key(key_name) else {
            debug!(%name, %key_name, "unknown key");
            return Err(RejectReply::Status403);
        };
        if !signature.verify(&key).unwrap_or(false) {
            debug!(%name, %key_name, "bad signature");
            return Err(RejectReply::Status403);
        }
        if !self.privileges.is_granted(&identity, module) {
            debug!(%name, %identity, module, "not authorized");
            return Err(RejectReply::Status403);
        }
        Ok(identity.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgmt_security::{Certificate, InterestSigner, KeyChain, SignedInterestFormat};
    use std::{collections::BTreeSet, time::UNIX_EPOCH};

    struct Static {
        certificate: Certificate,
        granted: BTreeSet<String>,
    }

    impl Privileges for Static {
        fn is_granted(&self, identity: &Name, privilege: &str) -> bool {
            identity == &self.certificate.identity() && self.granted.contains(privilege)
        }

        fn verification_key(&self, key_name: &Name) -> Option<PublicKey> {
            (key_name == self.certificate.key_name()).then(|| *self.certificate.public_key())
        }
    }

    fn setup(granted: &[&str]) -> (KeyChain, Authorization, Authorization) {
        let mut keychain = KeyChain::new(0);
        let certificate = keychain.create_identity("/operator".parse().unwrap());
        let authenticator = CommandAuthenticator::new(Static {
            certificate,
            granted: granted.iter().map(|s| s.to_string()).collect(),
        });
        (
            keychain,
            authenticator.authorization("faces"),
            authenticator.authorization("rib"),
        )
    }

    fn signed(keychain: &KeyChain, identity: &str) -> Interest {
        InterestSigner::new(0)
            .make_command_interest(
                keychain,
                "/localhost/nfd/faces/create".parse().unwrap(),
                &identity.parse().unwrap(),
                SignedInterestFormat::V03,
                UNIX_EPOCH,
            )
            .unwrap()
    }

    #[test]
    fn test_granted() {
        let (keychain, faces, rib) = setup(&["faces"]);
        let prefix: Name = "/localhost/nfd/faces/create".parse().unwrap();
        let interest = signed(&keychain, "/operator");
        assert_eq!(faces(&prefix, &interest, None), Ok("/operator".to_string()));
        assert_eq!(rib(&prefix, &interest, None), Err(RejectReply::Status403));
    }

    #[test]
    fn test_unknown_key() {
        let (mut keychain, faces, _) = setup(&["faces"]);
        keychain.create_identity("/intruder".parse().unwrap());
        let prefix = Name::new();
        let interest = signed(&keychain, "/intruder");
        assert_eq!(faces(&prefix, &interest, None), Err(RejectReply::Status403));
    }

    #[test]
    fn test_unsigned() {
        let (_, faces, _) = setup(&["faces"]);
        let interest = Interest::new("/localhost/nfd/faces/create".parse().unwrap());
        assert_eq!(
            faces(&Name::new(), &interest, None),
            Err(RejectReply::Silent)
        );
    }

    #[test]
    fn test_forged() {
        let (keychain, faces, _) = setup(&["faces"]);
        // Same identity, different key material
        let mut forger = KeyChain::new(99);
        forger.create_identity("/operator".parse().unwrap());
        let genuine = signed(&keychain, "/operator");
        let forged = signed(&forger, "/operator");
        assert!(faces(&Name::new(), &genuine, None).is_ok());
        assert_eq!(
            faces(&Name::new(), &forged, None),
            Err(RejectReply::Status403)
        );
    }
}
