//! Build signed command requests.

use crate::Error;
use commonware_codec::Encode as _;
use mgmt_packet::{ControlParameters, Interest, Name, PrefixAnnouncement};
use mgmt_security::{InterestSigner, KeyChain, SignedInterestFormat};
use mgmt_sim::Scheduler;
use tracing::debug;

/// What a command carries after its name.
#[derive(Clone, Copy, Debug)]
pub enum Payload<'a> {
    Parameters(&'a ControlParameters),
    /// A signed prefix announcement.
    Announcement(&'a PrefixAnnouncement),
}

/// Produces signed command interests, timestamped by the logical clock.
pub struct CommandBuilder {
    keychain: KeyChain,
    signer: InterestSigner,
    scheduler: Scheduler,
}

impl CommandBuilder {
    pub fn new(seed: u64, scheduler: Scheduler) -> Self {
        Self {
            keychain: KeyChain::new(seed),
            signer: InterestSigner::new(seed),
            scheduler,
        }
    }

    pub fn keychain(&self) -> &KeyChain {
        &self.keychain
    }

    pub fn keychain_mut(&mut self) -> &mut KeyChain {
        &mut self.keychain
    }

    /// Appends `payload` to `name` and signs the result with `identity` in `format`.
    ///
    /// Prefix announcements are always signed in [SignedInterestFormat::V03].
    pub fn build(
        &mut self,
        name: Name,
        payload: Payload<'_>,
        format: SignedInterestFormat,
        identity: &Name,
    ) -> Result<Interest, Error> {
        let (component, format) = match payload {
            Payload::Parameters(parameters) => (parameters.encode().freeze(), format),
            Payload::Announcement(announcement) => {
                let data = announcement
                    .signed_data()
                    .ok_or(Error::UnsignedAnnouncement)?;
                if format != SignedInterestFormat::V03 {
                    debug!(?format, "prefix announcements require V03, overriding");
                }
                (data.encode().freeze(), SignedInterestFormat::V03)
            }
        };
        let name = name.append_generic(component);
        Ok(self.signer.make_command_interest(
            &self.keychain,
            name,
            identity,
            format,
            self.scheduler.now(),
        )?)
    }

    /// Builds a control command carrying `parameters`.
    pub fn build_command(
        &mut self,
        name: Name,
        parameters: &ControlParameters,
        format: SignedInterestFormat,
        identity: &Name,
    ) -> Result<Interest, Error> {
        self.build(name, Payload::Parameters(parameters), format, identity)
    }

    /// Builds a command carrying a signed prefix announcement.
    pub fn build_announcement(
        &mut self,
        name: Name,
        announcement: &PrefixAnnouncement,
        identity: &Name,
    ) -> Result<Interest, Error> {
        self.build(
            name,
            Payload::Announcement(announcement),
            SignedInterestFormat::V03,
            identity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_macros::test_traced;
    use commonware_codec::DecodeExt as _;
    use mgmt_packet::Data;
    use mgmt_security::CommandSignature;
    use std::time::Duration;
    use test_case::test_case;

    fn setup() -> (CommandBuilder, Name) {
        let mut builder = CommandBuilder::new(0, Scheduler::default());
        let identity: Name = "/operator".parse().unwrap();
        builder.keychain_mut().create_identity(identity.clone());
        (builder, identity)
    }

    #[test_case(SignedInterestFormat::V02, 5; "v02")]
    #[test_case(SignedInterestFormat::V03, 3; "v03")]
    fn test_parameters_layout(format: SignedInterestFormat, added: usize) {
        let (mut builder, identity) = setup();
        let name: Name = "/localhost/nfd/fib/add-nexthop".parse().unwrap();
        let parameters = ControlParameters::new().with_face_id(10).with_cost(0);
        let interest = builder
            .build_command(name.clone(), &parameters, format, &identity)
            .unwrap();

        let signed = interest.name();
        assert_eq!(signed.len(), name.len() + added);
        let component = signed.get(name.len()).unwrap();
        assert_eq!(
            ControlParameters::decode(component.value().clone()).unwrap(),
            parameters
        );
        let signature = CommandSignature::parse(signed).unwrap();
        assert_eq!(signature.format(), format);
        let certificate = builder.keychain().certificate(&identity).unwrap();
        assert!(signature.verify(certificate.public_key()).unwrap());
    }

    #[test_traced]
    fn test_announcement_forces_v03() {
        let (mut builder, identity) = setup();
        let announcement = builder
            .keychain()
            .sign_announcement(
                &PrefixAnnouncement::new("/app".parse().unwrap(), 10_000),
                &identity,
                0,
            )
            .unwrap();
        let name: Name = "/localhost/nfd/rib/announce".parse().unwrap();
        let interest = builder
            .build(
                name.clone(),
                Payload::Announcement(&announcement),
                SignedInterestFormat::V02,
                &identity,
            )
            .unwrap();
        let signature = CommandSignature::parse(interest.name()).unwrap();
        assert_eq!(signature.format(), SignedInterestFormat::V03);

        let component = interest.name().get(name.len()).unwrap();
        let carried = Data::decode(component.value().clone()).unwrap();
        assert_eq!(Some(&carried), announcement.signed_data());
    }

    #[test]
    fn test_unsigned_announcement() {
        let (mut builder, identity) = setup();
        let announcement = PrefixAnnouncement::new("/app".parse().unwrap(), 10_000);
        let result = builder.build_announcement(
            "/localhost/nfd/rib/announce".parse().unwrap(),
            &announcement,
            &identity,
        );
        assert!(matches!(result, Err(Error::UnsignedAnnouncement)));
    }

    #[test]
    fn test_unknown_identity() {
        let (mut builder, _) = setup();
        let result = builder.build_command(
            "/localhost/nfd/faces/create".parse().unwrap(),
            &ControlParameters::new(),
            SignedInterestFormat::V03,
            &"/nobody".parse().unwrap(),
        );
        assert!(matches!(
            result,
            Err(Error::Security(mgmt_security::Error::UnknownIdentity(_)))
        ));
    }

    #[test]
    fn test_timestamps_follow_clock() {
        let scheduler = Scheduler::default();
        let mut builder = CommandBuilder::new(0, scheduler.clone());
        let identity: Name = "/operator".parse().unwrap();
        builder.keychain_mut().create_identity(identity.clone());
        scheduler.advance(Duration::from_secs(3));
        let interest = builder
            .build_command(
                "/cmd".parse().unwrap(),
                &ControlParameters::new(),
                SignedInterestFormat::V03,
                &identity,
            )
            .unwrap();
        let signature = CommandSignature::parse(interest.name()).unwrap();
        assert_eq!(signature.timestamp(), 3_000);
    }
}
