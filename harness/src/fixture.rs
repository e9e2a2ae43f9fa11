//! A management test fixture.
//!
//! [Fixture] wires a [CommandBuilder], a simulated [Face] and a [Dispatcher] to one logical
//! clock. Tests register handlers on the dispatcher, call [Fixture::set_top_prefix], submit
//! commands with [Fixture::receive_interest] and inspect what the dispatcher sent.

use crate::{
    command::{CommandBuilder, Payload},
    privileges::PrivilegeRecorder,
    verify::{self, CheckResponseResult},
    Error,
};
use bytes::Bytes;
use mgmt_dispatcher::{Authorization, CommandAuthenticator, Dispatcher};
use mgmt_packet::{ControlParameters, ControlResponse, Data, Interest, Name, PrefixAnnouncement};
use mgmt_security::{Certificate, SignedInterestFormat};
use mgmt_sim::{Face, Scheduler};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Identity signing commands unless another is requested.
pub const DEFAULT_IDENTITY: &str = "InterestSignerFixture-identity";

/// Configuration for the [Fixture].
#[derive(Clone, Debug)]
pub struct Config {
    /// Seed for keys and nonces.
    pub seed: u64,
    /// Identity signing commands by default.
    pub identity: Name,
    /// Prefix registered by [Fixture::set_top_prefix].
    pub top_prefix: Name,
    /// How far [Fixture::receive_interest] and [Fixture::set_top_prefix] advance the clock.
    pub tick: Duration,
    pub scheduler: mgmt_sim::Config,
    pub dispatcher: mgmt_dispatcher::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0,
            identity: Name::new().append_generic(DEFAULT_IDENTITY),
            top_prefix: Name::new().append_generic("localhost").append_generic("nfd"),
            tick: Duration::from_millis(1),
            scheduler: mgmt_sim::Config::default(),
            dispatcher: mgmt_dispatcher::Config::default(),
        }
    }
}

/// Drives signed management commands through a dispatcher on a logical clock.
pub struct Fixture {
    cfg: Config,
    scheduler: Scheduler,
    face: Face,
    dispatcher: Dispatcher,
    builder: CommandBuilder,
    certificate: Certificate,
    privileges: PrivilegeRecorder,
    authenticator: CommandAuthenticator<PrivilegeRecorder>,
}

impl Fixture {
    pub fn new(cfg: Config) -> Self {
        let scheduler = Scheduler::new(cfg.scheduler.clone());
        let face = Face::new(scheduler.clone());
        let dispatcher = Dispatcher::new(face.clone(), cfg.dispatcher.clone());
        let mut builder = CommandBuilder::new(cfg.seed, scheduler.clone());
        let certificate = builder.keychain_mut().create_identity(cfg.identity.clone());
        let privileges = PrivilegeRecorder::new();
        let authenticator = CommandAuthenticator::new(privileges.clone());
        Self {
            cfg,
            scheduler,
            face,
            dispatcher,
            builder,
            certificate,
            privileges,
            authenticator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn face(&self) -> &Face {
        &self.face
    }

    pub fn builder(&mut self) -> &mut CommandBuilder {
        &mut self.builder
    }

    pub fn privileges(&self) -> &PrivilegeRecorder {
        &self.privileges
    }

    /// Certificate of the default identity.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Authorization checking signatures and recorded privileges for `module`.
    pub fn authorization(&self, module: &str) -> Authorization {
        self.authenticator.authorization(module)
    }

    pub fn now(&self) -> SystemTime {
        self.scheduler.now()
    }

    /// Builds a V03 command signed by the default identity.
    pub fn make_control_command_request(
        &mut self,
        name: Name,
        parameters: &ControlParameters,
    ) -> Result<Interest, Error> {
        let identity = self.cfg.identity.clone();
        self.make_control_command_request_with(
            name,
            parameters,
            SignedInterestFormat::V03,
            &identity,
        )
    }

    /// Builds a command in `format`, signed by `identity`.
    pub fn make_control_command_request_with(
        &mut self,
        name: Name,
        parameters: &ControlParameters,
        format: SignedInterestFormat,
        identity: &Name,
    ) -> Result<Interest, Error> {
        self.builder
            .build(name, Payload::Parameters(parameters), format, identity)
    }

    /// Builds a prefix announcement command signed by `identity`.
    pub fn make_announcement_request(
        &mut self,
        name: Name,
        announcement: &PrefixAnnouncement,
        identity: &Name,
    ) -> Result<Interest, Error> {
        self.builder.build_announcement(name, announcement, identity)
    }

    /// Adds the configured top prefix to the dispatcher and lets its filter take effect.
    pub fn set_top_prefix(&self) -> Result<(), Error> {
        self.dispatcher
            .add_top_prefix(self.cfg.top_prefix.clone(), true)?;
        self.advance_clocks(self.cfg.tick, 1);
        Ok(())
    }

    /// Hands `interest` to the face and lets the dispatcher process it.
    pub fn receive_interest(&self, interest: &Interest) {
        debug!(name = %interest.name(), "receiving interest");
        self.face.receive(interest.clone());
        self.advance_clocks(self.cfg.tick, 1);
    }

    pub fn advance_clocks(&self, step: Duration, repetitions: usize) {
        self.scheduler.advance_clocks(step, repetitions);
    }

    /// Grants `privilege` to the default identity.
    pub fn set_privilege(&self, privilege: &str) {
        self.privileges.grant(&self.certificate, privilege);
    }

    /// Grants `privilege` to `identity`, which must exist in the keychain.
    pub fn grant_privilege(&self, identity: &Name, privilege: &str) -> Result<(), Error> {
        let certificate = self.builder.keychain().certificate(identity)?;
        self.privileges.grant(certificate, privilege);
        Ok(())
    }

    /// Snapshot of the responses sent by the dispatcher since the last
    /// [Fixture::clear_responses].
    pub fn responses(&self) -> Vec<Data> {
        self.face.sent_data().to_vec()
    }

    pub fn clear_responses(&self) {
        self.face.clear_sent_data();
    }

    /// See [verify::check_response].
    pub fn check_response(
        &self,
        idx: usize,
        expected_name: &Name,
        expected: &ControlResponse,
        expected_content_type: Option<u64>,
    ) -> CheckResponseResult {
        verify::check_response(
            &self.face.sent_data(),
            idx,
            expected_name,
            expected,
            expected_content_type,
        )
    }

    /// See [verify::concatenate_responses].
    pub fn concatenate_responses(&self, start: usize, count: usize) -> Result<Bytes, Error> {
        verify::concatenate_responses(&self.face.sent_data(), start, count)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
