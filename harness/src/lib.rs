//! Deterministic test harness for signed management commands.
//!
//! # Overview
//!
//! The harness builds signed command requests, drives them through a [mgmt_dispatcher::Dispatcher]
//! under a logical clock, and checks the responses it sends with byte-level precision:
//!
//! - [command::CommandBuilder] appends the encoded parameters (or a signed prefix announcement)
//!   to a command name and signs it in the requested format.
//! - [privileges::PrivilegeRecorder] records which identities hold which privileges, for the
//!   dispatcher's authenticator to consult.
//! - [fixture::Fixture] ties both to a simulated face and advances the clock so that deferred
//!   work completes before a test looks at the result.
//! - [verify] classifies a captured response against an expectation and concatenates segmented
//!   responses.
//!
//! # Example
//!
//! ```
//! use mgmt_dispatcher::accept_all;
//! use mgmt_harness::{make_response, CheckResponseResult, Fixture};
//! use mgmt_packet::{content_type, ControlParameters};
//!
//! let mut fixture = Fixture::default();
//! fixture
//!     .dispatcher()
//!     .add_control_command(
//!         "/fib/add-nexthop".parse().unwrap(),
//!         accept_all(),
//!         |_| true,
//!         |_, _, parameters, done| done(make_response(200, "OK", parameters)),
//!     )
//!     .unwrap();
//! fixture.set_top_prefix().unwrap();
//!
//! let parameters = ControlParameters::new().with_face_id(10).with_cost(0);
//! let name = "/localhost/nfd/fib/add-nexthop".parse().unwrap();
//! let request = fixture.make_control_command_request(name, &parameters).unwrap();
//! fixture.receive_interest(&request);
//!
//! let expected = make_response(200, "OK", &parameters);
//! assert_eq!(
//!     fixture.check_response(0, request.name(), &expected, Some(content_type::BLOB)),
//!     CheckResponseResult::Ok
//! );
//! ```

use thiserror::Error;

pub mod command;
pub mod fixture;
pub mod privileges;
pub mod verify;

pub use command::{CommandBuilder, Payload};
pub use fixture::{Config, Fixture, DEFAULT_IDENTITY};
pub use privileges::PrivilegeRecorder;
pub use verify::{
    check_outcome, check_response, concatenate_responses, make_response, CheckResponseResult,
    CommandFailure, CommandSuccess, ExpectedResponse,
};

/// Errors that can occur when building commands or reading responses.
#[derive(Error, Debug)]
pub enum Error {
    #[error("security error: {0}")]
    Security(#[from] mgmt_security::Error),
    #[error("dispatcher error: {0}")]
    Dispatcher(#[from] mgmt_dispatcher::Error),
    #[error("prefix announcement is not signed")]
    UnsignedAnnouncement,
    #[error("start index {start} exceeds {len} responses")]
    OutOfRange { start: usize, len: usize },
}
