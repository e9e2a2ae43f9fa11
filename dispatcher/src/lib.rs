//! Dispatch management requests to registered handlers.
//!
//! A [Dispatcher] serves one or more top prefixes (like `/localhost/nfd`) on a simulated
//! [mgmt_sim::Face]. Requests are routed to control commands, prefix announcement commands or
//! status datasets registered relative to those prefixes. Each request is authorized first,
//! and control command parameters are validated before the handler runs.
//!
//! [CommandAuthenticator] provides an [Authorization] that verifies the command signature and
//! checks the signer's privileges.

use mgmt_packet::Name;
use thiserror::Error;

pub mod authenticator;
pub mod dataset;
pub mod dispatcher;

pub use authenticator::{CommandAuthenticator, Privileges};
pub use dataset::StatusDatasetContext;
pub use dispatcher::{
    accept_all, reject_all, Authorization, CommandContinuation, Config, Dispatcher, RejectReply,
};

/// Errors that can occur when configuring a [Dispatcher].
#[derive(Error, Debug)]
pub enum Error {
    #[error("top prefix overlaps an existing top prefix: {0}")]
    TopPrefixConflict(Name),
    #[error("handler added after a top prefix: {0}")]
    HandlerAfterTopPrefix(Name),
    #[error("handler overlaps an existing handler: {0}")]
    DuplicateHandler(Name),
    #[error("unknown top prefix: {0}")]
    UnknownTopPrefix(Name),
}
