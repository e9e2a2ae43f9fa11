//! Route interests under top prefixes to command and dataset handlers.

use crate::{dataset::StatusDatasetContext, Error};
use bytes::Bytes;
use mgmt_packet::{
    content_type, tlv, Component, ControlParameters, ControlResponse, Data, Interest, Name,
    PrefixAnnouncement,
};
use commonware_codec::{DecodeExt as _, Encode as _, Error as CodecError};
use mgmt_security::sign_data_digest;
use mgmt_sim::{deterministic::epoch_millis, Face, FilterId};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::{Rc, Weak},
    time::Duration,
};
use tracing::{debug, trace};

/// Why a request was not authorized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReply {
    /// Drop the request without replying.
    Silent,
    /// Reply with `403 "authorization rejected"`.
    Status403,
}

/// Decides whether a request may proceed, returning the requester on success.
///
/// Called with the handler prefix, the interest and, for control commands, the decoded
/// parameters.
pub type Authorization =
    Rc<dyn Fn(&Name, &Interest, Option<&ControlParameters>) -> Result<String, RejectReply>>;

/// Delivers the response of a command once it completes.
pub type CommandContinuation = Box<dyn FnOnce(ControlResponse)>;

type RequestHandler = Rc<dyn Fn(&Name, &Interest)>;

/// Configuration for the [Dispatcher].
#[derive(Clone, Debug)]
pub struct Config {
    /// Freshness period of every response, in whole milliseconds.
    pub freshness: Duration,
    /// Maximum content size of one status dataset segment.
    pub segment_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(1),
            segment_size: 4400,
        }
    }
}

/// Sends responses on the face.
#[derive(Clone)]
struct Responder {
    face: Face,
    cfg: Config,
}

impl Responder {
    fn send(&self, name: Name, content: Bytes, typ: u64, final_block: Option<Component>) {
        let mut data = Data::new(name)
            .with_content(content)
            .with_content_type(typ)
            .with_freshness(u64::try_from(self.cfg.freshness.as_millis()).unwrap_or(u64::MAX));
        if let Some(final_block) = final_block {
            data = data.with_final_block_id(final_block);
        }
        sign_data_digest(&mut data);
        self.face.put(data);
    }

    fn send_control_response(&self, interest: &Interest, response: &ControlResponse, nack: bool) {
        debug!(
            name = %interest.name(),
            code = response.code(),
            text = response.text(),
            "responding"
        );
        let typ = if nack {
            content_type::NACK
        } else {
            content_type::BLOB
        };
        self.send(
            interest.name().clone(),
            response.encode().freeze(),
            typ,
            None,
        );
    }

    fn send_dataset(&self, interest: &Interest, content: Bytes) {
        let version = epoch_millis(self.face.scheduler().now());
        let base = interest.name().clone().append_version(version);
        let segment_size = self.cfg.segment_size.max(1);
        let count = content.len().div_ceil(segment_size).max(1);
        let last = Component::segment(count as u64 - 1);
        debug!(name = %base, segments = count, "sending dataset");
        for i in 0..count {
            let start = (i * segment_size).min(content.len());
            let end = (start + segment_size).min(content.len());
            let final_block = (i + 1 == count).then(|| last.clone());
            self.send(
                base.clone().append_segment(i as u64),
                content.slice(start..end),
                content_type::BLOB,
                final_block,
            );
        }
    }
}

struct TopPrefix {
    filter: FilterId,
    registered: bool,
}

struct Inner {
    responder: Responder,
    top_prefixes: BTreeMap<Name, TopPrefix>,
    handlers: BTreeMap<Name, RequestHandler>,
}

impl Inner {
    fn find_handler(&self, prefix: &Name, interest: &Interest) -> Option<(Name, RequestHandler)> {
        let name = interest.name();
        let relative = Name::from_components(name.components().iter().skip(prefix.len()).cloned());
        self.handlers
            .iter()
            .find(|(handler_prefix, _)| handler_prefix.is_prefix_of(&relative))
            .map(|(handler_prefix, handler)| {
                (prefix.clone().concat(handler_prefix), handler.clone())
            })
    }
}

fn overlaps(a: &Name, b: &Name) -> bool {
    a.is_prefix_of(b) || b.is_prefix_of(a)
}

/// Dispatches management requests arriving on a [Face].
///
/// Handlers are registered relative to the top prefixes, and must all be added before the first
/// top prefix.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Rc<RefCell<Inner>>,
}

impl Dispatcher {
    pub fn new(face: Face, cfg: Config) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                responder: Responder { face, cfg },
                top_prefixes: BTreeMap::new(),
                handlers: BTreeMap::new(),
            })),
        }
    }

    pub fn face(&self) -> Face {
        self.inner.borrow().responder.face.clone()
    }

    /// Top prefixes currently served.
    pub fn top_prefixes(&self) -> Vec<Name> {
        self.inner.borrow().top_prefixes.keys().cloned().collect()
    }

    /// Starts serving `prefix`, optionally registering it with the forwarder.
    pub fn add_top_prefix(&self, prefix: Name, want_register: bool) -> Result<(), Error> {
        let mut inner = self.inner.borrow_mut();
        if inner.top_prefixes.keys().any(|existing| overlaps(existing, &prefix)) {
            return Err(Error::TopPrefixConflict(prefix));
        }

        let face = inner.responder.face.clone();
        if want_register {
            face.register_prefix(prefix.clone());
        }
        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        let filter = face.set_interest_filter(prefix.clone(), move |prefix, interest| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let found = inner.borrow().find_handler(prefix, interest);
            match found {
                Some((handler_prefix, handler)) => handler(&handler_prefix, interest),
                None => debug!(name = %interest.name(), "no handler for interest"),
            }
        });
        debug!(%prefix, want_register, "added top prefix");
        inner.top_prefixes.insert(
            prefix,
            TopPrefix {
                filter,
                registered: want_register,
            },
        );
        Ok(())
    }

    /// Stops serving `prefix`.
    pub fn remove_top_prefix(&self, prefix: &Name) -> Result<(), Error> {
        let mut inner = self.inner.borrow_mut();
        let top = inner
            .top_prefixes
            .remove(prefix)
            .ok_or_else(|| Error::UnknownTopPrefix(prefix.clone()))?;
        let face = &inner.responder.face;
        face.unset_interest_filter(top.filter);
        if top.registered {
            face.unregister_prefix(prefix.clone());
        }
        debug!(%prefix, "removed top prefix");
        Ok(())
    }

    fn add_handler(&self, relative: Name, handler: RequestHandler) -> Result<(), Error> {
        let mut inner = self.inner.borrow_mut();
        if !inner.top_prefixes.is_empty() {
            return Err(Error::HandlerAfterTopPrefix(relative));
        }
        if inner.handlers.keys().any(|existing| overlaps(existing, &relative)) {
            return Err(Error::DuplicateHandler(relative));
        }
        trace!(%relative, "added handler");
        inner.handlers.insert(relative, handler);
        Ok(())
    }

    fn responder(&self) -> Responder {
        self.inner.borrow().responder.clone()
    }

    /// Serves a control command under `relative`.
    ///
    /// The name component following the command prefix must hold the [ControlParameters];
    /// requests where it does not are dropped.
    pub fn add_control_command(
        &self,
        relative: Name,
        authorization: Authorization,
        validate: impl Fn(&ControlParameters) -> bool + 'static,
        handler: impl Fn(&Name, &Interest, &ControlParameters, CommandContinuation) + 'static,
    ) -> Result<(), Error> {
        let responder = self.responder();
        self.add_handler(
            relative,
            Rc::new(move |prefix: &Name, interest: &Interest| {
                let parameters = match parse_parameters(prefix, interest) {
                    Ok(parameters) => parameters,
                    Err(err) => {
                        debug!(name = %interest.name(), ?err, "dropping malformed command");
                        return;
                    }
                };
                if !authorize(&responder, &authorization, prefix, interest, Some(&parameters)) {
                    return;
                }
                if !validate(&parameters) {
                    let response = ControlResponse::new(400, "failed in validating parameters");
                    responder.send_control_response(interest, &response, false);
                    return;
                }
                handler(prefix, interest, &parameters, continuation(&responder, interest));
            }),
        )
    }

    /// Serves a prefix announcement command under `relative`.
    ///
    /// The name component following the command prefix must hold a signed prefix announcement;
    /// requests where it does not are dropped.
    pub fn add_announcement_command(
        &self,
        relative: Name,
        authorization: Authorization,
        handler: impl Fn(&Name, &Interest, &PrefixAnnouncement, CommandContinuation) + 'static,
    ) -> Result<(), Error> {
        let responder = self.responder();
        self.add_handler(
            relative,
            Rc::new(move |prefix: &Name, interest: &Interest| {
                let announcement = match parse_announcement(prefix, interest) {
                    Some(announcement) => announcement,
                    None => {
                        debug!(name = %interest.name(), "dropping unsigned announcement");
                        return;
                    }
                };
                if !authorize(&responder, &authorization, prefix, interest, None) {
                    return;
                }
                handler(prefix, interest, &announcement, continuation(&responder, interest));
            }),
        )
    }

    /// Serves a status dataset under `relative`.
    pub fn add_status_dataset(
        &self,
        relative: Name,
        authorization: Authorization,
        handler: impl Fn(&Name, &Interest, &mut StatusDatasetContext) + 'static,
    ) -> Result<(), Error> {
        let responder = self.responder();
        self.add_handler(
            relative,
            Rc::new(move |prefix: &Name, interest: &Interest| {
                if interest.name().len() > prefix.len() {
                    debug!(name = %interest.name(), "dropping dataset segment request");
                    return;
                }
                if !authorize(&responder, &authorization, prefix, interest, None) {
                    return;
                }
                let mut context = StatusDatasetContext::new();
                handler(prefix, interest, &mut context);
                match context.finish() {
                    Ok(content) => responder.send_dataset(interest, content),
                    Err(response) => responder.send_control_response(interest, &response, true),
                }
            }),
        )
    }
}

fn parse_parameters(prefix: &Name, interest: &Interest) -> Result<ControlParameters, CodecError> {
    let component = interest
        .name()
        .get(prefix.len())
        .ok_or(mgmt_packet::Error::MissingElement(tlv::CONTROL_PARAMETERS))?;
    ControlParameters::decode(component.value().clone())
}

fn parse_announcement(prefix: &Name, interest: &Interest) -> Option<PrefixAnnouncement> {
    let component = interest.name().get(prefix.len())?;
    let data = Data::decode(component.value().clone()).ok()?;
    let announcement = PrefixAnnouncement::try_from(data).ok()?;
    announcement.signed_data()?;
    Some(announcement)
}

/// Runs `authorization`, replying when it asks to. Returns whether the request may proceed.
fn authorize(
    responder: &Responder,
    authorization: &Authorization,
    prefix: &Name,
    interest: &Interest,
    parameters: Option<&ControlParameters>,
) -> bool {
    match authorization(prefix, interest, parameters) {
        Ok(requester) => {
            trace!(name = %interest.name(), %requester, "authorized");
            true
        }
        Err(RejectReply::Silent) => {
            debug!(name = %interest.name(), "rejected silently");
            false
        }
        Err(RejectReply::Status403) => {
            let response = ControlResponse::new(403, "authorization rejected");
            responder.send_control_response(interest, &response, false);
            false
        }
    }
}

fn continuation(responder: &Responder, interest: &Interest) -> CommandContinuation {
    let responder = responder.clone();
    let interest = interest.clone();
    Box::new(move |response| responder.send_control_response(&interest, &response, false))
}

/// Authorization accepting every request.
pub fn accept_all() -> Authorization {
    Rc::new(|_: &Name, _: &Interest, _: Option<&ControlParameters>| Ok(String::new()))
}

/// Authorization rejecting every request with the given reply.
pub fn reject_all(reply: RejectReply) -> Authorization {
    Rc::new(move |_: &Name, _: &Interest, _: Option<&ControlParameters>| Err(reply))
}
