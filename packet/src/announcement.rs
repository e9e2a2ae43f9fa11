//! Prefix announcements.
//!
//! A prefix announcement states that a name prefix is reachable. It travels as a signed
//! [Data] packet named `<prefix>/32=PA/<version>/<segment 0>` whose content holds an
//! expiration period and, optionally, a validity period.

use crate::{
    data::content_type,
    tlv::{self, element_size, nni_element_size, write_header, write_nni_element, Element},
    Component, Data, Error, Name,
};
use bytes::{Buf, BytesMut};
use chrono::{DateTime, NaiveDateTime, Utc};
use commonware_codec::ReadExt as _;
use std::time::{Duration, SystemTime};

/// Keyword component marking a prefix announcement.
pub const KEYWORD: &[u8] = b"PA";

const TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Interval during which an announcement is valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidityPeriod {
    pub not_before: SystemTime,
    pub not_after: SystemTime,
}

impl ValidityPeriod {
    /// Returns true if `now` falls within the period (inclusive).
    pub fn contains(&self, now: SystemTime) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(TIME_FORMAT).to_string()
}

fn parse_time(element: &Element, context: &'static str) -> Result<SystemTime, Error> {
    let text = element.as_string(context)?;
    let parsed = NaiveDateTime::parse_from_str(&text, TIME_FORMAT)
        .map_err(|err| Error::InvalidData(context, err.to_string()))?;
    Ok(parsed.and_utc().into())
}

/// An announcement that `announced_name` is reachable.
///
/// The expiration period is held in milliseconds, its unit on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixAnnouncement {
    announced_name: Name,
    expiration_millis: u64,
    validity: Option<ValidityPeriod>,
    data: Option<Data>,
}

impl PrefixAnnouncement {
    pub fn new(announced_name: Name, expiration_millis: u64) -> Self {
        Self {
            announced_name,
            expiration_millis,
            validity: None,
            data: None,
        }
    }

    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn announced_name(&self) -> &Name {
        &self.announced_name
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_millis)
    }

    pub fn expiration_millis(&self) -> u64 {
        self.expiration_millis
    }

    pub fn validity(&self) -> Option<&ValidityPeriod> {
        self.validity.as_ref()
    }

    /// Returns the Data packet this announcement was decoded from, if any.
    pub fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    /// Returns the signed Data packet, if this announcement carries a signature.
    pub fn signed_data(&self) -> Option<&Data> {
        self.data.as_ref().filter(|data| data.signature_info().is_some())
    }

    /// Builds the (unsigned) Data packet carrying this announcement.
    pub fn to_data(&self, version: u64) -> Data {
        let name = self
            .announced_name
            .clone()
            .append_keyword(KEYWORD)
            .append_version(version)
            .append_segment(0);

        let mut value_size = nni_element_size(tlv::EXPIRATION_PERIOD, self.expiration_millis());
        let validity = self.validity.map(|v| (format_time(v.not_before), format_time(v.not_after)));
        let validity_size = validity.as_ref().map(|(not_before, not_after)| {
            element_size(tlv::NOT_BEFORE, not_before.len())
                + element_size(tlv::NOT_AFTER, not_after.len())
        });
        if let Some(size) = validity_size {
            value_size += element_size(tlv::VALIDITY_PERIOD, size);
        }

        let mut content = BytesMut::with_capacity(value_size);
        write_nni_element(tlv::EXPIRATION_PERIOD, self.expiration_millis(), &mut content);
        if let (Some((not_before, not_after)), Some(size)) = (validity, validity_size) {
            write_header(tlv::VALIDITY_PERIOD, size, &mut content);
            tlv::write_bytes_element(tlv::NOT_BEFORE, not_before.as_bytes(), &mut content);
            tlv::write_bytes_element(tlv::NOT_AFTER, not_after.as_bytes(), &mut content);
        }

        Data::new(name)
            .with_content_type(content_type::PREFIX_ANN)
            .with_content(content.freeze())
    }
}

impl TryFrom<Data> for PrefixAnnouncement {
    type Error = Error;

    fn try_from(data: Data) -> Result<Self, Self::Error> {
        let name = data.name();
        let keyword_index = name
            .len()
            .checked_sub(3)
            .ok_or_else(|| Error::InvalidData("PrefixAnnouncement", "name too short".into()))?;
        let keyword = Component::keyword(KEYWORD);
        if name.get(keyword_index) != Some(&keyword)
            || !name.get(keyword_index + 1).is_some_and(Component::is_version)
            || !name.get(keyword_index + 2).is_some_and(Component::is_segment)
        {
            return Err(Error::InvalidData(
                "PrefixAnnouncement",
                format!("{name} is not a prefix announcement name"),
            ));
        }
        if data.content_type() != content_type::PREFIX_ANN {
            return Err(Error::InvalidData(
                "PrefixAnnouncement",
                format!("content type {}", data.content_type()),
            ));
        }

        let announced_name = name.prefix(keyword_index);
        let mut content = data.content().clone();
        let mut expiration = None;
        let mut validity = None;
        while content.has_remaining() {
            let element = Element::read(&mut content)?;
            match element.typ {
                tlv::EXPIRATION_PERIOD => {
                    tlv::set_once(&mut expiration, element.typ, element.as_nni()?)?
                }
                tlv::VALIDITY_PERIOD => {
                    let children = element.children()?;
                    let not_before = children
                        .iter()
                        .find(|c| c.typ == tlv::NOT_BEFORE)
                        .ok_or(Error::MissingElement(tlv::NOT_BEFORE))?;
                    let not_after = children
                        .iter()
                        .find(|c| c.typ == tlv::NOT_AFTER)
                        .ok_or(Error::MissingElement(tlv::NOT_AFTER))?;
                    let period = ValidityPeriod {
                        not_before: parse_time(not_before, "NotBefore")?,
                        not_after: parse_time(not_after, "NotAfter")?,
                    };
                    tlv::set_once(&mut validity, element.typ, period)?;
                }
                _ => {}
            }
        }

        Ok(Self {
            announced_name,
            expiration_millis: expiration.ok_or(Error::MissingElement(tlv::EXPIRATION_PERIOD))?,
            validity,
            data: Some(data),
        })
    }
}
