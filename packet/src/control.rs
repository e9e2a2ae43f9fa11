//! Control parameters: the typed arguments of a management command.

use crate::{
    tlv::{self, element_size, nni_element_size, write_header, write_nni_element, Element},
    Error, Name,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error as CodecError, Read, ReadExt as _, Write};

/// Persistency of a face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FacePersistency {
    Persistent,
    OnDemand,
    Permanent,
}

impl FacePersistency {
    pub fn code(&self) -> u64 {
        match self {
            Self::Persistent => 0,
            Self::OnDemand => 1,
            Self::Permanent => 2,
        }
    }
}

impl TryFrom<u64> for FacePersistency {
    type Error = Error;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Persistent),
            1 => Ok(Self::OnDemand),
            2 => Ok(Self::Permanent),
            _ => Err(Error::InvalidData(
                "FacePersistency",
                format!("unknown code {code}"),
            )),
        }
    }
}

/// Arguments of a control command. Every field is optional.
///
/// Fields are written in a fixed order, so two equal values always produce identical bytes.
/// Durations are kept in their wire units so that every value survives a round trip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlParameters {
    pub name: Option<Name>,
    pub face_id: Option<u64>,
    pub uri: Option<String>,
    pub local_uri: Option<String>,
    pub origin: Option<u64>,
    pub cost: Option<u64>,
    pub capacity: Option<u64>,
    pub count: Option<u64>,
    /// In nanoseconds.
    pub base_congestion_marking_interval: Option<u64>,
    pub default_congestion_threshold: Option<u64>,
    pub mtu: Option<u64>,
    pub flags: Option<u64>,
    pub mask: Option<u64>,
    pub strategy: Option<Name>,
    /// In milliseconds.
    pub expiration_period: Option<u64>,
    pub face_persistency: Option<FacePersistency>,
}

impl ControlParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: Name) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_face_id(mut self, face_id: u64) -> Self {
        self.face_id = Some(face_id);
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_local_uri(mut self, uri: impl Into<String>) -> Self {
        self.local_uri = Some(uri.into());
        self
    }

    pub fn with_origin(mut self, origin: u64) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_base_congestion_marking_interval(mut self, nanos: u64) -> Self {
        self.base_congestion_marking_interval = Some(nanos);
        self
    }

    pub fn with_default_congestion_threshold(mut self, threshold: u64) -> Self {
        self.default_congestion_threshold = Some(threshold);
        self
    }

    pub fn with_mtu(mut self, mtu: u64) -> Self {
        self.mtu = Some(mtu);
        self
    }

    pub fn with_flags(mut self, flags: u64) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_mask(mut self, mask: u64) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_strategy(mut self, strategy: Name) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_expiration_period(mut self, millis: u64) -> Self {
        self.expiration_period = Some(millis);
        self
    }

    pub fn with_face_persistency(mut self, persistency: FacePersistency) -> Self {
        self.face_persistency = Some(persistency);
        self
    }

    /// Sets or clears bit `bit` of the flags field, optionally marking it in the mask.
    pub fn set_flag_bit(&mut self, bit: u32, value: bool, want_mask: bool) {
        let bit = 1u64 << bit;
        let flags = self.flags.unwrap_or(0);
        self.flags = Some(if value { flags | bit } else { flags & !bit });
        if want_mask {
            self.mask = Some(self.mask.unwrap_or(0) | bit);
        }
    }

    /// Returns whether bit `bit` of the flags field is set.
    pub fn flag_bit(&self, bit: u32) -> bool {
        self.flags.unwrap_or(0) & (1u64 << bit) != 0
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn value_size(&self) -> usize {
        let nni = |typ, value: Option<u64>| value.map_or(0, |v| nni_element_size(typ, v));
        let string = |typ, value: &Option<String>| {
            value.as_ref().map_or(0, |v| element_size(typ, v.len()))
        };
        self.name.as_ref().map_or(0, EncodeSize::encode_size)
            + nni(tlv::FACE_ID, self.face_id)
            + string(tlv::URI, &self.uri)
            + string(tlv::LOCAL_URI, &self.local_uri)
            + nni(tlv::ORIGIN, self.origin)
            + nni(tlv::COST, self.cost)
            + nni(tlv::CAPACITY, self.capacity)
            + nni(tlv::COUNT, self.count)
            + nni(
                tlv::BASE_CONGESTION_MARKING_INTERVAL,
                self.base_congestion_marking_interval,
            )
            + nni(
                tlv::DEFAULT_CONGESTION_THRESHOLD,
                self.default_congestion_threshold,
            )
            + nni(tlv::MTU, self.mtu)
            + nni(tlv::FLAGS, self.flags)
            + nni(tlv::MASK, self.mask)
            + self
                .strategy
                .as_ref()
                .map_or(0, |s| element_size(tlv::STRATEGY, s.encode_size()))
            + nni(tlv::EXPIRATION_PERIOD, self.expiration_period)
            + nni(
                tlv::FACE_PERSISTENCY,
                self.face_persistency.map(|p| p.code()),
            )
    }
}

impl Write for ControlParameters {
    fn write(&self, buf: &mut impl BufMut) {
        fn nni(typ: u64, value: Option<u64>, buf: &mut impl BufMut) {
            if let Some(value) = value {
                write_nni_element(typ, value, buf);
            }
        }
        fn string(typ: u64, value: &Option<String>, buf: &mut impl BufMut) {
            if let Some(value) = value {
                tlv::write_bytes_element(typ, value.as_bytes(), buf);
            }
        }

        write_header(tlv::CONTROL_PARAMETERS, self.value_size(), buf);
        if let Some(name) = &self.name {
            name.write(buf);
        }
        nni(tlv::FACE_ID, self.face_id, buf);
        string(tlv::URI, &self.uri, buf);
        string(tlv::LOCAL_URI, &self.local_uri, buf);
        nni(tlv::ORIGIN, self.origin, buf);
        nni(tlv::COST, self.cost, buf);
        nni(tlv::CAPACITY, self.capacity, buf);
        nni(tlv::COUNT, self.count, buf);
        nni(
            tlv::BASE_CONGESTION_MARKING_INTERVAL,
            self.base_congestion_marking_interval,
            buf,
        );
        nni(
            tlv::DEFAULT_CONGESTION_THRESHOLD,
            self.default_congestion_threshold,
            buf,
        );
        nni(tlv::MTU, self.mtu, buf);
        nni(tlv::FLAGS, self.flags, buf);
        nni(tlv::MASK, self.mask, buf);
        if let Some(strategy) = &self.strategy {
            write_header(tlv::STRATEGY, strategy.encode_size(), buf);
            strategy.write(buf);
        }
        nni(tlv::EXPIRATION_PERIOD, self.expiration_period, buf);
        nni(
            tlv::FACE_PERSISTENCY,
            self.face_persistency.map(|p| p.code()),
            buf,
        );
    }
}

impl EncodeSize for ControlParameters {
    fn encode_size(&self) -> usize {
        element_size(tlv::CONTROL_PARAMETERS, self.value_size())
    }
}

impl Read for ControlParameters {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        Ok(Self::try_from(tlv::read_expected(buf, tlv::CONTROL_PARAMETERS)?)?)
    }
}

impl TryFrom<Element> for ControlParameters {
    type Error = Error;

    fn try_from(element: Element) -> Result<Self, Self::Error> {
        element.expect_type(tlv::CONTROL_PARAMETERS)?;
        let mut params = Self::default();
        for child in element.children()? {
            let typ = child.typ;
            match typ {
                tlv::NAME => tlv::set_once(&mut params.name, typ, Name::try_from(child)?)?,
                tlv::FACE_ID => tlv::set_once(&mut params.face_id, typ, child.as_nni()?)?,
                tlv::URI => tlv::set_once(&mut params.uri, typ, child.as_string("Uri")?)?,
                tlv::LOCAL_URI => tlv::set_once(
                    &mut params.local_uri,
                    typ,
                    child.as_string("LocalUri")?,
                )?,
                tlv::ORIGIN => tlv::set_once(&mut params.origin, typ, child.as_nni()?)?,
                tlv::COST => tlv::set_once(&mut params.cost, typ, child.as_nni()?)?,
                tlv::CAPACITY => tlv::set_once(&mut params.capacity, typ, child.as_nni()?)?,
                tlv::COUNT => tlv::set_once(&mut params.count, typ, child.as_nni()?)?,
                tlv::BASE_CONGESTION_MARKING_INTERVAL => tlv::set_once(
                    &mut params.base_congestion_marking_interval,
                    typ,
                    child.as_nni()?,
                )?,
                tlv::DEFAULT_CONGESTION_THRESHOLD => tlv::set_once(
                    &mut params.default_congestion_threshold,
                    typ,
                    child.as_nni()?,
                )?,
                tlv::MTU => tlv::set_once(&mut params.mtu, typ, child.as_nni()?)?,
                tlv::FLAGS => tlv::set_once(&mut params.flags, typ, child.as_nni()?)?,
                tlv::MASK => tlv::set_once(&mut params.mask, typ, child.as_nni()?)?,
                tlv::STRATEGY => {
                    let mut value = child.value;
                    let strategy = Name::read(&mut value)?;
                    tlv::set_once(&mut params.strategy, typ, strategy)?;
                }
                tlv::EXPIRATION_PERIOD => tlv::set_once(
                    &mut params.expiration_period,
                    typ,
                    child.as_nni()?,
                )?,
                tlv::FACE_PERSISTENCY => tlv::set_once(
                    &mut params.face_persistency,
                    typ,
                    FacePersistency::try_from(child.as_nni()?)?,
                )?,
                _ => {}
            }
        }
        Ok(params)
    }
}
