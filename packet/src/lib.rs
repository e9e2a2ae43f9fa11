//! Encode and decode management packets in the NDN TLV format.
//!
//! # Overview
//!
//! Every packet is a tree of type-length-value elements. This crate provides:
//! - TLV primitives (VAR-NUMBER, NonNegativeInteger, raw [tlv::Element]s)
//! - The network-layer packets a management exchange uses: [Name], [Interest], [Data]
//! - The management payloads: [ControlParameters], [ControlResponse], [PrefixAnnouncement]
//!
//! Every packet implements the [commonware_codec] traits ([commonware_codec::Write],
//! [commonware_codec::EncodeSize], [commonware_codec::Read]). Failures specific to the TLV
//! format are reported as [Error]s, which travel through [commonware_codec::Error::Wrapped]
//! and can be recovered with `Error::from`.
//!
//! Encoding is canonical: values that compare equal always produce identical bytes, and
//! decoding an encoded value yields an equal value.
//!
//! # Example
//!
//! ```
//! use commonware_codec::{DecodeExt, Encode};
//! use mgmt_packet::{ControlParameters, ControlResponse};
//!
//! let params = ControlParameters::new().with_face_id(10).with_cost(0);
//! let response = ControlResponse::new(200, "OK").with_body(&params);
//!
//! let wire = response.encode();
//! let decoded = ControlResponse::decode(wire.freeze()).unwrap();
//! assert_eq!(decoded.code(), 200);
//! assert_eq!(ControlParameters::decode(decoded.body_bytes()).unwrap(), params);
//! ```

pub mod announcement;
pub mod control;
pub mod data;
pub mod error;
pub mod interest;
pub mod name;
pub mod response;
pub mod signature;
pub mod tlv;

pub use announcement::{PrefixAnnouncement, ValidityPeriod};
pub use control::{ControlParameters, FacePersistency};
pub use data::{content_type, Data, MetaInfo};
pub use error::Error;
pub use interest::Interest;
pub use name::{Component, Name};
pub use response::ControlResponse;
pub use signature::{signature_type, SignatureInfo};
