//! Action encoding, decoding, and lifecycle for the ofact codec.
//!
//! This is the main codec crate. It turns wire buffers scanned by `wire`
//! into typed [`Action`] lists and back, and routes experimenter records
//! through a runtime [`ExperimenterRegistry`] instead of baking vendor
//! formats into the core.
//!
//! # Features
//!
//! - Typed action model covering every standard action kind
//! - List decode with per-record validation and error lowering
//! - List encode with exact, pre-computed sizing
//! - Set-field OXM TLVs with optional masks
//! - Pluggable vendor codecs keyed by experimenter id
//! - Explicit release so vendor records never bypass their codec
//!
//! # Design Principles
//!
//! - **Correctness first** - All invariants are documented and tested.
//! - **Fail whole, release the rest** - A bad record rejects the list and
//!   returns already-decoded actions to their owners.
//! - **Deterministic** - Same inputs produce same outputs.

mod action;
mod decode;
mod encode;
mod error;
mod experimenter;
mod field;
mod lifecycle;
#[cfg(test)]
mod testutil;

pub use action::Action;
pub use decode::{unpack_action, unpack_actions};
pub use encode::{pack_action, pack_actions};
pub use error::{CodecError, CodecResult};
pub use experimenter::{ExperimenterCodec, ExperimenterRegistry, VendorAction};
pub use field::{Field, FIELD_ID_MAX, OXM_HEADER_LEN};
pub use lifecycle::{release, release_all};
pub use wire::ErrorCode as WireErrorCode;
