//! Experimenter action extension point.
//!
//! Vendors extend the action space under a 32-bit vendor id without a
//! protocol revision. The core stays codec-agnostic: it keys registry
//! lookups off the vendor id and hands the opaque record back to the owning
//! codec for pack, unpack, release, sizing, and rendering.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;
use wire::WireWriter;

use crate::error::{CodecError, CodecResult};

/// Opaque vendor-defined action record.
///
/// The core never inspects the payload; the identity and downcast hooks
/// exist so registries can dispatch and owning codecs can recover their
/// concrete type.
pub trait VendorAction: fmt::Debug + Send + 'static {
    /// Vendor id the registry dispatches on.
    fn vendor_id(&self) -> u32;

    /// Borrowed downcast access for the owning codec.
    fn as_any(&self) -> &dyn Any;

    /// Consuming downcast access, used by release hooks that need the
    /// concrete record.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Structural equality against another vendor record. Records of
    /// different concrete types are never equal.
    fn eq_vendor(&self, other: &dyn VendorAction) -> bool;
}

/// Codec capability set one vendor registers: pack, unpack, release,
/// wire-length, describe.
///
/// `Send + Sync` so a populated registry can sit behind a shared reference
/// while worker threads decode concurrently.
pub trait ExperimenterCodec: Send + Sync {
    /// Vendor id this codec serves; the registry indexes on it.
    fn vendor_id(&self) -> u32;

    /// Emits the full wire record for `action`, header included. Returns
    /// the bytes written.
    fn pack(&self, action: &dyn VendorAction, out: &mut WireWriter) -> CodecResult<usize>;

    /// Decodes one record from the remaining buffer, which starts at the
    /// record's type field. Returns the record and the bytes consumed (the
    /// declared wire length) so the caller can advance its cursor.
    ///
    /// Implementations must verify the buffer holds the wire-declared
    /// length before touching any later field, and must not leave any
    /// allocation without an owner on an error path.
    fn unpack(&self, data: &[u8]) -> CodecResult<(Box<dyn VendorAction>, usize)>;

    /// Releases vendor-owned nested resources. Vendors whose records own
    /// nothing beyond the record itself let the box drop.
    fn release(&self, action: Box<dyn VendorAction>);

    /// Serialized size of `action` on the wire.
    fn wire_len(&self, action: &dyn VendorAction) -> usize;

    /// Human-readable rendering of `action`.
    fn describe(&self, action: &dyn VendorAction) -> String;
}

/// Vendor id → codec table.
///
/// Populated during a controlled startup registration phase, then treated
/// as read-only: decode paths take `&self`, and nothing mutates after
/// registration. Concurrent reads need no locking.
#[derive(Default)]
pub struct ExperimenterRegistry {
    codecs: HashMap<u32, Box<dyn ExperimenterCodec>>,
}

impl ExperimenterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a vendor codec. Each vendor id registers at most once;
    /// a duplicate is a wiring mistake, not a protocol condition.
    pub fn register(&mut self, codec: Box<dyn ExperimenterCodec>) -> CodecResult<()> {
        let vendor_id = codec.vendor_id();
        if self.codecs.contains_key(&vendor_id) {
            return Err(CodecError::DuplicateVendor { vendor_id });
        }
        self.codecs.insert(vendor_id, codec);
        debug!(vendor_id, "registered experimenter action codec");
        Ok(())
    }

    /// Looks up the codec for a vendor id.
    #[must_use]
    pub fn get(&self, vendor_id: u32) -> Option<&dyn ExperimenterCodec> {
        self.codecs.get(&vendor_id).map(Box::as_ref)
    }

    /// Returns `true` if a codec is registered for `vendor_id`.
    #[must_use]
    pub fn contains(&self, vendor_id: u32) -> bool {
        self.codecs.contains_key(&vendor_id)
    }

    /// Registered vendor ids, in no particular order.
    pub fn vendor_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.codecs.keys().copied()
    }

    /// Number of registered vendors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if no vendor has registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for ExperimenterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut vendors: Vec<u32> = self.codecs.keys().copied().collect();
        vendors.sort_unstable();
        f.debug_struct("ExperimenterRegistry")
            .field("vendors", &vendors)
            .finish()
    }
}
