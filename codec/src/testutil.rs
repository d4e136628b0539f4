//! In-tree vendor codec for unit tests.
//!
//! A deliberately small stand-in for a real vendor extension: one subtype,
//! a single payload word, and an atomic release counter so lifecycle tests
//! can assert exactly-once accounting.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wire::{ScanError, WireReader, WireWriter};

use crate::error::{CodecError, CodecResult};
use crate::experimenter::{ExperimenterCodec, VendorAction};

pub const TEST_VENDOR_ID: u32 = 0x00ab_cdef;
pub const TEST_SUBTYPE: u16 = 1;
/// type(2) + length(2) + vendor(4) + subtype(2) + pad(2) + word(4).
pub const TEST_WIRE_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub vendor_id: u32,
    pub subtype: u16,
    pub word: u32,
}

impl TestRecord {
    /// Well-formed record under the test vendor id.
    pub fn label(word: u32) -> Self {
        Self {
            vendor_id: TEST_VENDOR_ID,
            subtype: TEST_SUBTYPE,
            word,
        }
    }

    /// Record claiming a vendor id nothing is registered under.
    pub fn foreign(vendor_id: u32) -> Self {
        Self {
            vendor_id,
            subtype: TEST_SUBTYPE,
            word: 0,
        }
    }

    /// Record with a subtype the test codec does not understand.
    pub fn bad_subtype(subtype: u16) -> Self {
        Self {
            vendor_id: TEST_VENDOR_ID,
            subtype,
            word: 0,
        }
    }
}

impl VendorAction for TestRecord {
    fn vendor_id(&self) -> u32 {
        self.vendor_id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn eq_vendor(&self, other: &dyn VendorAction) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }
}

pub struct TestCodec {
    vendor_id: u32,
    released: Arc<AtomicUsize>,
}

impl TestCodec {
    pub fn new() -> Self {
        Self::with_vendor(TEST_VENDOR_ID)
    }

    pub fn with_vendor(vendor_id: u32) -> Self {
        Self {
            vendor_id,
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle onto the release counter, cloned before the codec moves
    /// into a registry.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.released)
    }

    fn downcast<'a>(&self, record: &'a dyn VendorAction) -> CodecResult<&'a TestRecord> {
        let record = record.as_any().downcast_ref::<TestRecord>().ok_or(
            CodecError::UnknownVendor {
                vendor_id: record.vendor_id(),
            },
        )?;
        if record.vendor_id != self.vendor_id {
            return Err(CodecError::UnknownVendor {
                vendor_id: record.vendor_id,
            });
        }
        if record.subtype != TEST_SUBTYPE {
            return Err(CodecError::UnknownVendorSubtype {
                vendor_id: record.vendor_id,
                subtype: record.subtype,
            });
        }
        Ok(record)
    }
}

impl ExperimenterCodec for TestCodec {
    fn vendor_id(&self) -> u32 {
        self.vendor_id
    }

    fn pack(&self, record: &dyn VendorAction, out: &mut WireWriter) -> CodecResult<usize> {
        let record = self.downcast(record)?;
        out.put_u16(wire::ActionType::Experimenter.raw());
        out.put_len_u16(TEST_WIRE_LEN)?;
        out.put_u32(record.vendor_id);
        out.put_u16(record.subtype);
        out.put_zeros(2);
        out.put_u32(record.word);
        Ok(TEST_WIRE_LEN)
    }

    fn unpack(&self, data: &[u8]) -> CodecResult<(Box<dyn VendorAction>, usize)> {
        let mut reader = WireReader::new(data);
        let _action_type = reader.read_u16()?;
        let declared = usize::from(reader.read_u16()?);
        if declared > data.len() {
            return Err(ScanError::LengthOverrun {
                offset: 0,
                declared,
                remaining: data.len(),
            }
            .into());
        }
        if declared != TEST_WIRE_LEN {
            return Err(CodecError::BadVendorLength {
                vendor_id: self.vendor_id,
                declared,
                expected: TEST_WIRE_LEN,
            });
        }
        let vendor_id = reader.read_u32()?;
        if vendor_id != self.vendor_id {
            return Err(CodecError::UnknownVendor { vendor_id });
        }
        let subtype = reader.read_u16()?;
        if subtype != TEST_SUBTYPE {
            return Err(CodecError::UnknownVendorSubtype { vendor_id, subtype });
        }
        reader.skip(2)?;
        let word = reader.read_u32()?;
        Ok((
            Box::new(TestRecord {
                vendor_id,
                subtype,
                word,
            }),
            TEST_WIRE_LEN,
        ))
    }

    fn release(&self, record: Box<dyn VendorAction>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        drop(record);
    }

    fn wire_len(&self, _record: &dyn VendorAction) -> usize {
        TEST_WIRE_LEN
    }

    fn describe(&self, record: &dyn VendorAction) -> String {
        match record.as_any().downcast_ref::<TestRecord>() {
            Some(record) => format!(
                "test(vendor=0x{:08x}, word={})",
                record.vendor_id, record.word
            ),
            None => format!("test(vendor=0x{:08x})", record.vendor_id()),
        }
    }
}

/// Serialized form of [`TestRecord::label`], for hand-built buffers.
pub fn encode_test_record(word: u32) -> Vec<u8> {
    let mut out = WireWriter::with_capacity(TEST_WIRE_LEN);
    out.put_u16(wire::ActionType::Experimenter.raw());
    out.put_u16(TEST_WIRE_LEN as u16);
    out.put_u32(TEST_VENDOR_ID);
    out.put_u16(TEST_SUBTYPE);
    out.put_zeros(2);
    out.put_u32(word);
    out.finish()
}
