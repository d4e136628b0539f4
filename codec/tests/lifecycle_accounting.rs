//! Exactly-once accounting for vendor records across decode, release, and
//! the failure paths in between.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use codec::{
    pack_actions, release, release_all, unpack_actions, Action, CodecError, ExperimenterCodec,
    ExperimenterRegistry, Field, VendorAction,
};
use wire::{count_actions, WireReader, WireWriter};

const VENDOR: u32 = 0x0c0f_fee0;
const GOOD_SUBTYPE: u16 = 1;
const WIRE_LEN: usize = 16;

#[derive(Debug)]
struct CountedRecord {
    subtype: u16,
    word: u32,
    dropped: Arc<AtomicUsize>,
}

impl Drop for CountedRecord {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl VendorAction for CountedRecord {
    fn vendor_id(&self) -> u32 {
        VENDOR
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn eq_vendor(&self, other: &dyn VendorAction) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) => other.subtype == self.subtype && other.word == self.word,
            None => false,
        }
    }
}

/// Ledger shared between the codec and the assertions.
#[derive(Clone, Default)]
struct Ledger {
    unpacked: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl Ledger {
    fn counts(&self) -> (usize, usize, usize) {
        (
            self.unpacked.load(Ordering::Relaxed),
            self.released.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
        )
    }
}

struct CountingCodec {
    ledger: Ledger,
    /// When set, `unpack` reports one byte fewer than it consumed, which
    /// the decoder must treat as a vendor bug and reject.
    misreport_consumed: bool,
}

impl CountingCodec {
    fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            misreport_consumed: false,
        }
    }
}

impl ExperimenterCodec for CountingCodec {
    fn vendor_id(&self) -> u32 {
        VENDOR
    }

    fn pack(
        &self,
        record: &dyn VendorAction,
        out: &mut WireWriter,
    ) -> Result<usize, CodecError> {
        let record = record.as_any().downcast_ref::<CountedRecord>().ok_or(
            CodecError::UnknownVendor {
                vendor_id: record.vendor_id(),
            },
        )?;
        out.put_u16(0xffff);
        out.put_u16(WIRE_LEN as u16);
        out.put_u32(VENDOR);
        out.put_u16(record.subtype);
        out.put_zeros(2);
        out.put_u32(record.word);
        Ok(WIRE_LEN)
    }

    fn unpack(&self, data: &[u8]) -> Result<(Box<dyn VendorAction>, usize), CodecError> {
        let mut reader = WireReader::new(data);
        reader.skip(4)?;
        let vendor_id = reader.read_u32()?;
        let subtype = reader.read_u16()?;
        if subtype != GOOD_SUBTYPE {
            return Err(CodecError::UnknownVendorSubtype { vendor_id, subtype });
        }
        reader.skip(2)?;
        let word = reader.read_u32()?;
        self.ledger.unpacked.fetch_add(1, Ordering::Relaxed);
        let record = CountedRecord {
            subtype,
            word,
            dropped: Arc::clone(&self.ledger.dropped),
        };
        let consumed = if self.misreport_consumed {
            WIRE_LEN - 1
        } else {
            WIRE_LEN
        };
        Ok((Box::new(record), consumed))
    }

    fn release(&self, record: Box<dyn VendorAction>) {
        self.ledger.released.fetch_add(1, Ordering::Relaxed);
        drop(record);
    }

    fn wire_len(&self, _record: &dyn VendorAction) -> usize {
        WIRE_LEN
    }

    fn describe(&self, _record: &dyn VendorAction) -> String {
        format!("experimenter(vendor=0x{VENDOR:08x})")
    }
}

fn vendor_record(subtype: u16, word: u32) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_u16(0xffff);
    w.put_u16(WIRE_LEN as u16);
    w.put_u32(VENDOR);
    w.put_u16(subtype);
    w.put_zeros(2);
    w.put_u32(word);
    w.finish()
}

fn plain_record() -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_u16(0x0012); // pop_vlan
    w.put_u16(8);
    w.put_zeros(4);
    w.finish()
}

fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.iter().flatten().copied().collect()
}

#[test]
fn accounting_balances_on_the_happy_path() {
    let ledger = Ledger::default();
    let mut registry = ExperimenterRegistry::new();
    registry
        .register(Box::new(CountingCodec::new(ledger.clone())))
        .unwrap();

    let buf = concat(&[
        vendor_record(GOOD_SUBTYPE, 1),
        plain_record(),
        vendor_record(GOOD_SUBTYPE, 2),
        vendor_record(GOOD_SUBTYPE, 3),
    ]);

    let actions = unpack_actions(&buf, Some(&registry)).unwrap();
    assert_eq!(actions.len(), 4);
    assert_eq!(ledger.counts(), (3, 0, 0));

    release_all(actions, Some(&registry));
    assert_eq!(ledger.counts(), (3, 3, 3));
}

#[test]
fn accounting_balances_when_a_later_record_is_rejected() {
    let ledger = Ledger::default();
    let mut registry = ExperimenterRegistry::new();
    registry
        .register(Box::new(CountingCodec::new(ledger.clone())))
        .unwrap();

    let buf = concat(&[
        vendor_record(GOOD_SUBTYPE, 1),
        vendor_record(GOOD_SUBTYPE, 2),
        vendor_record(0x77, 3),
    ]);

    let err = unpack_actions(&buf, Some(&registry)).unwrap_err();
    assert_eq!(
        err,
        CodecError::UnknownVendorSubtype {
            vendor_id: VENDOR,
            subtype: 0x77,
        }
    );
    // The two decoded records went back through the codec; nothing is
    // still alive.
    assert_eq!(ledger.counts(), (2, 2, 2));
}

#[test]
fn accounting_balances_when_the_codec_misreports_consumed_bytes() {
    let ledger = Ledger::default();
    let mut registry = ExperimenterRegistry::new();
    let mut codec = CountingCodec::new(ledger.clone());
    codec.misreport_consumed = true;
    registry.register(Box::new(codec)).unwrap();

    let buf = vendor_record(GOOD_SUBTYPE, 9);
    let err = unpack_actions(&buf, Some(&registry)).unwrap_err();
    assert_eq!(
        err,
        CodecError::BadVendorLength {
            vendor_id: VENDOR,
            declared: WIRE_LEN,
            expected: WIRE_LEN - 1,
        }
    );
    // The record the codec produced was released, not leaked.
    assert_eq!(ledger.counts(), (1, 1, 1));
}

#[test]
fn release_without_a_registry_still_frees_memory() {
    let ledger = Ledger::default();
    let mut registry = ExperimenterRegistry::new();
    registry
        .register(Box::new(CountingCodec::new(ledger.clone())))
        .unwrap();

    let buf = vendor_record(GOOD_SUBTYPE, 4);
    let actions = unpack_actions(&buf, Some(&registry)).unwrap();

    // Dropping through the fallback path skips the codec hook but still
    // runs the record's own drop.
    release_all(actions, None);
    assert_eq!(ledger.counts(), (1, 0, 1));
}

#[test]
fn plain_lists_never_touch_the_vendor_codec() {
    let ledger = Ledger::default();
    let mut registry = ExperimenterRegistry::new();
    registry
        .register(Box::new(CountingCodec::new(ledger.clone())))
        .unwrap();

    // output(port=1, max_len=64) followed by set_field(class 0, field 0,
    // value aa bb cc dd), the TLV padded from 12 to 16.
    let mut w = WireWriter::new();
    w.put_u16(0x0000);
    w.put_u16(16);
    w.put_u32(1);
    w.put_u16(64);
    w.put_zeros(6);
    w.put_u16(0x0019);
    w.put_u16(16);
    w.put_u16(0x0000);
    w.put_u8(0x00);
    w.put_u8(4);
    w.put_bytes(&[0xaa, 0xbb, 0xcc, 0xdd]);
    w.put_zeros(4);
    let buf = w.finish();

    assert_eq!(count_actions(&buf).unwrap(), 2);
    let actions = unpack_actions(&buf, Some(&registry)).unwrap();
    assert_eq!(actions[0], Action::Output { port: 1, max_len: 64 });
    assert_eq!(
        actions[1],
        Action::SetField(Field::new(0x0000, 0, vec![0xaa, 0xbb, 0xcc, 0xdd]))
    );

    release_all(actions, Some(&registry));
    assert_eq!(ledger.counts(), (0, 0, 0));
}

#[test]
fn double_roundtrip_keeps_the_ledger_balanced() {
    let ledger = Ledger::default();
    let mut registry = ExperimenterRegistry::new();
    registry
        .register(Box::new(CountingCodec::new(ledger.clone())))
        .unwrap();

    let action = Action::Experimenter(Box::new(CountedRecord {
        subtype: GOOD_SUBTYPE,
        word: 31,
        dropped: Arc::clone(&ledger.dropped),
    }));
    let buf = pack_actions(std::slice::from_ref(&action), Some(&registry)).unwrap();
    let decoded = unpack_actions(&buf, Some(&registry)).unwrap();
    assert_eq!(decoded[0], action);

    release_all(decoded, Some(&registry));
    release(action, Some(&registry));
    assert_eq!(ledger.counts(), (1, 2, 2));
}
