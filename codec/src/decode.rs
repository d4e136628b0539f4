//! Decoding: validated raw records into [`Action`] values.

use tracing::warn;
use wire::{
    padded_len, split_actions, ActionType, RawActionHeader, ScanError, WireReader,
    ACTION_HEADER_LEN, ACTION_LEN_MIN,
};

use crate::action::Action;
use crate::error::{CodecError, CodecResult};
use crate::experimenter::ExperimenterRegistry;
use crate::field::Field;
use crate::lifecycle;

/// Decode every record in `buf` into an action list.
///
/// The buffer must frame cleanly under [`wire::split_actions`]; any scan
/// error propagates untouched. When a record fails mid-list, the prefix
/// decoded so far is released through `registry` before the error returns,
/// so no vendor record escapes its codec's accounting.
pub fn unpack_actions(
    buf: &[u8],
    registry: Option<&ExperimenterRegistry>,
) -> CodecResult<Vec<Action>> {
    let records = split_actions(buf)?;
    let mut actions = Vec::with_capacity(records.len());
    for raw in &records {
        match unpack_record(raw.header, raw.data, registry) {
            Ok(action) => actions.push(action),
            Err(err) => {
                warn!(offset = raw.offset, error = %err, "rejected action record");
                lifecycle::release_all(actions, registry);
                return Err(err);
            }
        }
    }
    Ok(actions)
}

/// Decode the first record in `buf`, returning the action and its
/// serialized size.
pub fn unpack_action(
    buf: &[u8],
    registry: Option<&ExperimenterRegistry>,
) -> CodecResult<(Action, usize)> {
    let header = RawActionHeader::read_from(buf)?;
    let declared = header.declared_len();
    if declared < ACTION_LEN_MIN {
        return Err(ScanError::LengthUnderrun {
            offset: 0,
            declared,
        }
        .into());
    }
    if declared > buf.len() {
        return Err(ScanError::LengthOverrun {
            offset: 0,
            declared,
            remaining: buf.len(),
        }
        .into());
    }
    let action = unpack_record(header, &buf[..declared], registry)?;
    Ok((action, declared))
}

fn unpack_record(
    header: RawActionHeader,
    data: &[u8],
    registry: Option<&ExperimenterRegistry>,
) -> CodecResult<Action> {
    let action_type = ActionType::parse(header.action_type).ok_or(
        CodecError::UnknownActionType {
            raw: header.action_type,
        },
    )?;

    match action_type {
        ActionType::Output => {
            expect_len(action_type, header, 16)?;
            let mut reader = record_reader(data)?;
            let port = reader.read_u32()?;
            let max_len = reader.read_u16()?;
            Ok(Action::Output { port, max_len })
        }
        ActionType::CopyTtlOut => header_only(action_type, header, Action::CopyTtlOut),
        ActionType::CopyTtlIn => header_only(action_type, header, Action::CopyTtlIn),
        ActionType::DecMplsTtl => header_only(action_type, header, Action::DecMplsTtl),
        ActionType::PopVlan => header_only(action_type, header, Action::PopVlan),
        ActionType::PopPbb => header_only(action_type, header, Action::PopPbb),
        ActionType::DecNwTtl => header_only(action_type, header, Action::DecNwTtl),
        ActionType::SetMplsTtl => {
            let ttl = unpack_u8_body(action_type, header, data)?;
            Ok(Action::SetMplsTtl { ttl })
        }
        ActionType::SetNwTtl => {
            let ttl = unpack_u8_body(action_type, header, data)?;
            Ok(Action::SetNwTtl { ttl })
        }
        ActionType::PushVlan => {
            let ethertype = unpack_u16_body(action_type, header, data)?;
            Ok(Action::PushVlan { ethertype })
        }
        ActionType::PushMpls => {
            let ethertype = unpack_u16_body(action_type, header, data)?;
            Ok(Action::PushMpls { ethertype })
        }
        ActionType::PopMpls => {
            let ethertype = unpack_u16_body(action_type, header, data)?;
            Ok(Action::PopMpls { ethertype })
        }
        ActionType::PushPbb => {
            let ethertype = unpack_u16_body(action_type, header, data)?;
            Ok(Action::PushPbb { ethertype })
        }
        ActionType::SetQueue => {
            let queue_id = unpack_u32_body(action_type, header, data)?;
            Ok(Action::SetQueue { queue_id })
        }
        ActionType::Group => {
            let group_id = unpack_u32_body(action_type, header, data)?;
            Ok(Action::Group { group_id })
        }
        ActionType::SetField => unpack_set_field(header, data),
        ActionType::Experimenter => unpack_experimenter(header, data, registry),
    }
}

fn unpack_set_field(header: RawActionHeader, data: &[u8]) -> CodecResult<Action> {
    let declared = header.declared_len();
    if declared < ACTION_HEADER_LEN {
        return Err(CodecError::BadActionLength {
            action: ActionType::SetField,
            declared,
            expected: ACTION_HEADER_LEN,
        });
    }
    let mut reader = record_reader(data)?;
    let field = Field::decode(&mut reader)?;
    // The declared length carries the TLV plus its alignment pad, nothing
    // more and nothing less.
    let expected = padded_len(ACTION_LEN_MIN + field.oxm_len());
    if declared != expected {
        return Err(CodecError::BadActionLength {
            action: ActionType::SetField,
            declared,
            expected,
        });
    }
    Ok(Action::SetField(field))
}

fn unpack_experimenter(
    header: RawActionHeader,
    data: &[u8],
    registry: Option<&ExperimenterRegistry>,
) -> CodecResult<Action> {
    let declared = header.declared_len();
    if declared < ACTION_HEADER_LEN {
        return Err(CodecError::BadActionLength {
            action: ActionType::Experimenter,
            declared,
            expected: ACTION_HEADER_LEN,
        });
    }
    let mut reader = record_reader(data)?;
    let vendor_id = reader.read_u32()?;
    let codec = registry
        .and_then(|r| r.get(vendor_id))
        .ok_or(CodecError::UnknownVendor { vendor_id })?;
    // The vendor codec sees the whole record, header included, and must
    // account for every declared byte.
    let (record, consumed) = codec.unpack(data)?;
    if consumed != declared {
        let err = CodecError::BadVendorLength {
            vendor_id,
            declared,
            expected: consumed,
        };
        codec.release(record);
        return Err(err);
    }
    Ok(Action::Experimenter(record))
}

/// Reader positioned past the type and length fields, which the caller
/// already holds in `header`.
fn record_reader(data: &[u8]) -> CodecResult<WireReader<'_>> {
    let mut reader = WireReader::new(data);
    reader.skip(2 + 2)?;
    Ok(reader)
}

fn header_only(
    action_type: ActionType,
    header: RawActionHeader,
    action: Action,
) -> CodecResult<Action> {
    expect_len(action_type, header, ACTION_HEADER_LEN)?;
    Ok(action)
}

fn unpack_u8_body(
    action_type: ActionType,
    header: RawActionHeader,
    data: &[u8],
) -> CodecResult<u8> {
    expect_len(action_type, header, ACTION_HEADER_LEN)?;
    let mut reader = record_reader(data)?;
    Ok(reader.read_u8()?)
}

fn unpack_u16_body(
    action_type: ActionType,
    header: RawActionHeader,
    data: &[u8],
) -> CodecResult<u16> {
    expect_len(action_type, header, ACTION_HEADER_LEN)?;
    let mut reader = record_reader(data)?;
    Ok(reader.read_u16()?)
}

fn unpack_u32_body(
    action_type: ActionType,
    header: RawActionHeader,
    data: &[u8],
) -> CodecResult<u32> {
    expect_len(action_type, header, ACTION_HEADER_LEN)?;
    let mut reader = record_reader(data)?;
    Ok(reader.read_u32()?)
}

fn expect_len(action_type: ActionType, header: RawActionHeader, expected: usize) -> CodecResult<()> {
    let declared = header.declared_len();
    if declared == expected {
        Ok(())
    } else {
        Err(CodecError::BadActionLength {
            action: action_type,
            declared,
            expected,
        })
    }
}
