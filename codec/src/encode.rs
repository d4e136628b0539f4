//! Encoding: [`Action`] values back into wire records.

use wire::{padded_len, ActionType, WireWriter, ACTION_HEADER_LEN, ACTION_LEN_MIN};

use crate::action::Action;
use crate::error::{CodecError, CodecResult};
use crate::experimenter::ExperimenterRegistry;
use crate::field::Field;

/// Serialize an action list into one contiguous buffer.
///
/// Sizes are computed up front, so an unregistered vendor fails before a
/// single byte is written.
pub fn pack_actions(
    actions: &[Action],
    registry: Option<&ExperimenterRegistry>,
) -> CodecResult<Vec<u8>> {
    let mut capacity = 0;
    for action in actions {
        capacity += action.wire_len(registry)?;
    }
    let mut out = WireWriter::with_capacity(capacity);
    for action in actions {
        pack_action(action, registry, &mut out)?;
    }
    let bytes = out.finish();
    debug_assert_eq!(bytes.len(), capacity);
    Ok(bytes)
}

/// Serialize one action onto `out`, returning the bytes written.
///
/// On error the writer may hold a partial record; callers that reuse the
/// writer across failures must discard it.
pub fn pack_action(
    action: &Action,
    registry: Option<&ExperimenterRegistry>,
    out: &mut WireWriter,
) -> CodecResult<usize> {
    match action {
        Action::Output { port, max_len } => {
            out.put_u16(ActionType::Output.raw());
            out.put_u16(16);
            out.put_u32(*port);
            out.put_u16(*max_len);
            out.put_zeros(6);
            Ok(16)
        }
        Action::CopyTtlOut => pack_header_only(ActionType::CopyTtlOut, out),
        Action::CopyTtlIn => pack_header_only(ActionType::CopyTtlIn, out),
        Action::DecMplsTtl => pack_header_only(ActionType::DecMplsTtl, out),
        Action::PopVlan => pack_header_only(ActionType::PopVlan, out),
        Action::PopPbb => pack_header_only(ActionType::PopPbb, out),
        Action::DecNwTtl => pack_header_only(ActionType::DecNwTtl, out),
        Action::SetMplsTtl { ttl } => pack_u8_body(ActionType::SetMplsTtl, *ttl, out),
        Action::SetNwTtl { ttl } => pack_u8_body(ActionType::SetNwTtl, *ttl, out),
        Action::PushVlan { ethertype } => pack_u16_body(ActionType::PushVlan, *ethertype, out),
        Action::PushMpls { ethertype } => pack_u16_body(ActionType::PushMpls, *ethertype, out),
        Action::PopMpls { ethertype } => pack_u16_body(ActionType::PopMpls, *ethertype, out),
        Action::PushPbb { ethertype } => pack_u16_body(ActionType::PushPbb, *ethertype, out),
        Action::SetQueue { queue_id } => pack_u32_body(ActionType::SetQueue, *queue_id, out),
        Action::Group { group_id } => pack_u32_body(ActionType::Group, *group_id, out),
        Action::SetField(field) => pack_set_field(field, out),
        Action::Experimenter(record) => {
            let vendor_id = record.vendor_id();
            let codec = registry
                .and_then(|r| r.get(vendor_id))
                .ok_or(CodecError::UnknownVendor { vendor_id })?;
            let expected = codec.wire_len(record.as_ref());
            let written = codec.pack(record.as_ref(), out)?;
            if written != expected {
                return Err(CodecError::BadVendorLength {
                    vendor_id,
                    declared: written,
                    expected,
                });
            }
            Ok(written)
        }
    }
}

fn pack_header_only(action_type: ActionType, out: &mut WireWriter) -> CodecResult<usize> {
    out.put_u16(action_type.raw());
    out.put_u16(ACTION_HEADER_LEN as u16);
    out.put_zeros(4);
    Ok(ACTION_HEADER_LEN)
}

fn pack_u8_body(action_type: ActionType, value: u8, out: &mut WireWriter) -> CodecResult<usize> {
    out.put_u16(action_type.raw());
    out.put_u16(ACTION_HEADER_LEN as u16);
    out.put_u8(value);
    out.put_zeros(3);
    Ok(ACTION_HEADER_LEN)
}

fn pack_u16_body(action_type: ActionType, value: u16, out: &mut WireWriter) -> CodecResult<usize> {
    out.put_u16(action_type.raw());
    out.put_u16(ACTION_HEADER_LEN as u16);
    out.put_u16(value);
    out.put_zeros(2);
    Ok(ACTION_HEADER_LEN)
}

fn pack_u32_body(action_type: ActionType, value: u32, out: &mut WireWriter) -> CodecResult<usize> {
    out.put_u16(action_type.raw());
    out.put_u16(ACTION_HEADER_LEN as u16);
    out.put_u32(value);
    Ok(ACTION_HEADER_LEN)
}

fn pack_set_field(field: &Field, out: &mut WireWriter) -> CodecResult<usize> {
    field.validate()?;
    let total = padded_len(ACTION_LEN_MIN + field.oxm_len());
    out.put_u16(ActionType::SetField.raw());
    out.put_len_u16(total)?;
    let tlv = field.encode(out)?;
    // Pad relative to the record, not the buffer: a preceding odd-sized
    // vendor record must not shift this one's layout.
    out.put_zeros(total - ACTION_LEN_MIN - tlv);
    Ok(total)
}
