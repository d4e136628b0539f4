//! The action model: one tagged variant per protocol action kind.

use wire::{
    padded_len, ActionType, ACTION_HEADER_LEN, ACTION_LEN_MIN, MAX_LEN_NO_BUFFER, PORT_CONTROLLER,
};

use crate::error::{CodecError, CodecResult};
use crate::experimenter::{ExperimenterRegistry, VendorAction};
use crate::field::Field;

/// One decoded action.
///
/// Plain variants own nothing beyond their record. `SetField` owns its
/// [`Field`] and, through it, the value and mask buffers. `Experimenter`
/// holds the opaque vendor record; everything about it except the vendor id
/// goes through the registry.
#[derive(Debug)]
pub enum Action {
    Output { port: u32, max_len: u16 },
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl { ttl: u8 },
    DecMplsTtl,
    PushVlan { ethertype: u16 },
    PopVlan,
    PushMpls { ethertype: u16 },
    PopMpls { ethertype: u16 },
    PushPbb { ethertype: u16 },
    PopPbb,
    SetQueue { queue_id: u32 },
    Group { group_id: u32 },
    SetNwTtl { ttl: u8 },
    DecNwTtl,
    SetField(Field),
    Experimenter(Box<dyn VendorAction>),
}

impl Action {
    /// Type code this variant serializes under.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Output { .. } => ActionType::Output,
            Self::CopyTtlOut => ActionType::CopyTtlOut,
            Self::CopyTtlIn => ActionType::CopyTtlIn,
            Self::SetMplsTtl { .. } => ActionType::SetMplsTtl,
            Self::DecMplsTtl => ActionType::DecMplsTtl,
            Self::PushVlan { .. } => ActionType::PushVlan,
            Self::PopVlan => ActionType::PopVlan,
            Self::PushMpls { .. } => ActionType::PushMpls,
            Self::PopMpls { .. } => ActionType::PopMpls,
            Self::PushPbb { .. } => ActionType::PushPbb,
            Self::PopPbb => ActionType::PopPbb,
            Self::SetQueue { .. } => ActionType::SetQueue,
            Self::Group { .. } => ActionType::Group,
            Self::SetNwTtl { .. } => ActionType::SetNwTtl,
            Self::DecNwTtl => ActionType::DecNwTtl,
            Self::SetField(_) => ActionType::SetField,
            Self::Experimenter(_) => ActionType::Experimenter,
        }
    }

    /// Serialized record size in bytes.
    ///
    /// Experimenter sizes come from the owning vendor codec, so an
    /// unregistered vendor fails here the same way it fails to pack.
    pub fn wire_len(&self, registry: Option<&ExperimenterRegistry>) -> CodecResult<usize> {
        match self {
            Self::Output { .. } => Ok(16),
            Self::SetField(field) => Ok(padded_len(ACTION_LEN_MIN + field.oxm_len())),
            Self::Experimenter(record) => {
                let codec = registry.and_then(|r| r.get(record.vendor_id())).ok_or(
                    CodecError::UnknownVendor {
                        vendor_id: record.vendor_id(),
                    },
                )?;
                Ok(codec.wire_len(record.as_ref()))
            }
            Self::CopyTtlOut
            | Self::CopyTtlIn
            | Self::SetMplsTtl { .. }
            | Self::DecMplsTtl
            | Self::PushVlan { .. }
            | Self::PopVlan
            | Self::PushMpls { .. }
            | Self::PopMpls { .. }
            | Self::PushPbb { .. }
            | Self::PopPbb
            | Self::SetQueue { .. }
            | Self::Group { .. }
            | Self::SetNwTtl { .. }
            | Self::DecNwTtl => Ok(ACTION_HEADER_LEN),
        }
    }

    /// Human-readable `kind(field=value, …)` rendering.
    ///
    /// Experimenter records render through the registry; without an entry
    /// the fallback names only the vendor.
    #[must_use]
    pub fn describe(&self, registry: Option<&ExperimenterRegistry>) -> String {
        match self {
            Self::Output { port, max_len } => {
                format!(
                    "output(port={}, max_len={})",
                    describe_port(*port),
                    describe_max_len(*max_len)
                )
            }
            Self::CopyTtlOut => "copy_ttl_out".to_string(),
            Self::CopyTtlIn => "copy_ttl_in".to_string(),
            Self::SetMplsTtl { ttl } => format!("set_mpls_ttl(ttl={ttl})"),
            Self::DecMplsTtl => "dec_mpls_ttl".to_string(),
            Self::PushVlan { ethertype } => format!("push_vlan(ethertype=0x{ethertype:04x})"),
            Self::PopVlan => "pop_vlan".to_string(),
            Self::PushMpls { ethertype } => format!("push_mpls(ethertype=0x{ethertype:04x})"),
            Self::PopMpls { ethertype } => format!("pop_mpls(ethertype=0x{ethertype:04x})"),
            Self::PushPbb { ethertype } => format!("push_pbb(ethertype=0x{ethertype:04x})"),
            Self::PopPbb => "pop_pbb".to_string(),
            Self::SetQueue { queue_id } => format!("set_queue(queue={queue_id})"),
            Self::Group { group_id } => format!("group(group={group_id})"),
            Self::SetNwTtl { ttl } => format!("set_nw_ttl(ttl={ttl})"),
            Self::DecNwTtl => "dec_nw_ttl".to_string(),
            Self::SetField(field) => format!("set_field({field})"),
            Self::Experimenter(record) => {
                match registry.and_then(|r| r.get(record.vendor_id())) {
                    Some(codec) => codec.describe(record.as_ref()),
                    None => format!("experimenter(vendor=0x{:08x})", record.vendor_id()),
                }
            }
        }
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Output { port, max_len },
                Self::Output {
                    port: other_port,
                    max_len: other_max_len,
                },
            ) => port == other_port && max_len == other_max_len,
            (Self::CopyTtlOut, Self::CopyTtlOut)
            | (Self::CopyTtlIn, Self::CopyTtlIn)
            | (Self::DecMplsTtl, Self::DecMplsTtl)
            | (Self::PopVlan, Self::PopVlan)
            | (Self::PopPbb, Self::PopPbb)
            | (Self::DecNwTtl, Self::DecNwTtl) => true,
            (Self::SetMplsTtl { ttl }, Self::SetMplsTtl { ttl: other_ttl })
            | (Self::SetNwTtl { ttl }, Self::SetNwTtl { ttl: other_ttl }) => ttl == other_ttl,
            (Self::PushVlan { ethertype }, Self::PushVlan { ethertype: other })
            | (Self::PushMpls { ethertype }, Self::PushMpls { ethertype: other })
            | (Self::PopMpls { ethertype }, Self::PopMpls { ethertype: other })
            | (Self::PushPbb { ethertype }, Self::PushPbb { ethertype: other }) => {
                ethertype == other
            }
            (Self::SetQueue { queue_id }, Self::SetQueue { queue_id: other }) => queue_id == other,
            (Self::Group { group_id }, Self::Group { group_id: other }) => group_id == other,
            (Self::SetField(field), Self::SetField(other)) => field == other,
            (Self::Experimenter(record), Self::Experimenter(other)) => {
                record.eq_vendor(other.as_ref())
            }
            _ => false,
        }
    }
}

fn describe_port(port: u32) -> String {
    if port == PORT_CONTROLLER {
        "controller".to_string()
    } else {
        port.to_string()
    }
}

fn describe_max_len(max_len: u16) -> String {
    if max_len == MAX_LEN_NO_BUFFER {
        "no_buffer".to_string()
    } else {
        max_len.to_string()
    }
}
