//! Extensible-match field TLVs, the payload of the set-field action.

use std::fmt;

use wire::{WireReader, WireWriter};

use crate::error::{CodecError, CodecResult};

/// TLV header size: class + field/hasmask octet + length octet.
pub const OXM_HEADER_LEN: usize = 4;

/// Highest encodable field id; the wire packs the id into 7 bits next to
/// the has-mask flag.
pub const FIELD_ID_MAX: u8 = 0x7f;

/// One extensible-match entry: which packet attribute the set-field action
/// rewrites, and the value (optionally masked) it writes there.
///
/// The field exclusively owns its value and mask buffers; releasing a
/// decoded set-field action drops them in declaration order, value first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Match class the field id is scoped to.
    pub class: u16,
    /// Field id within the class.
    pub field_id: u8,
    /// Value bytes; the TLV length octet counts exactly these.
    pub value: Vec<u8>,
    /// Optional mask of the same length as the value.
    pub mask: Option<Vec<u8>>,
}

impl Field {
    /// Creates an unmasked field.
    #[must_use]
    pub const fn new(class: u16, field_id: u8, value: Vec<u8>) -> Self {
        Self {
            class,
            field_id,
            value,
            mask: None,
        }
    }

    /// Creates a masked field.
    #[must_use]
    pub const fn masked(class: u16, field_id: u8, value: Vec<u8>, mask: Vec<u8>) -> Self {
        Self {
            class,
            field_id,
            value,
            mask: Some(mask),
        }
    }

    /// Returns `true` if a mask accompanies the value.
    #[must_use]
    pub const fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    /// Serialized TLV size in bytes, header included, before any padding.
    #[must_use]
    pub fn oxm_len(&self) -> usize {
        let mask_len = self.mask.as_ref().map_or(0, Vec::len);
        OXM_HEADER_LEN + self.value.len() + mask_len
    }

    /// Checks the field can be represented on the wire.
    pub fn validate(&self) -> CodecResult<()> {
        if self.field_id > FIELD_ID_MAX {
            return Err(CodecError::FieldIdOutOfRange {
                field_id: self.field_id,
            });
        }
        if u8::try_from(self.value.len()).is_err() {
            return Err(CodecError::ValueTooLong {
                len: self.value.len(),
            });
        }
        if let Some(mask) = &self.mask {
            if mask.len() != self.value.len() {
                return Err(CodecError::MaskLengthMismatch {
                    value_len: self.value.len(),
                    mask_len: mask.len(),
                });
            }
        }
        Ok(())
    }

    /// Emits the TLV, unpadded; the action encoder pads the enclosing
    /// record. Returns the bytes written.
    pub fn encode(&self, out: &mut WireWriter) -> CodecResult<usize> {
        self.validate()?;
        out.put_u16(self.class);
        out.put_u8((self.field_id << 1) | u8::from(self.has_mask()));
        // validate() capped the value length at the octet range.
        out.put_u8(self.value.len() as u8);
        out.put_bytes(&self.value);
        if let Some(mask) = &self.mask {
            out.put_bytes(mask);
        }
        Ok(self.oxm_len())
    }

    /// Reads one TLV from the cursor.
    pub fn decode(reader: &mut WireReader<'_>) -> CodecResult<Self> {
        let class = reader.read_u16()?;
        let field_mask = reader.read_u8()?;
        let length = usize::from(reader.read_u8()?);

        let value = reader.read_bytes(length)?.to_vec();
        let mask = if field_mask & 1 == 1 {
            Some(reader.read_bytes(length)?.to_vec())
        } else {
            None
        };

        Ok(Self {
            class,
            field_id: field_mask >> 1,
            value,
            mask,
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oxm(class=0x{:04x}, field={}, value=", self.class, self.field_id)?;
        fmt_bytes(f, &self.value)?;
        if let Some(mask) = &self.mask {
            write!(f, ", mask=")?;
            fmt_bytes(f, mask)?;
        }
        write!(f, ")")
    }
}

/// Renders a byte buffer as `[aa, bb, cc]`.
pub(crate) fn fmt_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "[")?;
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{byte:02x}")?;
    }
    write!(f, "]")
}
