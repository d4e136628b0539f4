//! Error types for codec operations.

use std::fmt;

use wire::{ActionType, BadActionCode, ErrorCode, ReadError, ScanError, WriteError};

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding, encoding, or registering actions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// List framing error from the scanner.
    Scan(ScanError),

    /// Cursor exhaustion inside a record body.
    Read(ReadError),

    /// Wire emitter error.
    Write(WriteError),

    /// Action type code not recognized.
    UnknownActionType { raw: u16 },

    /// A record's declared length disagrees with its variant's layout.
    BadActionLength {
        action: ActionType,
        declared: usize,
        expected: usize,
    },

    /// Experimenter vendor id not present in the registry.
    UnknownVendor { vendor_id: u32 },

    /// Vendor id recognized but the vendor sub-type is not.
    UnknownVendorSubtype { vendor_id: u32, subtype: u16 },

    /// Vendor record length disagrees with the vendor's wire structure.
    BadVendorLength {
        vendor_id: u32,
        declared: usize,
        expected: usize,
    },

    /// Registration phase saw the same vendor id twice.
    DuplicateVendor { vendor_id: u32 },

    /// Field value does not fit the TLV length octet.
    ValueTooLong { len: usize },

    /// Field id does not fit the 7 bits the TLV packs it into.
    FieldIdOutOfRange { field_id: u8 },

    /// Field mask present but not the same length as the value.
    MaskLengthMismatch { value_len: usize, mask_len: usize },
}

impl CodecError {
    /// Protocol (class, code) pair for a decode-side rejection, or `None`
    /// for conditions that never leave this process (encode-side resource
    /// errors and registration misuse).
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Scan(_) | Self::Read(_) | Self::BadActionLength { .. } | Self::BadVendorLength { .. } => {
                Some(ErrorCode::bad_action(BadActionCode::BadLen))
            }
            Self::UnknownActionType { .. } => Some(ErrorCode::bad_action(BadActionCode::BadType)),
            Self::UnknownVendor { .. } => {
                Some(ErrorCode::bad_action(BadActionCode::BadExperimenter))
            }
            Self::UnknownVendorSubtype { .. } => {
                Some(ErrorCode::bad_action(BadActionCode::BadExpType))
            }
            Self::Write(_)
            | Self::DuplicateVendor { .. }
            | Self::ValueTooLong { .. }
            | Self::FieldIdOutOfRange { .. }
            | Self::MaskLengthMismatch { .. } => None,
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(e) => write!(f, "scan error: {e}"),
            Self::Read(e) => write!(f, "read error: {e}"),
            Self::Write(e) => write!(f, "write error: {e}"),
            Self::UnknownActionType { raw } => {
                write!(f, "unknown action type code {raw}")
            }
            Self::BadActionLength {
                action,
                declared,
                expected,
            } => {
                write!(
                    f,
                    "{action} record declares {declared} bytes, layout requires {expected}"
                )
            }
            Self::UnknownVendor { vendor_id } => {
                write!(f, "experimenter vendor 0x{vendor_id:08x} not registered")
            }
            Self::UnknownVendorSubtype { vendor_id, subtype } => {
                write!(
                    f,
                    "vendor 0x{vendor_id:08x} does not define sub-type {subtype}"
                )
            }
            Self::BadVendorLength {
                vendor_id,
                declared,
                expected,
            } => {
                write!(
                    f,
                    "vendor 0x{vendor_id:08x} record declares {declared} bytes, structure requires {expected}"
                )
            }
            Self::DuplicateVendor { vendor_id } => {
                write!(f, "vendor 0x{vendor_id:08x} registered twice")
            }
            Self::ValueTooLong { len } => {
                write!(f, "field value of {len} bytes overflows the TLV length octet")
            }
            Self::FieldIdOutOfRange { field_id } => {
                write!(f, "field id {field_id} does not fit in 7 bits")
            }
            Self::MaskLengthMismatch {
                value_len,
                mask_len,
            } => {
                write!(
                    f,
                    "field mask of {mask_len} bytes does not match value of {value_len}"
                )
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scan(e) => Some(e),
            Self::Read(e) => Some(e),
            Self::Write(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScanError> for CodecError {
    fn from(err: ScanError) -> Self {
        Self::Scan(err)
    }
}

impl From<ReadError> for CodecError {
    fn from(err: ReadError) -> Self {
        Self::Read(err)
    }
}

impl From<WriteError> for CodecError {
    fn from(err: WriteError) -> Self {
        Self::Write(err)
    }
}
