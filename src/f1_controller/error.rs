use thiserror::Error;

use super::controls::ButtonId;

/// Reasons an input report is rejected. None of its fields are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input report too short: got {len} bytes, expected {expected}")]
    TooShort { len: usize, expected: usize },
    #[error("unexpected report id 0x{found:02x} (expected 0x{expected:02x})")]
    BadReportId { found: u8, expected: u8 },
}

#[derive(Debug, Error)]
pub enum F1Error {
    #[error("no Traktor Kontrol F1 found (vendor 0x{vendor_id:04x}, product 0x{product_id:04x})")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
    #[error("malformed input report: {0}")]
    Malformed(#[from] DecodeError),
    #[error("{control} index {index} out of range (max {max})")]
    OutOfRange {
        control: &'static str,
        index: usize,
        max: usize,
    },
    #[error("{0:?} has no single-brightness LED")]
    NoLed(ButtonId),
    #[error("partial LED report written: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, F1Error>;
