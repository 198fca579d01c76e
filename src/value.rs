use core::fmt;

use crate::error::ErrorKind;

/// Number of characters in a rendered value, `0x` prefix included.
pub const VALUE_LEN: usize = 10;

const HEX_DIGITS: usize = VALUE_LEN - 2;

/// Contents of one logical block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Value(pub u32);

impl Value {
    /// What every block holds after an erase.
    pub const BLANK: Value = Value(0x0000_0000);

    /// Parse the canonical form: `0x` or `0X` followed by exactly eight hex digits.
    pub fn parse(text: &str) -> Result<Self, ErrorKind> {
        if text.len() != VALUE_LEN {
            return Err(ErrorKind::InvalidValue);
        }
        let digits = strip_prefix(text).ok_or(ErrorKind::InvalidValue)?;
        Self::from_digits(digits)
    }

    /// Parse shell input, where the digits may be shorter than eight and are zero padded.
    pub fn parse_loose(text: &str) -> Result<Self, ErrorKind> {
        let digits = text.strip_prefix("0x").ok_or(ErrorKind::InvalidValue)?;
        if digits.is_empty() || digits.len() > HEX_DIGITS {
            return Err(ErrorKind::InvalidValue);
        }
        Self::from_digits(digits)
    }

    fn from_digits(digits: &str) -> Result<Self, ErrorKind> {
        // from_str_radix tolerates a leading sign, so check every byte first.
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ErrorKind::InvalidValue);
        }
        u32::from_str_radix(digits, 16)
            .map(Value)
            .map_err(|_| ErrorKind::InvalidValue)
    }
}

fn strip_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}
