use core::fmt;

/// Text written to the output channel whenever an operation is rejected.
pub const ERROR_SENTINEL: &str = "ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Address is not an integer in `[0, NUM_LBA)`.
    InvalidLba,
    /// Value is not a `0xHHHHHHHH` hex string.
    InvalidValue,
    /// Erase size is negative, not an integer, or larger than one erase chunk.
    InvalidSize,
    /// Operation would run past the last block of the device.
    OutOfBounds,
    InconsistentState,
    InsufficientSpace,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ErrorKind::InvalidLba => "invalid logical block address",
            ErrorKind::InvalidValue => "invalid block value",
            ErrorKind::InvalidSize => "invalid erase size",
            ErrorKind::OutOfBounds => "range exceeds device",
            ErrorKind::InconsistentState => "inconsistent state",
            ErrorKind::InsufficientSpace => "insufficient space",
        };
        f.write_str(msg)
    }
}
