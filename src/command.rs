use alloc::vec::Vec;
use core::cmp;

use crate::error::ErrorKind;
use crate::ssd::{check_erase, check_lba, Ssd};
use crate::storage::{Storage, MAX_ERASE_LBA, NUM_LBA};
use crate::value::Value;

/// One device operation with operands already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read { lba: usize },
    Write { lba: usize, value: Value },
    Erase { lba: usize, size: usize },
}

impl Command {
    pub fn read(lba: usize) -> Result<Self, ErrorKind> {
        check_lba(lba)?;
        Ok(Command::Read { lba })
    }

    pub fn write(lba: usize, value: Value) -> Result<Self, ErrorKind> {
        check_lba(lba)?;
        Ok(Command::Write { lba, value })
    }

    /// Build a write from the textual value, which must be in canonical form.
    pub fn write_str(lba: usize, value: &str) -> Result<Self, ErrorKind> {
        Command::write(lba, Value::parse(value)?)
    }

    pub fn erase(lba: usize, size: usize) -> Result<Self, ErrorKind> {
        check_erase(lba, size)?;
        Ok(Command::Erase { lba, size })
    }

    /// Split `[start, end)` into erases of at most [`MAX_ERASE_LBA`] blocks.
    pub fn erase_range(start: usize, end: usize) -> Result<Vec<Self>, ErrorKind> {
        check_lba(start)?;
        if end < start {
            return Err(ErrorKind::InvalidSize);
        }
        if end > NUM_LBA {
            return Err(ErrorKind::OutOfBounds);
        }
        Ok(chunks(start, end, MAX_ERASE_LBA))
    }

    pub fn lba(&self) -> usize {
        match *self {
            Command::Read { lba } | Command::Write { lba, .. } | Command::Erase { lba, .. } => lba,
        }
    }

    /// True when executing this command changes the block at `lba`.
    pub fn covers(&self, lba: usize) -> bool {
        match *self {
            Command::Read { .. } => false,
            Command::Write { lba: w, .. } => w == lba,
            Command::Erase { lba: s, size } => s <= lba && lba < s + size,
        }
    }

    pub fn execute<T: Storage>(&self, ssd: &mut Ssd<T>) -> Result<(), ErrorKind> {
        match *self {
            Command::Read { lba } => ssd.read(lba).map(|_| ()),
            Command::Write { lba, value } => ssd.write(lba, value),
            Command::Erase { lba, size } => ssd.erase(lba, size),
        }
    }
}

/// Consecutive erases covering `[start, end)`, each at most `chunk_size` blocks.
pub(crate) fn chunks(start: usize, end: usize, chunk_size: usize) -> Vec<Command> {
    let mut out = Vec::new();
    let mut cur = start;
    while cur < end {
        let size = cmp::min(chunk_size, end - cur);
        out.push(Command::Erase { lba: cur, size });
        cur += size;
    }
    out
}

/// Parse a block address typed by a user.
pub fn parse_lba(text: &str) -> Result<usize, ErrorKind> {
    let lba = parse_int(text).ok_or(ErrorKind::InvalidLba)?;
    if lba < 0 {
        return Err(ErrorKind::InvalidLba);
    }
    let lba = lba as usize;
    check_lba(lba)?;
    Ok(lba)
}

/// Parse an erase size typed by a user. Range checks happen when the command is built.
pub fn parse_size(text: &str) -> Result<usize, ErrorKind> {
    match parse_int(text) {
        Some(size) if size >= 0 => Ok(size as usize),
        _ => Err(ErrorKind::InvalidSize),
    }
}

fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_util::*;

    #[test]
    fn test_constructors_validate() {
        assert_eq!(Command::read(99), Ok(Command::Read { lba: 99 }));
        assert_eq!(Command::read(100), Err(ErrorKind::InvalidLba));
        assert_eq!(Command::write(100, Value(1)), Err(ErrorKind::InvalidLba));
        assert_eq!(
            Command::write_str(1, "0x1"),
            Err(ErrorKind::InvalidValue)
        );
        assert_eq!(
            Command::write_str(1, "0x0000000a"),
            Ok(Command::Write { lba: 1, value: Value(10) })
        );
        assert_eq!(Command::erase(0, 10), Ok(Command::Erase { lba: 0, size: 10 }));
        assert_eq!(Command::erase(0, 0), Ok(Command::Erase { lba: 0, size: 0 }));
        assert_eq!(Command::erase(0, 11), Err(ErrorKind::InvalidSize));
        assert_eq!(Command::erase(98, 3), Err(ErrorKind::OutOfBounds));
    }

    #[test]
    fn test_covers() {
        let erase = Command::Erase { lba: 4, size: 3 };
        assert!(!erase.covers(3));
        assert!(erase.covers(4));
        assert!(erase.covers(6));
        assert!(!erase.covers(7));
        assert!(!Command::Erase { lba: 4, size: 0 }.covers(4));
        assert!(Command::Write { lba: 2, value: Value(0) }.covers(2));
        assert!(!Command::Read { lba: 2 }.covers(2));
    }

    #[test]
    fn test_erase_range_chunks() {
        let cmds = Command::erase_range(3, 28).unwrap();
        assert_eq!(
            cmds,
            vec![
                Command::Erase { lba: 3, size: 10 },
                Command::Erase { lba: 13, size: 10 },
                Command::Erase { lba: 23, size: 5 },
            ]
        );
        assert!(Command::erase_range(5, 5).unwrap().is_empty());
        assert_eq!(Command::erase_range(5, 4), Err(ErrorKind::InvalidSize));
        assert_eq!(Command::erase_range(90, 101), Err(ErrorKind::OutOfBounds));
    }

    #[test]
    fn test_parse_operands() {
        assert_eq!(parse_lba("0"), Ok(0));
        assert_eq!(parse_lba(" 99 "), Ok(99));
        assert_eq!(parse_lba("100"), Err(ErrorKind::InvalidLba));
        assert_eq!(parse_lba("-1"), Err(ErrorKind::InvalidLba));
        assert_eq!(parse_lba("A"), Err(ErrorKind::InvalidLba));
        assert_eq!(parse_lba("0.5"), Err(ErrorKind::InvalidLba));
        assert_eq!(parse_size("10"), Ok(10));
        assert_eq!(parse_size("-2"), Err(ErrorKind::InvalidSize));
        assert_eq!(parse_size("x"), Err(ErrorKind::InvalidSize));
    }

    #[test]
    fn test_execute() {
        init();
        let mut ssd = make_ssd();
        Command::write(8, Value(0xCAFE)).unwrap().execute(&mut ssd).unwrap();
        Command::read(8).unwrap().execute(&mut ssd).unwrap();
        assert_eq!(ssd.storage().last_output(), Some("0x0000CAFE"));
        Command::erase(8, 1).unwrap().execute(&mut ssd).unwrap();
        assert_eq!(ssd.read_raw(8), "0x00000000");
    }
}
