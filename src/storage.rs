use alloc::string::String;

/// Number of logical blocks on the device.
pub const NUM_LBA: usize = 100;

/// Largest number of blocks a single erase may cover.
pub const MAX_ERASE_LBA: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LbaId(pub usize);

/// Backing medium for the device slots.
///
/// Implementations only move text in and out of slots; validation happens in
/// [`crate::Ssd`]. `report` is the output side channel read back by whoever
/// drives the device.
pub trait Storage {
    /// Text stored at `lba`, `None` if the medium has no such slot.
    fn read(&self, lba: LbaId) -> Option<String>;
    fn write(&mut self, lba: LbaId, text: &str);
    fn report(&mut self, text: &str);
}
