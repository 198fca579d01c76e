#![cfg_attr(not(test), no_std)]

//! A simulated block device of 100 logical blocks, each holding one 32-bit
//! value, fronted by a small write-back buffer.
//!
//! [`Ssd`] validates operands and talks to a [`Storage`] medium.
//! [`CommandBuffer`] sits in front of it, holding up to
//! [`BUFFER_CAPACITY`] writes and erases while folding away commands that a
//! later one makes redundant.

extern crate alloc;

mod buffer;
mod command;
mod error;
mod image;
pub mod policy;
mod ssd;
mod storage;
mod value;

#[cfg(test)]
mod tests_util;

pub use buffer::{CommandBuffer, BUFFER_CAPACITY};
pub use command::{parse_lba, parse_size, Command};
pub use error::{ErrorKind, ERROR_SENTINEL};
pub use image::{BufferImage, IMAGE_NUM_ENTRIES};
pub use ssd::Ssd;
pub use storage::{LbaId, Storage, MAX_ERASE_LBA, NUM_LBA};
pub use value::{Value, VALUE_LEN};
