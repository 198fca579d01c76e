//! Fixed-layout binary image of the command buffer, so buffered commands
//! survive between separate runs of the device.

use alloc::vec::Vec;
use core::mem::size_of;

use log::error;
use zerocopy::{AsBytes, FromBytes};

use crate::command::Command;
use crate::error::ErrorKind;
use crate::value::Value;

pub const IMAGE_NUM_ENTRIES: usize = 16;

const IMAGE_VERSION: u32 = 0;

const ENTRY_EMPTY: u32 = 0;
const ENTRY_WRITE: u32 = 1;
const ENTRY_ERASE: u32 = 2;

#[derive(Debug, AsBytes, FromBytes, PartialEq, Eq, Clone, Copy)]
#[repr(C)]
pub(crate) struct ImageMagic(pub(crate) [u8; 4]);

const BUFFER_IMAGE_MAGIC: ImageMagic = ImageMagic(*b"BUFR");

#[derive(Debug, AsBytes, FromBytes, PartialEq, Eq, Clone, Copy)]
#[repr(C)]
pub(crate) struct Crc(pub(crate) u32);

const CRC_INIT: Crc = Crc(0x00000000);

const CRC: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_CKSUM);

#[derive(Debug, AsBytes, FromBytes, PartialEq, Eq, Clone, Copy)]
#[repr(C)]
struct ImageEntry {
    kind: u32,
    lba: u32,
    /// Value for a write, size for an erase.
    arg: u32,
}

const ENTRY_NULL: ImageEntry = ImageEntry {
    kind: ENTRY_EMPTY,
    lba: 0,
    arg: 0,
};

#[derive(Debug, AsBytes, FromBytes, Clone)]
#[repr(C)]
pub struct BufferImage {
    magic: ImageMagic,
    crc: Crc,
    version: u32,
    count: u32,
    entries: [ImageEntry; IMAGE_NUM_ENTRIES],
}

impl Default for BufferImage {
    fn default() -> Self {
        let mut image = BufferImage {
            magic: BUFFER_IMAGE_MAGIC,
            crc: CRC_INIT,
            version: IMAGE_VERSION,
            count: 0,
            entries: [ENTRY_NULL; IMAGE_NUM_ENTRIES],
        };
        image.fix_crc();
        image
    }
}

impl TryFrom<&[u8]> for BufferImage {
    type Error = ErrorKind;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != size_of::<BufferImage>() {
            error!(
                "buffer image is {} bytes, expected {}",
                bytes.len(),
                size_of::<BufferImage>()
            );
            return Err(ErrorKind::InconsistentState);
        }

        // Copy rather than borrow in place, file contents carry no alignment guarantee.
        let mut image = BufferImage::default();
        image.as_bytes_mut().copy_from_slice(bytes);

        if image.magic != BUFFER_IMAGE_MAGIC || image.version != IMAGE_VERSION {
            error!("buffer image has bad magic or version.");
            return Err(ErrorKind::InconsistentState);
        }
        if !image.crc_ok() {
            error!("buffer image crc mismatch.");
            return Err(ErrorKind::InconsistentState);
        }
        if image.count as usize > IMAGE_NUM_ENTRIES {
            error!("buffer image claims {} entries.", image.count);
            return Err(ErrorKind::InconsistentState);
        }
        Ok(image)
    }
}

impl BufferImage {
    pub fn from_commands(commands: &[Command]) -> Result<Self, ErrorKind> {
        if commands.len() > IMAGE_NUM_ENTRIES {
            return Err(ErrorKind::InsufficientSpace);
        }

        let mut image = BufferImage::default();
        for (slot, cmd) in image.entries.iter_mut().zip(commands) {
            *slot = match *cmd {
                Command::Write { lba, value } => ImageEntry {
                    kind: ENTRY_WRITE,
                    lba: lba as u32,
                    arg: value.0,
                },
                Command::Erase { lba, size } => ImageEntry {
                    kind: ENTRY_ERASE,
                    lba: lba as u32,
                    arg: size as u32,
                },
                Command::Read { .. } => return Err(ErrorKind::InconsistentState),
            };
        }
        image.count = commands.len() as u32;
        image.fix_crc();
        Ok(image)
    }

    /// Commands held by the image, each one validated again.
    pub fn to_commands(&self) -> Result<Vec<Command>, ErrorKind> {
        self.entries[..self.count as usize]
            .iter()
            .map(|entry| match entry.kind {
                ENTRY_WRITE => Command::write(entry.lba as usize, Value(entry.arg)),
                ENTRY_ERASE => Command::erase(entry.lba as usize, entry.arg as usize),
                kind => {
                    error!("unknown buffer image entry kind {}", kind);
                    Err(ErrorKind::InconsistentState)
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn bytes(&self) -> &[u8] {
        self.as_bytes()
    }

    fn fix_crc(&mut self) {
        self.crc = CRC_INIT;
        self.crc = Crc(CRC.checksum(self.as_bytes()));
    }

    fn crc_ok(&self) -> bool {
        let mut copy = self.clone();
        copy.fix_crc();
        copy.crc == self.crc
    }
}
