use alloc::string::ToString;
use alloc::vec::Vec;

use log::{debug, info, warn};

use crate::command::Command;
use crate::error::ErrorKind;
use crate::image::{BufferImage, IMAGE_NUM_ENTRIES};
use crate::policy;
use crate::ssd::{check_erase, check_lba, Ssd};
use crate::storage::{Storage, MAX_ERASE_LBA};
use crate::value::Value;

/// Number of writes and erases held back before they reach the device.
pub const BUFFER_CAPACITY: usize = 5;

/// Write-back buffer in front of an [`Ssd`].
///
/// Writes and erases are queued in submission order and only reach storage on
/// [`CommandBuffer::flush`], which also happens automatically when the queue
/// fills up. Reads are answered from the queue first so a value is visible as
/// soon as it is submitted.
pub struct CommandBuffer<T: Storage> {
    ssd: Ssd<T>,
    queue: Vec<Command>,
    capacity: usize,
}

impl<T: Storage> CommandBuffer<T> {
    pub fn new(ssd: Ssd<T>) -> Self {
        CommandBuffer {
            ssd,
            queue: Vec::with_capacity(BUFFER_CAPACITY),
            capacity: BUFFER_CAPACITY,
        }
    }

    /// Capacity must be between 1 and [`IMAGE_NUM_ENTRIES`] so the queue always fits an image.
    pub fn with_capacity(ssd: Ssd<T>, capacity: usize) -> Result<Self, ErrorKind> {
        if capacity == 0 || capacity > IMAGE_NUM_ENTRIES {
            return Err(ErrorKind::InsufficientSpace);
        }
        Ok(CommandBuffer {
            ssd,
            queue: Vec::with_capacity(capacity),
            capacity,
        })
    }

    /// Queue a write or erase, or answer a read straight away.
    ///
    /// Operands are checked again here since the variants can be built by
    /// hand. A failed capacity flush is returned only after `command` has
    /// been queued.
    pub fn submit(&mut self, command: Command) -> Result<(), ErrorKind> {
        debug!("submit {:?}", command);
        let checked = match command {
            Command::Read { lba } => return self.read(lba).map(|_| ()),
            Command::Write { lba, .. } => check_lba(lba),
            Command::Erase { lba, size } => check_erase(lba, size),
        };
        if let Err(kind) = checked {
            self.ssd.report_error(kind);
            return Err(kind);
        }
        if let Command::Erase { size: 0, .. } = command {
            return Ok(());
        }

        self.queue = policy::coalesce(&self.queue, &command);
        let flushed = if self.queue.len() >= self.capacity {
            info!("buffer full at {} commands, flushing", self.queue.len());
            self.flush()
        } else {
            Ok(())
        };
        if let Err(kind) = flushed {
            warn!("capacity flush failed: {}, still queueing {:?}", kind, command);
        }
        match command {
            Command::Erase { lba, size } => {
                self.queue = policy::merge_erase(&self.queue, lba, size, MAX_ERASE_LBA);
            }
            _ => self.queue.push(command),
        }
        flushed
    }

    /// Read through the buffer and report the result on the output channel.
    pub fn read(&mut self, lba: usize) -> Result<Value, ErrorKind> {
        match self.fast_read(lba) {
            Ok(value) => {
                self.ssd.report(&value.to_string());
                Ok(value)
            }
            Err(kind) => {
                self.ssd.report_error(kind);
                Err(kind)
            }
        }
    }

    /// Value `lba` would hold after a flush, without touching the output channel.
    pub fn fast_read(&self, lba: usize) -> Result<Value, ErrorKind> {
        check_lba(lba)?;
        for cmd in self.queue.iter().rev() {
            match *cmd {
                Command::Write { lba: w, value } if w == lba => {
                    debug!("fast read lba: {} hit buffered write", lba);
                    return Ok(value);
                }
                Command::Erase { .. } if cmd.covers(lba) => {
                    debug!("fast read lba: {} hit buffered erase", lba);
                    return Ok(Value::BLANK);
                }
                _ => {}
            }
        }
        Value::parse(&self.ssd.read_raw(lba))
    }

    /// Run every queued command against storage in order, then empty the queue.
    ///
    /// A failing command does not stop the ones after it; the first error is
    /// returned once all of them ran.
    pub fn flush(&mut self) -> Result<(), ErrorKind> {
        debug!("flushing {} commands", self.queue.len());
        let mut result = Ok(());
        for cmd in self.queue.drain(..) {
            if let Err(kind) = cmd.execute(&mut self.ssd) {
                warn!("{:?} failed during flush: {}", cmd, kind);
                if result.is_ok() {
                    result = Err(kind);
                }
            }
        }
        result
    }

    pub fn commands(&self) -> &[Command] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> Result<BufferImage, ErrorKind> {
        BufferImage::from_commands(&self.queue)
    }

    /// Replace the queue with the commands held in `image`.
    pub fn restore(&mut self, image: &BufferImage) -> Result<(), ErrorKind> {
        let commands = image.to_commands()?;
        if commands.len() > self.capacity {
            return Err(ErrorKind::InsufficientSpace);
        }
        info!("restored {} buffered commands", commands.len());
        self.queue = commands;
        Ok(())
    }

    pub fn ssd(&self) -> &Ssd<T> {
        &self.ssd
    }

    pub fn ssd_mut(&mut self) -> &mut Ssd<T> {
        &mut self.ssd
    }
}
