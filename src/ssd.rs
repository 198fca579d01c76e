use alloc::string::{String, ToString};

use log::{debug, trace, warn};

use crate::error::{ErrorKind, ERROR_SENTINEL};
use crate::storage::{LbaId, Storage, MAX_ERASE_LBA, NUM_LBA};
use crate::value::Value;

/// The device itself: validates operands and moves values in and out of the
/// backing [`Storage`].
///
/// Every rejected operation writes [`ERROR_SENTINEL`] to the output channel
/// before returning the error, so a caller that only watches the output still
/// observes the failure.
pub struct Ssd<T: Storage> {
    storage: T,
}

impl<T: Storage> Ssd<T> {
    pub fn new(storage: T) -> Self {
        Ssd { storage }
    }

    /// Fill every slot with [`Value::BLANK`].
    pub fn format(&mut self) {
        let blank = Value::BLANK.to_string();
        for lba in 0..NUM_LBA {
            self.storage.write(LbaId(lba), &blank);
        }
    }

    /// Read and validate the value at `lba`, reporting it on the output channel.
    pub fn read(&mut self, lba: usize) -> Result<Value, ErrorKind> {
        self.check(check_lba(lba))?;
        let text = self.read_raw(lba);
        let value = self.check(Value::parse(&text))?;
        debug!("read lba: {} value: {}", lba, value);
        self.storage.report(&text);
        Ok(value)
    }

    pub fn write(&mut self, lba: usize, value: Value) -> Result<(), ErrorKind> {
        self.check(check_lba(lba))?;
        debug!("write lba: {} value: {}", lba, value);
        self.storage.write(LbaId(lba), &value.to_string());
        Ok(())
    }

    /// Blank `size` blocks starting at `lba`. A size of zero changes nothing.
    pub fn erase(&mut self, lba: usize, size: usize) -> Result<(), ErrorKind> {
        self.check(check_erase(lba, size))?;
        debug!("erase lba: {} size: {}", lba, size);
        let blank = Value::BLANK.to_string();
        for i in lba..lba + size {
            self.storage.write(LbaId(i), &blank);
        }
        Ok(())
    }

    /// Slot text without validation or output, blank when the medium has nothing there.
    pub fn read_raw(&self, lba: usize) -> String {
        match self.storage.read(LbaId(lba)) {
            Some(text) => text,
            None => {
                trace!("lba {} missing from storage, using blank", lba);
                Value::BLANK.to_string()
            }
        }
    }

    pub fn report(&mut self, text: &str) {
        self.storage.report(text);
    }

    pub fn report_error(&mut self, kind: ErrorKind) {
        warn!("rejected: {}", kind);
        self.storage.report(ERROR_SENTINEL);
    }

    pub fn storage(&self) -> &T {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut T {
        &mut self.storage
    }

    fn check<V>(&mut self, result: Result<V, ErrorKind>) -> Result<V, ErrorKind> {
        if let Err(kind) = &result {
            self.report_error(*kind);
        }
        result
    }
}

pub(crate) fn check_lba(lba: usize) -> Result<(), ErrorKind> {
    if lba < NUM_LBA {
        Ok(())
    } else {
        Err(ErrorKind::InvalidLba)
    }
}

pub(crate) fn check_erase(lba: usize, size: usize) -> Result<(), ErrorKind> {
    check_lba(lba)?;
    if size > MAX_ERASE_LBA {
        return Err(ErrorKind::InvalidSize);
    }
    if lba + size > NUM_LBA {
        return Err(ErrorKind::OutOfBounds);
    }
    Ok(())
}
