use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use vssd::{LbaId, Storage, Value, NUM_LBA};

/// Device slots kept as one `0xHHHHHHHH` line per block in a text file.
///
/// The whole file is loaded on open and written back by [`FileStorage::sync`].
/// Output lines go straight to their own file so each invocation leaves its
/// result behind.
pub(crate) struct FileStorage {
    nand_path: PathBuf,
    output_path: PathBuf,
    slots: Vec<String>,
    fresh: bool,
    dirty: bool,
}

impl FileStorage {
    pub(crate) fn open(nand_path: &Path, output_path: &Path) -> io::Result<Self> {
        let (slots, fresh) = match fs::read_to_string(nand_path) {
            Ok(text) => {
                let slots: Vec<String> = text
                    .lines()
                    .take(NUM_LBA)
                    .map(|line| line.trim().to_string())
                    .collect();
                debug!("loaded {} slots from {}", slots.len(), nand_path.display());
                (slots, false)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("{} not found, starting blank", nand_path.display());
                (Vec::new(), true)
            }
            Err(e) => return Err(e),
        };

        Ok(FileStorage {
            nand_path: nand_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            slots,
            fresh,
            dirty: false,
        })
    }

    /// True when no nand file existed and the device still needs formatting.
    pub(crate) fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub(crate) fn sync(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let mut text = self.slots.join("\n");
        text.push('\n');
        fs::write(&self.nand_path, text)?;
        debug!("wrote {} slots to {}", self.slots.len(), self.nand_path.display());
        self.dirty = false;
        self.fresh = false;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn read(&self, lba: LbaId) -> Option<String> {
        self.slots.get(lba.0).cloned()
    }

    fn write(&mut self, lba: LbaId, text: &str) {
        if lba.0 >= self.slots.len() {
            self.slots.resize(lba.0 + 1, Value::BLANK.to_string());
        }
        self.slots[lba.0] = text.to_string();
        self.dirty = true;
    }

    fn report(&mut self, text: &str) {
        if let Err(e) = fs::write(&self.output_path, text) {
            error!("failed to write {}: {}", self.output_path.display(), e);
        }
    }
}
