use crate::storage::{LbaId, Storage, NUM_LBA};
use crate::ssd::Ssd;
use crate::value::Value;

pub(crate) fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory medium that keeps every line written to the output channel.
pub(crate) struct RamStorage {
    slots: Vec<String>,
    output: Vec<String>,
}

impl RamStorage {
    pub(crate) fn new() -> Self {
        RamStorage::with_len(NUM_LBA)
    }

    pub(crate) fn with_len(len: usize) -> Self {
        RamStorage {
            slots: vec![Value::BLANK.to_string(); len],
            output: Vec::new(),
        }
    }

    pub(crate) fn last_output(&self) -> Option<&str> {
        self.output.last().map(|s| s.as_str())
    }
}

impl Storage for RamStorage {
    fn read(&self, lba: LbaId) -> Option<String> {
        self.slots.get(lba.0).cloned()
    }

    fn write(&mut self, lba: LbaId, text: &str) {
        if lba.0 >= self.slots.len() {
            self.slots.resize(lba.0 + 1, Value::BLANK.to_string());
        }
        self.slots[lba.0] = text.to_string();
    }

    fn report(&mut self, text: &str) {
        self.output.push(text.to_string());
    }
}

pub(crate) fn make_ssd() -> Ssd<RamStorage> {
    Ssd::new(RamStorage::new())
}
