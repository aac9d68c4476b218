pub mod loader;
pub mod record_store;

pub use loader::{load, parse_load_line};
pub use record_store::{MemoryRecordStore, RecordStore, MAX_VALUE_LENGTH, RECORDS_PER_PAGE};
