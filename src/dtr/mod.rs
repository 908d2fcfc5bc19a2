//! Daily time records: parsing, import and storage.

pub mod aliases;
pub mod csv;
pub mod import;
pub mod normalizer;
pub mod record;
pub mod store;
pub mod time;
