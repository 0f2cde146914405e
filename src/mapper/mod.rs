//! Record-mapper lifecycle traits
//!
//! The application-facing layer: [`TableMapper`] binds a table to a
//! connection, [`RecordMapper`] drives the single-row fetch/mutate/persist
//! lifecycle, and [`RecordsMapper`] drives the multi-row replace lifecycle.

pub mod record;
pub mod records;
pub mod table;

pub use record::RecordMapper;
pub use records::RecordsMapper;
pub use table::TableMapper;
