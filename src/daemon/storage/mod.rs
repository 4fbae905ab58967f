//!  Storage is organized through [usage_storage::JsonUsageStorage].
//!  The basic idea is:
//!   - There is one directory with all the documents.
//!   - Totals and the hourly log are rewritten whole on every save.
//!   - Durations are stored as seconds with millisecond precision.

pub mod entities;
pub mod usage_storage;
