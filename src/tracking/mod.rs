//! Core of the tracker. Foreground samples become sessions, sessions are split into hourly
//! [splitter::Segment]s, and segments are committed to [state::UsageState], which keeps
//!   - a total per application,
//!   - a total per category,
//!   - a per date, per hour, per application log.
//!
//! [store::UsageStore] wraps the state in a mutex for sharing between the tracker loop and
//! readers. Categories are never written to the hourly log, reports resolve them from the current
//! application records, so renaming or deleting a category changes how history is reported.

pub mod categories;
pub mod error;
pub mod session;
pub mod splitter;
pub mod state;
pub mod store;
