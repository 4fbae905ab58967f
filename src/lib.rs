//! Keeps track of how long each application has the focus, split by hour of day, and groups
//! applications into user defined categories. A small daemon samples the focused application and
//! persists the totals; the cli reads them back as daily, weekly and live reports.
//!

pub mod cli;
pub mod daemon;
pub mod fs;
pub mod report;
pub mod tracking;
pub mod utils;
pub mod window_api;
