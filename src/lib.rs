//! Light reminder library.
//!
//! Forwards bright ambient-light readings to an HTTP endpoint and reminds the
//! user every two hours to come back to the app.

pub mod config;
pub mod console;
pub mod coordinator;
pub mod error;
pub mod reminder;
pub mod report;
pub mod sensors;
