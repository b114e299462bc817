//! The personal-task REST service: the system of record for non-group tasks,
//! reached by the main app only over HTTP.

pub mod database;
pub mod error;
pub mod handlers;
