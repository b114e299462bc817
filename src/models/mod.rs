pub mod auth;
pub mod file;
pub mod group;
pub mod task;
