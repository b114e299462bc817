pub mod client;
pub mod config;
pub mod database;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod otp;
pub mod taskd;
pub mod utils;

pub use database::Database;
