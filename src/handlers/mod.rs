pub mod auth;
pub mod file;
pub mod group;
pub mod health;
pub mod task;

pub use auth::auth_config;
pub use file::file_config;
pub use group::group_config;
pub use task::task_config;
