use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Placeholder body when a create call omits the task text.
pub const DEFAULT_TASK_TEXT: &str = "No description provided";
/// Placeholder owner when a create call omits the username.
pub const DEFAULT_OWNER: &str = "default_user";

/// A personal task as stored (and served) by the task service. The main app
/// never persists these; it only relays them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct PersonalTask {
    pub id: i64,
    pub title: String,
    pub task: Option<String>,
    pub date: NaiveDate,
    pub priority: bool,
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub username: Option<String>,
}

/// Success envelope the task service wraps a single task in.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskEnvelope {
    pub msg: String,
    pub task: PersonalTask,
}

/// Error shape every task-service failure carries.
#[derive(Debug, Deserialize)]
pub struct TaskErrorBody {
    pub msg: String,
}

/// Body the proxy sends to the task service. `username` is always forced to
/// the authenticated caller before the request leaves the main app.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskPayload {
    pub title: String,
    pub task: String,
    pub date: String,
    pub priority: bool,
    pub completed: bool,
    pub username: String,
}

/// What the main app accepts from its own clients before proxying.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTaskRequest {
    pub title: String,
    pub task: String,
    pub date: String,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub completed: bool,
}
