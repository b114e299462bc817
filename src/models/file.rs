use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct UserFile {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub file_name: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: i32,
    pub title: String,
    pub file_name: String,
    pub download_url: String,
    pub uploaded_at: DateTime<Utc>,
}
