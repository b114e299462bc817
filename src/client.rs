use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::models::task::{PersonalTask, TaskEnvelope, TaskErrorBody, TaskPayload};

/// Typed outcome of a call to the task service. The proxy never retries; it
/// only reports which of these happened.
#[derive(Debug, Error)]
pub enum TaskApiError {
    #[error("task not found")]
    NotFound,
    #[error("access denied")]
    Forbidden,
    #[error("task service error: {0}")]
    Api(String),
    #[error("task service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// HTTP client for the personal-task service. Every call is scoped to one
/// username and carries the configured timeout.
pub struct TaskClient {
    http: reqwest::Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TaskApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(TaskClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn list_tasks(&self, username: &str) -> Result<Vec<PersonalTask>, TaskApiError> {
        let response = self
            .http
            .get(format!("{}/tasks", self.base_url))
            .query(&[("username", username)])
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn create_task(&self, payload: &TaskPayload) -> Result<PersonalTask, TaskApiError> {
        let response = self
            .http
            .post(format!("{}/tasks", self.base_url))
            .json(payload)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let envelope: TaskEnvelope = response.json().await?;
        Ok(envelope.task)
    }

    pub async fn update_task(
        &self,
        task_id: i64,
        payload: &TaskPayload,
    ) -> Result<PersonalTask, TaskApiError> {
        let response = self
            .http
            .put(format!("{}/tasks/{}", self.base_url, task_id))
            .json(payload)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let envelope: TaskEnvelope = response.json().await?;
        Ok(envelope.task)
    }

    pub async fn delete_task(&self, task_id: i64, username: &str) -> Result<(), TaskApiError> {
        let response = self
            .http
            .delete(format!("{}/tasks/{}", self.base_url, task_id))
            .query(&[("username", username)])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TaskApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let msg = response
            .json::<TaskErrorBody>()
            .await
            .map(|body| body.msg)
            .unwrap_or_else(|_| status.to_string());
        Err(Self::status_error(status, msg))
    }

    fn status_error(status: StatusCode, msg: String) -> TaskApiError {
        match status {
            StatusCode::NOT_FOUND => TaskApiError::NotFound,
            StatusCode::FORBIDDEN => TaskApiError::Forbidden,
            _ => TaskApiError::Api(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_task_maps_to_not_found() {
        assert!(matches!(
            TaskClient::status_error(StatusCode::NOT_FOUND, "Task not found".to_string()),
            TaskApiError::NotFound
        ));
    }

    #[test]
    fn ownership_mismatch_maps_to_forbidden() {
        assert!(matches!(
            TaskClient::status_error(StatusCode::FORBIDDEN, "Access denied".to_string()),
            TaskApiError::Forbidden
        ));
    }

    #[test]
    fn other_statuses_keep_the_service_message() {
        match TaskClient::status_error(StatusCode::BAD_REQUEST, "Title is required".to_string()) {
            TaskApiError::Api(msg) => assert_eq!(msg, "Title is required"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
