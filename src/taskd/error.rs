use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Task-service failures. The wire contract puts a `msg` field on every error
/// body, so this type renders its own JSON instead of the main app's shape.
#[derive(Debug)]
pub enum TaskError {
    NotFound,
    AccessDenied,
    BadRequest(String),
    Database(String),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::NotFound => write!(f, "Task not found"),
            TaskError::AccessDenied => write!(f, "Access denied"),
            TaskError::BadRequest(msg) => write!(f, "{}", msg),
            TaskError::Database(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl ResponseError for TaskError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({ "msg": self.to_string() });
        match self {
            TaskError::NotFound => HttpResponse::NotFound().json(body),
            TaskError::AccessDenied => HttpResponse::Forbidden().json(body),
            TaskError::BadRequest(msg) => {
                log::warn!("Bad request: {}", msg);
                HttpResponse::BadRequest().json(body)
            }
            TaskError::Database(msg) => {
                log::error!("Database error: {}", msg);
                HttpResponse::InternalServerError().json(body)
            }
        }
    }
}

impl From<sqlx::Error> for TaskError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => TaskError::NotFound,
            _ => TaskError::Database(err.to_string()),
        }
    }
}
