use actix_web::{web, HttpRequest, HttpResponse, Result};

use crate::client::TaskClient;
use crate::config::AppConfig;
use crate::handlers::auth::authenticate;
use crate::models::auth::ApiResponse;
use crate::models::task::{AddTaskRequest, PersonalTask, TaskPayload};
use crate::utils::errors::ServiceError;

// The main app holds no copy of personal tasks; every handler here is a
// one-to-one relay to the task service, scoped to the caller's username.

/// List the caller's personal tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Tasks retrieved", body = ApiResponse<Vec<PersonalTask>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError),
        (status = 500, description = "Task service failure", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_tasks(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    tasks: web::Data<TaskClient>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks");

    let user = authenticate(&req, &config)?;
    let list = tasks.list_tasks(&user.username).await?;

    log::info!("Retrieved {} tasks for {}", list.len(), user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Tasks retrieved successfully", list)))
}

/// Add a personal task
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    request_body = AddTaskRequest,
    responses(
        (status = 201, description = "Task created", body = ApiResponse<PersonalTask>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 500, description = "Task service failure", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn add_task(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    tasks: web::Data<TaskClient>,
    body: web::Json<AddTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/tasks - Adding task: {}", body.title);

    let user = authenticate(&req, &config)?;

    if body.title.trim().is_empty() || body.task.trim().is_empty() || body.date.trim().is_empty() {
        return Err(ServiceError::ValidationError("All fields are required".to_string()));
    }

    let payload = TaskPayload {
        title: body.title.clone(),
        task: body.task.clone(),
        date: body.date.clone(),
        priority: body.priority,
        completed: body.completed,
        username: user.username.clone(),
    };

    let task = tasks.create_task(&payload).await?;

    log::info!("Task created on task service with ID: {}", task.id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Task added successfully", task)))
}

/// Replace a personal task
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Task ID on the task service")
    ),
    request_body = AddTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = ApiResponse<PersonalTask>),
        (status = 403, description = "Not the task owner", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Task not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn update_task(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    tasks: web::Data<TaskClient>,
    path: web::Path<i64>,
    body: web::Json<AddTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("PUT /api/tasks/{}", task_id);

    let user = authenticate(&req, &config)?;

    if body.title.trim().is_empty() || body.task.trim().is_empty() || body.date.trim().is_empty() {
        return Err(ServiceError::ValidationError("All fields are required".to_string()));
    }

    let payload = TaskPayload {
        title: body.title.clone(),
        task: body.task.clone(),
        date: body.date.clone(),
        priority: body.priority,
        completed: body.completed,
        username: user.username.clone(),
    };

    let task = tasks.update_task(task_id, &payload).await?;

    log::info!("Task updated on task service: {}", task_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Task updated successfully", task)))
}

/// Delete a personal task
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i64, Path, description = "Task ID on the task service")
    ),
    responses(
        (status = 200, description = "Task deleted", body = ApiResponse<bool>),
        (status = 403, description = "Not the task owner", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Task not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_task(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    tasks: web::Data<TaskClient>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("DELETE /api/tasks/{}", task_id);

    let user = authenticate(&req, &config)?;
    tasks.delete_task(task_id, &user.username).await?;

    log::info!("Task deleted on task service: {}", task_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Task deleted successfully", true)))
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(add_task))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::delete().to(delete_task)),
    );
}
