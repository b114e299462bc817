use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::models::task::{PersonalTask, DEFAULT_OWNER, DEFAULT_TASK_TEXT};
use crate::taskd::database::TaskDb;
use crate::taskd::error::TaskError;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwnerBody {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateTaskBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    priority: Option<bool>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UpdateTaskBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    priority: Option<bool>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    username: Option<String>,
}

/// Dates arrive in one of two textual formats, tried in order.
pub fn parse_task_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

/// Clients send the owner either as a query parameter or inside a JSON body.
fn requested_owner(query: &OwnerQuery, body: &[u8]) -> Option<String> {
    query.username.clone().or_else(|| {
        serde_json::from_slice::<OwnerBody>(body)
            .ok()
            .and_then(|b| b.username)
    })
}

/// A caller-supplied owner that mismatches the stored one is rejected, never
/// treated as not-found.
fn check_owner(task: &PersonalTask, owner: Option<&str>) -> Result<(), TaskError> {
    match owner {
        Some(username) if task.username.as_deref() != Some(username) => {
            Err(TaskError::AccessDenied)
        }
        _ => Ok(()),
    }
}

async fn fetch_task(db: &TaskDb, task_id: i64) -> Result<PersonalTask, TaskError> {
    let task = sqlx::query_as::<_, PersonalTask>(
        "SELECT id, title, task, date, priority, completed, created_at, updated_at, username
         FROM tasks WHERE id = ?",
    )
    .bind(task_id)
    .fetch_optional(&db.pool)
    .await?;

    task.ok_or(TaskError::NotFound)
}

pub async fn list_tasks(
    db: web::Data<TaskDb>,
    query: web::Query<OwnerQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, TaskError> {
    let owner = requested_owner(&query, &body);
    log::info!("GET /tasks - owner filter: {:?}", owner);

    let tasks = match owner {
        Some(username) => {
            sqlx::query_as::<_, PersonalTask>(
                "SELECT id, title, task, date, priority, completed, created_at, updated_at, username
                 FROM tasks WHERE username = ?",
            )
            .bind(username)
            .fetch_all(&db.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, PersonalTask>(
                "SELECT id, title, task, date, priority, completed, created_at, updated_at, username
                 FROM tasks",
            )
            .fetch_all(&db.pool)
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(tasks))
}

pub async fn get_task(
    db: web::Data<TaskDb>,
    path: web::Path<i64>,
    query: web::Query<OwnerQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, TaskError> {
    let task_id = path.into_inner();
    log::info!("GET /tasks/{}", task_id);

    let task = fetch_task(&db, task_id).await?;
    check_owner(&task, requested_owner(&query, &body).as_deref())?;

    Ok(HttpResponse::Ok().json(task))
}

pub async fn create_task(
    db: web::Data<TaskDb>,
    body: web::Bytes,
) -> Result<HttpResponse, TaskError> {
    log::debug!("POST /tasks - {} byte body", body.len());

    let data: CreateTaskBody = serde_json::from_slice(&body)
        .map_err(|_| TaskError::BadRequest("No data received. Send JSON or form data.".to_string()))?;

    let title = match data.title {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(TaskError::BadRequest("Title is required".to_string())),
    };

    let task_text = data.task.unwrap_or_else(|| DEFAULT_TASK_TEXT.to_string());

    let date = match data.date.as_deref() {
        None | Some("") => Utc::now().date_naive(),
        Some(value) => parse_task_date(value).ok_or_else(|| {
            TaskError::BadRequest("Invalid date format. Use YYYY-MM-DD or MM/DD/YYYY".to_string())
        })?,
    };

    let priority = data.priority.unwrap_or(false);
    let completed = data.completed.unwrap_or(false);
    let username = data.username.unwrap_or_else(|| DEFAULT_OWNER.to_string());
    let now = Utc::now().naive_utc();

    let task = sqlx::query_as::<_, PersonalTask>(
        "INSERT INTO tasks (title, task, date, priority, completed, created_at, updated_at, username)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id, title, task, date, priority, completed, created_at, updated_at, username",
    )
    .bind(&title)
    .bind(&task_text)
    .bind(date)
    .bind(priority)
    .bind(completed)
    .bind(now)
    .bind(now)
    .bind(&username)
    .fetch_one(&db.pool)
    .await?;

    log::info!("Task created with ID: {}", task.id);
    Ok(HttpResponse::Created().json(json!({
        "msg": "Task added successfully",
        "task": task
    })))
}

pub async fn update_task(
    db: web::Data<TaskDb>,
    path: web::Path<i64>,
    body: web::Bytes,
) -> Result<HttpResponse, TaskError> {
    let task_id = path.into_inner();
    log::info!("PUT /tasks/{}", task_id);

    // An unparseable body degrades to an empty update rather than an error.
    let data: UpdateTaskBody = serde_json::from_slice(&body).unwrap_or_default();

    let mut task = fetch_task(&db, task_id).await?;
    check_owner(&task, data.username.as_deref())?;

    if let Some(title) = data.title {
        task.title = title;
    }
    if let Some(text) = data.task {
        task.task = Some(text);
    }
    if let Some(value) = data.date {
        task.date = parse_task_date(&value)
            .ok_or_else(|| TaskError::BadRequest("Invalid date format".to_string()))?;
    }
    if let Some(priority) = data.priority {
        task.priority = priority;
    }
    if let Some(completed) = data.completed {
        task.completed = completed;
    }
    task.updated_at = Utc::now().naive_utc();

    sqlx::query(
        "UPDATE tasks SET title = ?, task = ?, date = ?, priority = ?, completed = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&task.title)
    .bind(&task.task)
    .bind(task.date)
    .bind(task.priority)
    .bind(task.completed)
    .bind(task.updated_at)
    .bind(task_id)
    .execute(&db.pool)
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "msg": "Task updated",
        "task": task
    })))
}

pub async fn delete_task(
    db: web::Data<TaskDb>,
    path: web::Path<i64>,
    query: web::Query<OwnerQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, TaskError> {
    let task_id = path.into_inner();
    log::info!("DELETE /tasks/{}", task_id);

    let task = fetch_task(&db, task_id).await?;
    check_owner(&task, requested_owner(&query, &body).as_deref())?;

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task_id)
        .execute(&db.pool)
        .await?;

    log::info!("Task deleted: {}", task_id);
    Ok(HttpResponse::Ok().json(json!({ "msg": "Task deleted" })))
}

pub async fn debug(req: HttpRequest) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "API is running",
        "method": req.method().as_str(),
        "endpoint": req.path(),
    })))
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::delete().to(delete_task)),
    )
    .route("/debug", web::get().to(debug));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_date_formats_resolve_to_the_same_day() {
        let iso = parse_task_date("2024-03-05").unwrap();
        let us = parse_task_date("03/05/2024").unwrap();
        assert_eq!(iso, us);
        assert_eq!(iso, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn unparseable_dates_are_rejected() {
        assert!(parse_task_date("05-03-2024").is_none());
        assert!(parse_task_date("March 5, 2024").is_none());
        assert!(parse_task_date("").is_none());
    }

    fn sample_task(owner: Option<&str>) -> PersonalTask {
        PersonalTask {
            id: 1,
            title: "Buy milk".to_string(),
            task: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            priority: false,
            completed: false,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
            username: owner.map(|s| s.to_string()),
        }
    }

    #[test]
    fn matching_owner_passes_the_check() {
        assert!(check_owner(&sample_task(Some("alice")), Some("alice")).is_ok());
    }

    #[test]
    fn mismatched_owner_is_denied_not_hidden() {
        assert!(matches!(
            check_owner(&sample_task(Some("alice")), Some("bob")),
            Err(TaskError::AccessDenied)
        ));
    }

    #[test]
    fn absent_owner_skips_the_check() {
        assert!(check_owner(&sample_task(Some("alice")), None).is_ok());
    }

    #[test]
    fn ownerless_task_is_denied_to_named_callers() {
        assert!(matches!(
            check_owner(&sample_task(None), Some("alice")),
            Err(TaskError::AccessDenied)
        ));
    }
}
