use actix_web::{web, HttpRequest, HttpResponse, Result};
use sqlx::Row;

use crate::config::AppConfig;
use crate::handlers::auth::{authenticate, AuthedUser};
use crate::models::auth::ApiResponse;
use crate::models::group::{
    parse_allowed_emails, should_promote_to_member, user_has_access, CreateGroupRequest,
    CreateGroupTaskRequest, GroupDetailResponse, GroupSummary, GroupTaskResponse,
    UpdatePriorityRequest,
};
use crate::utils::errors::ServiceError;
use crate::Database;

struct GroupRow {
    id: i32,
    name: String,
    creator_id: i32,
    creator: String,
    allowed_emails: String,
}

async fn load_group(db: &Database, group_id: i32) -> Result<GroupRow, ServiceError> {
    let row = sqlx::query(
        "SELECT g.id, g.name, g.creator_id, g.allowed_emails, u.username AS creator
         FROM groups g
         JOIN users u ON u.id = g.creator_id
         WHERE g.id = $1",
    )
    .bind(group_id)
    .fetch_optional(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching group: {}", e);
        ServiceError::DatabaseError("Failed to fetch group".to_string())
    })?;

    let row = row.ok_or_else(|| ServiceError::NotFound("Group not found".to_string()))?;
    Ok(GroupRow {
        id: row.get("id"),
        name: row.get("name"),
        creator_id: row.get("creator_id"),
        creator: row.get("creator"),
        allowed_emails: row.get("allowed_emails"),
    })
}

async fn load_member_ids(db: &Database, group_id: i32) -> Result<Vec<i32>, ServiceError> {
    let rows = sqlx::query("SELECT user_id FROM group_members WHERE group_id = $1")
        .bind(group_id)
        .fetch_all(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error fetching group members: {}", e);
            ServiceError::DatabaseError("Failed to fetch group members".to_string())
        })?;
    Ok(rows.iter().map(|row| row.get("user_id")).collect())
}

/// Loads the group and rejects callers outside creator/member/allow-list.
async fn load_group_for_access(
    db: &Database,
    group_id: i32,
    user: &AuthedUser,
) -> Result<(GroupRow, Vec<i32>), ServiceError> {
    let group = load_group(db, group_id).await?;
    let member_ids = load_member_ids(db, group_id).await?;

    if !user_has_access(user.id, &user.email, group.creator_id, &member_ids, &group.allowed_emails)
    {
        log::warn!("User {} denied access to group {}", user.username, group_id);
        return Err(ServiceError::Forbidden("You do not have access to this group".to_string()));
    }

    Ok((group, member_ids))
}

/// Groups the user can open: created, joined, or allow-listed by email. Shared
/// with the user-details endpoint.
pub(crate) async fn accessible_groups(
    db: &Database,
    user: &AuthedUser,
) -> Result<Vec<GroupSummary>, ServiceError> {
    // ILIKE narrows the candidate set; the parsed allow-list decides.
    let rows = sqlx::query(
        "SELECT DISTINCT g.id, g.name, g.creator_id, g.allowed_emails, u.username AS creator,
                EXISTS(SELECT 1 FROM group_members gm
                       WHERE gm.group_id = g.id AND gm.user_id = $1) AS is_member
         FROM groups g
         JOIN users u ON u.id = g.creator_id
         WHERE g.creator_id = $1
            OR EXISTS(SELECT 1 FROM group_members gm
                      WHERE gm.group_id = g.id AND gm.user_id = $1)
            OR g.allowed_emails ILIKE '%' || $2 || '%'
         ORDER BY g.id",
    )
    .bind(user.id)
    .bind(&user.email)
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching groups: {}", e);
        ServiceError::DatabaseError("Failed to fetch groups".to_string())
    })?;

    let email = user.email.to_lowercase();
    let groups = rows
        .iter()
        .filter(|row| {
            let creator_id: i32 = row.get("creator_id");
            let is_member: bool = row.get("is_member");
            let allowed: String = row.get("allowed_emails");
            creator_id == user.id || is_member || parse_allowed_emails(&allowed).contains(&email)
        })
        .map(|row| GroupSummary {
            id: row.get("id"),
            name: row.get("name"),
            creator: row.get("creator"),
        })
        .collect();

    Ok(groups)
}

async fn group_tasks(db: &Database, group_id: i32) -> Result<Vec<GroupTaskResponse>, ServiceError> {
    let rows = sqlx::query(
        "SELECT gt.id, gt.title, gt.priority, gt.completed, gt.created_at, u.username AS created_by
         FROM group_tasks gt
         JOIN users u ON u.id = gt.created_by
         WHERE gt.group_id = $1
         ORDER BY gt.priority ASC, gt.created_at DESC",
    )
    .bind(group_id)
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching group tasks: {}", e);
        ServiceError::DatabaseError("Failed to fetch group tasks".to_string())
    })?;

    Ok(rows
        .iter()
        .map(|row| GroupTaskResponse {
            id: row.get("id"),
            title: row.get("title"),
            priority: row.get("priority"),
            completed: row.get("completed"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// List groups the caller can access
#[utoipa::path(
    get,
    path = "/api/groups",
    tag = "groups",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Groups retrieved", body = ApiResponse<Vec<GroupSummary>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_groups(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/groups");

    let user = authenticate(&req, &config)?;
    let groups = accessible_groups(&db, &user).await?;

    log::info!("Retrieved {} groups for {}", groups.len(), user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Groups retrieved successfully", groups)))
}

/// Create a group
#[utoipa::path(
    post,
    path = "/api/groups",
    tag = "groups",
    security(
        ("bearer_auth" = [])
    ),
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = ApiResponse<GroupSummary>),
        (status = 400, description = "Validation error", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_group(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/groups - Creating group: {}", body.name);

    let user = authenticate(&req, &config)?;

    if body.name.trim().is_empty() {
        return Err(ServiceError::ValidationError("Group name is required".to_string()));
    }

    let allowed_emails = body.allowed_emails.clone().unwrap_or_default();

    let mut tx = db.pool.begin().await.map_err(|e| {
        log::error!("Failed to begin transaction: {}", e);
        ServiceError::DatabaseError("Transaction failed".to_string())
    })?;

    let row = sqlx::query(
        "INSERT INTO groups (name, creator_id, allowed_emails)
         VALUES ($1, $2, $3)
         RETURNING id, name",
    )
    .bind(body.name.trim())
    .bind(user.id)
    .bind(&allowed_emails)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        log::error!("Database error creating group: {}", e);
        ServiceError::DatabaseError("Failed to create group".to_string())
    })?;

    let group_id: i32 = row.get("id");

    // The creator starts out as a member as well.
    sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
        .bind(group_id)
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            log::error!("Database error adding creator to members: {}", e);
            ServiceError::DatabaseError("Failed to add creator to members".to_string())
        })?;

    tx.commit().await.map_err(|e| {
        log::error!("Failed to commit transaction: {}", e);
        ServiceError::DatabaseError("Transaction failed".to_string())
    })?;

    let summary = GroupSummary {
        id: group_id,
        name: row.get("name"),
        creator: user.username.clone(),
    };

    log::info!("Group created successfully with ID: {}", group_id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Group created successfully", summary)))
}

/// Group detail: members, tasks, and the extra-controls flag
#[utoipa::path(
    get,
    path = "/api/groups/{id}",
    tag = "groups",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Group retrieved", body = ApiResponse<GroupDetailResponse>),
        (status = 403, description = "No access", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Group not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn group_detail(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let group_id = path.into_inner();
    log::info!("GET /api/groups/{}", group_id);

    let user = authenticate(&req, &config)?;
    let (group, member_ids) = load_group_for_access(&db, group_id, &user).await?;

    // First allow-listed visit turns the caller into a member; repeat visits
    // are no-ops via the conflict clause.
    if should_promote_to_member(user.id, &user.email, &member_ids, &group.allowed_emails) {
        sqlx::query(
            "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(user.id)
        .execute(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error promoting member: {}", e);
            ServiceError::DatabaseError("Failed to add member".to_string())
        })?;
        log::info!("User {} promoted to member of group {}", user.username, group_id);
    }

    let member_rows = sqlx::query(
        "SELECT u.username FROM group_members gm
         JOIN users u ON u.id = gm.user_id
         WHERE gm.group_id = $1
         ORDER BY u.username",
    )
    .bind(group_id)
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching member names: {}", e);
        ServiceError::DatabaseError("Failed to fetch group members".to_string())
    })?;

    let members: Vec<String> = member_rows.iter().map(|row| row.get("username")).collect();
    let tasks = group_tasks(&db, group_id).await?;

    let is_creator_or_allowed = user.id == group.creator_id
        || parse_allowed_emails(&group.allowed_emails).contains(&user.email.to_lowercase());

    let detail = GroupDetailResponse {
        id: group.id,
        name: group.name,
        creator: group.creator,
        members,
        tasks,
        is_creator_or_allowed,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success("Group retrieved successfully", detail)))
}

/// Create a task in a group
#[utoipa::path(
    post,
    path = "/api/groups/{id}/tasks",
    tag = "groups",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i32, Path, description = "Group ID")
    ),
    request_body = CreateGroupTaskRequest,
    responses(
        (status = 201, description = "Task created", body = ApiResponse<GroupTaskResponse>),
        (status = 403, description = "No access", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Group not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn create_group_task(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    body: web::Json<CreateGroupTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    let group_id = path.into_inner();
    log::info!("POST /api/groups/{}/tasks", group_id);

    let user = authenticate(&req, &config)?;
    load_group_for_access(&db, group_id, &user).await?;

    if body.title.trim().is_empty() {
        return Err(ServiceError::ValidationError("Task title is required".to_string()));
    }

    let row = sqlx::query(
        "INSERT INTO group_tasks (group_id, title, created_by)
         VALUES ($1, $2, $3)
         RETURNING id, title, priority, completed, created_at",
    )
    .bind(group_id)
    .bind(body.title.trim())
    .bind(user.id)
    .fetch_one(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error creating group task: {}", e);
        ServiceError::DatabaseError("Failed to create group task".to_string())
    })?;

    let task = GroupTaskResponse {
        id: row.get("id"),
        title: row.get("title"),
        priority: row.get("priority"),
        completed: row.get("completed"),
        created_by: user.username.clone(),
        created_at: row.get("created_at"),
    };

    log::info!("Group task created with ID: {}", task.id);
    Ok(HttpResponse::Created().json(ApiResponse::success("Task created successfully", task)))
}

/// Toggle a group task's completed flag
#[utoipa::path(
    post,
    path = "/api/groups/{id}/tasks/{task_id}/toggle",
    tag = "groups",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("task_id" = i32, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task toggled", body = ApiResponse<bool>),
        (status = 403, description = "No access", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn toggle_group_task(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, ServiceError> {
    let (group_id, task_id) = path.into_inner();
    log::info!("POST /api/groups/{}/tasks/{}/toggle", group_id, task_id);

    let user = authenticate(&req, &config)?;
    load_group_for_access(&db, group_id, &user).await?;

    let result = sqlx::query(
        "UPDATE group_tasks SET completed = NOT completed WHERE id = $1 AND group_id = $2",
    )
    .bind(task_id)
    .bind(group_id)
    .execute(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error toggling group task: {}", e);
        ServiceError::DatabaseError("Failed to update group task".to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("Task not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success("Task updated successfully", true)))
}

/// Re-prioritize a group task
#[utoipa::path(
    put,
    path = "/api/groups/{id}/tasks/{task_id}/priority",
    tag = "groups",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("task_id" = i32, Path, description = "Task ID")
    ),
    request_body = UpdatePriorityRequest,
    responses(
        (status = 200, description = "Priority updated", body = ApiResponse<bool>),
        (status = 403, description = "No access", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn set_group_task_priority(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<(i32, i32)>,
    body: web::Json<UpdatePriorityRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (group_id, task_id) = path.into_inner();
    log::info!("PUT /api/groups/{}/tasks/{}/priority", group_id, task_id);

    let user = authenticate(&req, &config)?;
    load_group_for_access(&db, group_id, &user).await?;

    let result = sqlx::query(
        "UPDATE group_tasks SET priority = $1 WHERE id = $2 AND group_id = $3",
    )
    .bind(body.priority)
    .bind(task_id)
    .bind(group_id)
    .execute(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error updating priority: {}", e);
        ServiceError::DatabaseError("Failed to update group task".to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("Task not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success("Priority updated successfully", true)))
}

/// Delete a group task
#[utoipa::path(
    delete,
    path = "/api/groups/{id}/tasks/{task_id}",
    tag = "groups",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i32, Path, description = "Group ID"),
        ("task_id" = i32, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted", body = ApiResponse<bool>),
        (status = 403, description = "No access", body = crate::utils::errors::ServiceError),
        (status = 404, description = "Not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_group_task(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<(i32, i32)>,
) -> Result<HttpResponse, ServiceError> {
    let (group_id, task_id) = path.into_inner();
    log::info!("DELETE /api/groups/{}/tasks/{}", group_id, task_id);

    let user = authenticate(&req, &config)?;
    load_group_for_access(&db, group_id, &user).await?;

    let result = sqlx::query("DELETE FROM group_tasks WHERE id = $1 AND group_id = $2")
        .bind(task_id)
        .bind(group_id)
        .execute(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error deleting group task: {}", e);
            ServiceError::DatabaseError("Failed to delete group task".to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("Task not found".to_string()));
    }

    log::info!("Group task deleted: {}", task_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Task deleted successfully", true)))
}

pub fn group_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/groups")
            .route("", web::get().to(list_groups))
            .route("", web::post().to(create_group))
            .route("/{id}", web::get().to(group_detail))
            .route("/{id}/tasks", web::post().to(create_group_task))
            .route("/{id}/tasks/{task_id}/toggle", web::post().to(toggle_group_task))
            .route("/{id}/tasks/{task_id}/priority", web::put().to(set_group_task_priority))
            .route("/{id}/tasks/{task_id}", web::delete().to(delete_group_task)),
    );
}
