use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use futures_util::TryStreamExt;
use sqlx::Row;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::handlers::auth::authenticate;
use crate::models::auth::ApiResponse;
use crate::models::file::FileResponse;
use crate::utils::errors::ServiceError;
use crate::Database;

// Max file size: 10MB
const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

fn ensure_upload_dir(dir: &str) -> Result<PathBuf, ServiceError> {
    let upload_dir = Path::new(dir);
    if !upload_dir.exists() {
        std::fs::create_dir_all(upload_dir).map_err(|e| {
            log::error!("Failed to create upload directory: {}", e);
            ServiceError::InternalError("Failed to create upload directory".to_string())
        })?;
    }
    Ok(upload_dir.to_path_buf())
}

/// PDFs are served inline with their own content type; everything else goes
/// out as an opaque binary attachment.
fn content_type_for(file_name: &str) -> (mime::Mime, bool) {
    if file_name.to_lowercase().ends_with(".pdf") {
        (mime::APPLICATION_PDF, true)
    } else {
        (mime::APPLICATION_OCTET_STREAM, false)
    }
}

fn file_response(id: i32, title: String, file_name: String, uploaded_at: chrono::DateTime<chrono::Utc>) -> FileResponse {
    FileResponse {
        id,
        title,
        file_name,
        download_url: format!("/api/files/{}", id),
        uploaded_at,
    }
}

/// Upload a file with a title
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "File uploaded", body = ApiResponse<FileResponse>),
        (status = 400, description = "Missing title or file", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn upload_file(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/files - Uploading file");

    let user = authenticate(&req, &config)?;
    let upload_dir = ensure_upload_dir(&config.upload_dir)?;

    let mut title: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("Multipart error: {}", e);
        ServiceError::ValidationError("Invalid multipart data".to_string())
    })? {
        let content_disposition = field.content_disposition();
        let field_name = content_disposition
            .and_then(|cd| cd.get_name())
            .map(|n| n.to_string());
        let file_name = content_disposition
            .and_then(|cd| cd.get_filename())
            .map(|n| n.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("File chunk error: {}", e);
            ServiceError::ValidationError("Error reading upload data".to_string())
        })? {
            data.extend_from_slice(&chunk);
            if data.len() > MAX_FILE_SIZE {
                return Err(ServiceError::ValidationError(
                    "File size exceeds 10MB limit".to_string(),
                ));
            }
        }

        match (field_name.as_deref(), file_name) {
            (_, Some(name)) => file = Some((name, data)),
            (Some("title"), None) => {
                title = Some(String::from_utf8(data).map_err(|_| {
                    ServiceError::ValidationError("Title must be valid UTF-8".to_string())
                })?);
            }
            _ => {}
        }
    }

    let (title, (original_name, data)) = match (title, file) {
        (Some(t), Some(f)) if !t.trim().is_empty() && !f.1.is_empty() => (t, f),
        _ => {
            return Err(ServiceError::ValidationError(
                "Both title and file are required".to_string(),
            ))
        }
    };

    // Stored names are namespaced per user and never collide.
    let extension = Path::new(&original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin");
    let stored_file_name = format!("{}_{}.{}", user.id, Uuid::new_v4(), extension);
    let file_path = upload_dir.join(&stored_file_name);

    let mut out = std::fs::File::create(&file_path).map_err(|e| {
        log::error!("Failed to create file: {}", e);
        ServiceError::InternalError("Failed to save file".to_string())
    })?;
    out.write_all(&data).map_err(|e| {
        log::error!("Failed to write file: {}", e);
        ServiceError::InternalError("Failed to save file".to_string())
    })?;

    let row = sqlx::query(
        "INSERT INTO user_files (user_id, title, file_name, file_path)
         VALUES ($1, $2, $3, $4)
         RETURNING id, title, file_name, uploaded_at",
    )
    .bind(user.id)
    .bind(title.trim())
    .bind(&original_name)
    .bind(file_path.to_string_lossy().to_string())
    .fetch_one(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error saving file record: {}", e);
        // Clean up the blob if the record insert fails
        let _ = std::fs::remove_file(&file_path);
        ServiceError::DatabaseError("Failed to save file record".to_string())
    })?;

    let response = file_response(
        row.get("id"),
        row.get("title"),
        row.get("file_name"),
        row.get("uploaded_at"),
    );

    log::info!("File uploaded successfully: {} ({})", original_name, stored_file_name);
    Ok(HttpResponse::Created().json(ApiResponse::success("File uploaded successfully", response)))
}

/// List the caller's files, most recent first
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Files retrieved", body = ApiResponse<Vec<FileResponse>>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn list_files(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/files");

    let user = authenticate(&req, &config)?;

    let rows = sqlx::query(
        "SELECT id, title, file_name, uploaded_at
         FROM user_files WHERE user_id = $1
         ORDER BY uploaded_at DESC",
    )
    .bind(user.id)
    .fetch_all(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching files: {}", e);
        ServiceError::DatabaseError("Failed to fetch files".to_string())
    })?;

    let files: Vec<FileResponse> = rows
        .iter()
        .map(|row| {
            file_response(
                row.get("id"),
                row.get("title"),
                row.get("file_name"),
                row.get("uploaded_at"),
            )
        })
        .collect();

    log::info!("Retrieved {} files for {}", files.len(), user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Files retrieved successfully", files)))
}

/// Serve a file's content
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i32, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "File not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn serve_file(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let file_id = path.into_inner();
    log::info!("GET /api/files/{}", file_id);

    let user = authenticate(&req, &config)?;

    // Ownership is part of the lookup; another user's file is simply missing.
    let row = sqlx::query(
        "SELECT file_path, file_name FROM user_files WHERE id = $1 AND user_id = $2",
    )
    .bind(file_id)
    .bind(user.id)
    .fetch_optional(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error fetching file: {}", e);
        ServiceError::DatabaseError("Failed to fetch file".to_string())
    })?;

    let row = row.ok_or_else(|| ServiceError::NotFound("File not found".to_string()))?;
    let file_path: String = row.get("file_path");
    let file_name: String = row.get("file_name");

    if !Path::new(&file_path).exists() {
        log::error!("File not found on disk: {}", file_path);
        return Err(ServiceError::NotFound("File not found on disk".to_string()));
    }

    let data = std::fs::read(&file_path).map_err(|e| {
        log::error!("Failed to read file {}: {}", file_path, e);
        ServiceError::InternalError("Failed to read file".to_string())
    })?;

    let (content_type, inline) = content_type_for(&file_path);
    let disposition = if inline {
        format!("inline; filename=\"{}\"", file_name)
    } else {
        format!("attachment; filename=\"{}\"", file_name)
    };

    log::info!("File served: {} ({} bytes)", file_name, data.len());
    Ok(HttpResponse::Ok()
        .content_type(content_type.as_ref())
        .insert_header(("Content-Disposition", disposition))
        .body(data))
}

/// Delete a file and its blob
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    security(
        ("bearer_auth" = [])
    ),
    params(
        ("id" = i32, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted", body = ApiResponse<bool>),
        (status = 404, description = "File not found", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn delete_file(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let file_id = path.into_inner();
    log::info!("DELETE /api/files/{}", file_id);

    let user = authenticate(&req, &config)?;

    let row = sqlx::query("SELECT file_path FROM user_files WHERE id = $1 AND user_id = $2")
        .bind(file_id)
        .bind(user.id)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error fetching file: {}", e);
            ServiceError::DatabaseError("Failed to fetch file".to_string())
        })?;

    let file_path: String = match row {
        Some(row) => row.get("file_path"),
        None => return Err(ServiceError::NotFound("File not found".to_string())),
    };

    // Blob first, then the record; the two are not atomic.
    if Path::new(&file_path).exists() {
        if let Err(e) = std::fs::remove_file(&file_path) {
            log::warn!("Failed to delete file {}: {}", file_path, e);
        }
    }

    let result = sqlx::query("DELETE FROM user_files WHERE id = $1 AND user_id = $2")
        .bind(file_id)
        .bind(user.id)
        .execute(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error deleting file record: {}", e);
            ServiceError::DatabaseError("Failed to delete file record".to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound("File not found".to_string()));
    }

    log::info!("File deleted successfully: {}", file_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("File deleted successfully", true)))
}

pub fn file_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/files")
            .route("", web::post().to(upload_file))
            .route("", web::get().to(list_files))
            .route("/{id}", web::get().to(serve_file))
            .route("/{id}", web::delete().to(delete_file)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_suffix_serves_inline_as_pdf() {
        let (ct, inline) = content_type_for("uploads/user_files/3_abc.PDF");
        assert_eq!(ct, mime::APPLICATION_PDF);
        assert!(inline);
    }

    #[test]
    fn anything_else_is_an_opaque_attachment() {
        let (ct, inline) = content_type_for("uploads/user_files/3_abc.docx");
        assert_eq!(ct, mime::APPLICATION_OCTET_STREAM);
        assert!(!inline);
    }
}
