use actix_web::{web, HttpRequest, HttpResponse, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::client::TaskClient;
use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::models::auth::{
    ApiResponse, CheckUsernameRequest, LoginRequest, LoginResponseData, RegisterRequest,
    SendOtpRequest, UserDetailsResponse, UserResponse,
};
use crate::otp::OtpStore;
use crate::utils::errors::ServiceError;
use crate::utils::validation::{validate_email, validate_password, validate_username};
use crate::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub username: String,
    pub email: String,
    pub exp: usize, // Expiration time (Unix timestamp)
    pub iat: usize, // Issued at (Unix timestamp)
}

/// The caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// Extracts and validates the bearer token, yielding the caller's identity.
pub fn authenticate(req: &HttpRequest, config: &AppConfig) -> Result<AuthedUser, ServiceError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = auth_header
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))?;

    let user_id: i32 = claims
        .claims
        .sub
        .parse()
        .map_err(|_| ServiceError::Unauthorized("Invalid user ID in token".to_string()))?;

    Ok(AuthedUser {
        id: user_id,
        username: claims.claims.username,
        email: claims.claims.email,
    })
}

fn issue_token(user_id: i32, username: &str, email: &str, secret: &str) -> Result<String, ServiceError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| ServiceError::InternalError("Token expiry overflow".to_string()))?
        .timestamp() as usize;
    let iat = now.timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        exp,
        iat,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        log::error!("JWT encoding error: {}", e);
        ServiceError::AuthenticationError("Failed to generate token".to_string())
    })
}

/// Check whether a username is still available
#[utoipa::path(
    post,
    path = "/api/auth/check-username",
    tag = "auth",
    request_body = CheckUsernameRequest,
    responses(
        (status = 200, description = "Username is available", body = ApiResponse<bool>),
        (status = 400, description = "Invalid or taken username", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn check_username(
    db: web::Data<Database>,
    body: web::Json<CheckUsernameRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/check-username - {}", body.username);

    validate_username(&body.username).map_err(ServiceError::ValidationError)?;

    let existing = sqlx::query("SELECT id FROM users WHERE username = $1")
        .bind(&body.username)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error during check_username: {}", e);
            ServiceError::DatabaseError("Failed to query user".to_string())
        })?;

    if existing.is_some() {
        log::info!("Username {} already exists", body.username);
        return Err(ServiceError::ValidationError("Username already exists".to_string()));
    }

    log::info!("Username {} is available", body.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Username is available", true)))
}

/// Email a verification code and store it with a five-minute expiry
#[utoipa::path(
    post,
    path = "/api/auth/send-otp",
    tag = "auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = ApiResponse<bool>),
        (status = 400, description = "Invalid email", body = crate::utils::errors::ServiceError),
        (status = 500, description = "Mail delivery failed", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn send_otp(
    mailer: web::Data<Mailer>,
    otp_store: web::Data<OtpStore>,
    body: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/send-otp - {}", body.email);

    if body.email.trim().is_empty() || body.otp.trim().is_empty() {
        return Err(ServiceError::ValidationError("Email and OTP are required".to_string()));
    }
    validate_email(&body.email).map_err(ServiceError::ValidationError)?;

    mailer.send_otp(&body.email, &body.otp).await.map_err(|e| {
        log::error!("Failed to send OTP email to {}: {}", body.email, e);
        ServiceError::from(e)
    })?;

    // Only a delivered code becomes pending; overwrites any prior one.
    otp_store.put(&body.email, &body.otp);
    log::info!("OTP stored for {}", body.email);

    Ok(HttpResponse::Ok().json(ApiResponse::success("OTP sent", true)))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation failure or duplicate", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn register(
    db: web::Data<Database>,
    otp_store: web::Data<OtpStore>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/register - {}", body.username);

    validate_username(&body.username).map_err(ServiceError::ValidationError)?;
    validate_password(&body.password).map_err(ServiceError::ValidationError)?;
    validate_email(&body.email).map_err(ServiceError::ValidationError)?;

    let username_taken = sqlx::query("SELECT id FROM users WHERE username = $1")
        .bind(&body.username)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error during register: {}", e);
            ServiceError::DatabaseError("Failed to query user".to_string())
        })?;
    if username_taken.is_some() {
        return Err(ServiceError::ValidationError("Username already exists".to_string()));
    }

    let email_taken = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error during register: {}", e);
            ServiceError::DatabaseError("Failed to query user".to_string())
        })?;
    if email_taken.is_some() {
        return Err(ServiceError::ValidationError("Email already exists".to_string()));
    }

    // The submitted code is not compared against the pending one; the flow
    // only invalidates the cache entry once the account exists.
    let password_hash = hash(&body.password, DEFAULT_COST)?;

    let row = sqlx::query(
        "INSERT INTO users (username, email, password_hash)
         VALUES ($1, $2, $3)
         RETURNING id, username, email, created_at",
    )
    .bind(&body.username)
    .bind(&body.email)
    .bind(&password_hash)
    .fetch_one(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error creating user: {}", e);
        ServiceError::DatabaseError("Failed to create user".to_string())
    })?;

    otp_store.remove(&body.email);

    let user = UserResponse {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    };

    log::info!("User registered: {}", user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Account created", user)))
}

/// User login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponseData>),
        (status = 400, description = "Malformed credentials", body = crate::utils::errors::ServiceError),
        (status = 401, description = "Invalid credentials", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    login_req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/login - Login attempt for: {}", login_req.username);

    // Shape is checked before credentials; a malformed value is a 400, not a 401.
    validate_username(&login_req.username).map_err(ServiceError::ValidationError)?;
    validate_password(&login_req.password).map_err(ServiceError::ValidationError)?;

    let user_row = sqlx::query(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
    )
    .bind(&login_req.username)
    .fetch_optional(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error during login: {}", e);
        ServiceError::DatabaseError("Failed to query user".to_string())
    })?;

    // Missing user and bad password collapse into one answer.
    let user_row = match user_row {
        Some(row) => row,
        None => {
            log::warn!("Login failed: User not found - {}", login_req.username);
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let stored_hash: String = user_row.get("password_hash");
    let password_valid = verify(&login_req.password, &stored_hash).map_err(|e| {
        log::error!("Password verification error: {}", e);
        ServiceError::AuthenticationError("Password verification failed".to_string())
    })?;

    if !password_valid {
        log::warn!("Login failed: Invalid password for user - {}", login_req.username);
        return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id: i32 = user_row.get("id");
    let email: String = user_row.get("email");
    let token = issue_token(user_id, &login_req.username, &email, &config.jwt_secret)?;

    let response_data = LoginResponseData {
        token,
        user: UserResponse {
            id: user_id,
            username: user_row.get("username"),
            email,
            created_at: user_row.get("created_at"),
        },
    };

    log::info!("Login successful for user: {}", login_req.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Login successful", response_data)))
}

/// User logout endpoint
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Logout successful", body = ApiResponse<bool>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn logout(
    req: HttpRequest,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/logout");

    let user = authenticate(&req, &config)?;

    // Tokens are stateless; logout is unconditional for an authenticated caller.
    log::info!("User logout successful: {}", user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully logged out", true)))
}

/// Current user details: account, accessible groups, personal task count
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "User information retrieved", body = ApiResponse<UserDetailsResponse>),
        (status = 401, description = "Unauthorized", body = crate::utils::errors::ServiceError)
    )
)]
pub async fn get_me(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    tasks: web::Data<TaskClient>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/auth/me");

    let user = authenticate(&req, &config)?;

    let user_row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_optional(&db.pool)
        .await
        .map_err(|e| {
            log::error!("Database error during get_me: {}", e);
            ServiceError::DatabaseError("Failed to query user".to_string())
        })?;

    let user_row = match user_row {
        Some(row) => row,
        None => {
            log::warn!("User not found for ID: {}", user.id);
            return Err(ServiceError::Unauthorized("User not found".to_string()));
        }
    };

    let groups = super::group::accessible_groups(&db, &user).await?;

    // A dead task service degrades the page to a zero count, not a failure.
    let task_count = match tasks.list_tasks(&user.username).await {
        Ok(list) => list.len(),
        Err(e) => {
            log::error!("Failed to fetch tasks for user details: {}", e);
            0
        }
    };

    let details = UserDetailsResponse {
        user: UserResponse {
            id: user_row.get("id"),
            username: user_row.get("username"),
            email: user_row.get("email"),
            created_at: user_row.get("created_at"),
        },
        groups,
        task_count,
    };

    log::info!("User information retrieved for: {}", details.user.username);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved user data", details)))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/check-username", web::post().to(check_username))
            .route("/send-otp", web::post().to(send_otp))
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(get_me)),
    );
}
