use std::env;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    pub upload_dir: String,
    pub task_api_url: String,
    pub task_api_timeout_secs: u64,
    pub smtp: SmtpConfig,
}

/// Configuration for the standalone personal-task service binary.
#[derive(Debug, Clone)]
pub struct TaskServiceConfig {
    pub database_url: String,
    pub port: u16,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidFormat(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

fn required(var: &str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::MissingVariable(var.to_string()))
}

fn parse_port(var: &str, default: &str) -> Result<u16, ConfigError> {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidFormat(format!("{} must be a valid port number", var)))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let port = parse_port("SERVER_PORT", "8080")?;

        let frontend_urls = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads/user_files".to_string());

        let task_api_url = env::var("TASK_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string())
            .trim_end_matches('/')
            .to_string();

        let task_api_timeout_secs = env::var("TASK_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidFormat(
                    "TASK_API_TIMEOUT_SECS must be a number of seconds".to_string(),
                )
            })?;

        let smtp_username = required("SMTP_USERNAME")?;
        let smtp = SmtpConfig {
            host: required("SMTP_HOST")?,
            password: required("SMTP_PASSWORD")?,
            from_address: env::var("SMTP_FROM").unwrap_or_else(|_| smtp_username.clone()),
            username: smtp_username,
        };

        Ok(AppConfig {
            database_url,
            jwt_secret,
            environment,
            port,
            frontend_urls,
            upload_dir,
            task_api_url,
            task_api_timeout_secs,
            smtp,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl TaskServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let database_url =
            env::var("TASKS_DATABASE_URL").unwrap_or_else(|_| "sqlite://tasks.db".to_string());
        let port = parse_port("TASKS_SERVER_PORT", "5000")?;

        Ok(TaskServiceConfig { database_url, port })
    }
}
