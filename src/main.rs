use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use std::process;
use std::time::Duration;

use planit_be::client::TaskClient;
use planit_be::config::AppConfig;
use planit_be::handlers;
use planit_be::mailer::Mailer;
use planit_be::otp::OtpStore;
use planit_be::Database;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let db = match Database::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Database error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = db.health_check().await {
        log::error!("Database health check failed: {}", e);
        process::exit(1);
    }
    if let Err(e) = db.check_tables().await {
        log::warn!("Table check failed: {}", e);
    }
    if let Ok(stats) = db.get_stats().await {
        stats.log_stats();
    }

    let mailer = match Mailer::from_config(&config.smtp) {
        Ok(mailer) => mailer,
        Err(e) => {
            log::error!("Mailer configuration error: {}", e);
            process::exit(1);
        }
    };

    let task_client = match TaskClient::new(
        &config.task_api_url,
        Duration::from_secs(config.task_api_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Task client error: {}", e);
            process::exit(1);
        }
    };

    println!("🚀 Starting Planit backend on port {}", config.port);
    println!("📋 Task service: {}", config.task_api_url);

    let port = config.port;
    let allowed_origins = config.frontend_urls.clone();

    let db = web::Data::new(db);
    let app_config = web::Data::new(config);
    let otp_store = web::Data::new(OtpStore::default());
    let mailer = web::Data::new(mailer);
    let task_client = web::Data::new(task_client);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "Authorization",
                "Content-Type",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .supports_credentials();

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(db.clone())
            .app_data(app_config.clone())
            .app_data(otp_store.clone())
            .app_data(mailer.clone())
            .app_data(task_client.clone())
            .configure(handlers::health::configure)
            .configure(handlers::auth_config)
            .configure(handlers::group_config)
            .configure(handlers::task_config)
            .configure(handlers::file_config)
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
