use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use std::process;

use planit_be::config::TaskServiceConfig;
use planit_be::taskd::database::TaskDb;
use planit_be::taskd::handlers;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = match TaskServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let db = match TaskDb::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Task database error: {}", e);
            process::exit(1);
        }
    };

    println!("🚀 Starting Planit task service on port {}", config.port);

    let port = config.port;
    let db = web::Data::new(db);

    HttpServer::new(move || {
        // The resource is addressed service-to-service; origins stay open.
        App::new()
            .wrap(Cors::permissive())
            .wrap(actix_web::middleware::Logger::default())
            .app_data(db.clone())
            .configure(handlers::task_config)
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
