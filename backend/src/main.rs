mod assembly;
mod classifier;
mod config;
mod intake;
mod model;
mod parser;
mod prompt;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use classifier::ClassificationService;
use config::AppConfig;
use intake::ImageIntake;
use model::OpenAiVisionModel;
use routes::{HealthConfig, configure_routes};
use std::env;
use std::sync::Arc;
use storage::ResultArchive;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_level.0.as_str()));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }
    log::debug!("Loaded configuration: {:?}", config);

    if config.model.api_key.is_empty() {
        log::warn!("OPENAI_API_KEY is not set; classification requests will be rejected by the model API.");
    }

    let intake = ImageIntake::new(config.intake.clone())
        .map_err(|e| startup_error("Failed to build image intake", e))?;
    let vision_model = OpenAiVisionModel::new(&config.model)
        .map_err(|e| startup_error("Failed to build model client", e))?;
    let archive = match &config.storage.data_dir {
        Some(dir) => {
            let archive = ResultArchive::new(dir)
                .map_err(|e| startup_error("Failed to prepare data directory", e))?;
            log::info!("Archiving classification results to {}", archive.data_dir().display());
            Some(archive)
        }
        None => {
            log::info!("DATA_DIR not set; classification results will not be archived");
            None
        }
    };

    let service = ClassificationService::new(
        intake,
        Arc::new(vision_model),
        config.model.timeout(),
        archive,
    );
    let health_config = HealthConfig::from(&config);
    let frontend_dir = config.server.frontend_dir.clone();
    let bind_address = config.bind_address();

    log::info!("Starting Brand Safety Analysis API on {}", bind_address);
    log::info!("Model: {} (timeout {:?})", config.model.name, config.model.timeout());
    log::info!("Serving frontend from {}", frontend_dir.display());

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(health_config.clone()))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
