// src/main.rs

mod app_state;
mod auth;
mod config;
mod db;
mod error;
mod identifier;
mod models;
mod routes;
mod session;
mod task_store;
mod tasks;
mod user_directory;
mod user_management;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use crate::app_state::AppState;
use crate::db::MongoDB;
use crate::task_store::MongoTaskStore;
use crate::user_directory::MongoUserDirectory;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mongodb = match MongoDB::init(&config.mongo_uri, &config.database_name).await {
        Ok(mongodb) => mongodb,
        Err(e) => {
            error!("Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = mongodb.ensure_indexes().await {
        error!("Failed to create indexes: {}", e);
        std::process::exit(1);
    }

    let state = AppState::new(
        config.clone(),
        Arc::new(MongoTaskStore::new(&mongodb)),
        Arc::new(MongoUserDirectory::new(&mongodb)),
    );

    let bind_addr = ("0.0.0.0", config.port);
    info!("Server running at http://{}:{}", bind_addr.0, bind_addr.1);
    info!("Allowed CORS origins: {}", config.allowed_origins.join(", "));

    let allowed_origins = config.allowed_origins.clone();
    let result = HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(routes::json_config())
            .configure(routes::configure)
            .default_service(web::route().to(routes::not_found))
    })
    .bind(bind_addr)?
    .run()
    .await;

    mongodb.shutdown().await;
    result
}
