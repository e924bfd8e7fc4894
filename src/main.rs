// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::{error, info};
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::Config;
use crate::handlers::{
    action_plan, analyze_products, analyze_skin, delete_scan, get_analysis_state,
    get_current_analysis, get_profile, get_routines, list_scans, put_profile, put_routines,
    save_scan,
};
use crate::services::{AnalysisService, ImageProcessor, RedisService};

#[derive(Clone)]
pub struct AppState {
    redis_service: Arc<RedisService>,
    analysis_service: Arc<AnalysisService>,
    image_processor: Arc<ImageProcessor>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting skinsight service...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let redis_service = Arc::new(
        RedisService::new(&config.redis_url)
            .await
            .expect("failed to connect to Redis"),
    );
    let analysis_service = Arc::new(AnalysisService::new(&config));
    let image_processor = Arc::new(ImageProcessor::new());

    let app_state = AppState {
        redis_service,
        analysis_service,
        image_processor,
    };

    info!("Starting HTTP server on {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/analyze/skin", web::post().to(analyze_skin))
                    .route("/analyze/products", web::post().to(analyze_products))
                    .route("/action-plan", web::post().to(action_plan))
                    .route("/analysis/{user}", web::get().to(get_current_analysis))
                    .route("/analysis/{user}/state", web::get().to(get_analysis_state))
                    .route("/scans/{user}", web::post().to(save_scan))
                    .route("/scans/{user}", web::get().to(list_scans))
                    .route("/scans/{user}/{scan_id}", web::delete().to(delete_scan))
                    .route("/routines/{user}", web::get().to(get_routines))
                    .route("/routines/{user}", web::put().to(put_routines))
                    .route("/profile/{user}", web::get().to(get_profile))
                    .route("/profile/{user}", web::put().to(put_profile)),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind(&config.bind_address)?
    .run()
    .await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "skinsight",
        "version": "0.1.0"
    }))
}
