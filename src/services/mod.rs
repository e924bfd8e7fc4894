// src/services/mod.rs
pub mod analysis_service;
pub mod image_processor;
pub mod normalizer;
pub mod prompts;
pub mod redis_service;

pub use analysis_service::AnalysisService;
pub use image_processor::ImageProcessor;
pub use redis_service::RedisService;
