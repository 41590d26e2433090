pub mod auth;
pub mod classifier;
pub mod ingest_service;
pub mod media_tool;
pub mod object_store;
pub mod staging;
pub mod storage_key;
pub mod video_repository;
