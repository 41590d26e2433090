//! Core data models for the video ingest service.
//!
//! `VideoRecord` maps to the `videos` table via `sqlx::FromRow` and is
//! returned as JSON; the media types describe what the probe tool reports.

pub mod media;
pub mod upload;
pub mod video;
