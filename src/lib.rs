//! Trend Stylist: outfit recommendations grounded in stored fashion trends,
//! with generated image and video previews.

pub mod cascade;
pub mod config;
pub mod error;
pub mod gemini;
pub mod ingest;
pub mod llm;
pub mod media;
pub mod models;
pub mod prompts;
pub mod routes;
pub mod store;
