//! Process configuration, read once at startup from the environment (and `.env`).
//!
//! API keys are deliberately absent: clients look them up when they make a call.

use std::env;
use std::time::Duration;

use crate::cascade::{ModelRoster, PollPolicy};

pub const DEFAULT_IMAGE_MODELS: &str = "gemini-2.5-flash-image,gemini-2.0-flash-preview-image-generation,gemini-2.0-flash-thinking-exp-01-21,imagen-3.0-generate-001";
pub const DEFAULT_IMAGE_EDIT_MODELS: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VIDEO_MODELS: &str = "veo-3.1-fast-generate-preview,veo-3.0-fast-generate-001,veo-3.1-generate-preview,veo-3.0-generate-001";

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173,http://localhost:5174,http://127.0.0.1:5174,http://localhost:5175,http://127.0.0.1:5175,http://localhost:8080,http://127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub cors_origins: Vec<String>,
    pub anthropic_base_url: String,
    pub stylist_model: String,
    pub gemini_base_url: String,
    pub models: ModelRoster,
    pub polling: PollPolicy,
    pub text_timeout: Duration,
    pub media_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_port("PORT", 8000),
            database_path: env_string("TRENDS_DB_PATH", "trends.db"),
            cors_origins: env_csv("CORS_ORIGINS", DEFAULT_CORS_ORIGINS),
            anthropic_base_url: env_string("ANTHROPIC_API_BASE", "https://api.anthropic.com/v1"),
            stylist_model: env_string("STYLIST_MODEL", "claude-sonnet-4-20250514"),
            gemini_base_url: env_string("GEMINI_API_BASE", "https://generativelanguage.googleapis.com/v1beta"),
            models: ModelRoster {
                image: env_csv("IMAGE_MODELS", DEFAULT_IMAGE_MODELS),
                image_edit: env_csv("IMAGE_EDIT_MODELS", DEFAULT_IMAGE_EDIT_MODELS),
                video: env_csv("VIDEO_MODELS", DEFAULT_VIDEO_MODELS),
            },
            polling: PollPolicy {
                interval: Duration::from_secs(env_u64("VIDEO_POLL_INTERVAL_SECS", 10)),
                max_polls: u32::try_from(env_u64("VIDEO_MAX_POLLS", 30)).unwrap_or(u32::MAX).max(1),
            },
            text_timeout: Duration::from_secs(env_u64("TEXT_TIMEOUT_SECS", 120).max(1)),
            media_timeout: Duration::from_secs(env_u64("MEDIA_TIMEOUT_SECS", 300).max(1)),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_port(name: &str, default: u16) -> u16 {
    env::var(name).ok().and_then(|value| parse_port(&value)).unwrap_or(default)
}

pub(crate) fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok()
}

fn env_csv(name: &str, default: &str) -> Vec<String> {
    parse_csv(&env_string(name, default))
}

pub(crate) fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
