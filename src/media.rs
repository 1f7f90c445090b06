//! Media generation primitives shared by the provider client and the cascade.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("GEMINI_API_KEY or GOOGLE_API_KEY environment variable is not set")] MissingCredential,
    #[error("invalid reference image: {0}")] InvalidReference(String),
    #[error("HTTP error: {0}")] Http(String),
    #[error("no media in response: {0}")] NoMedia(String),
    #[error("generation job failed: {0}")] JobFailed(String),
    #[error("video job did not finish within the polling window")] PollTimeout,
}

/// Raw generated bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMedia {
    pub data: Bytes,
    pub mime_type: String,
}

impl GeneratedMedia {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self { data: data.into(), mime_type: mime_type.into() }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// A caller-supplied image, decoded once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    pub data: Bytes,
    pub mime_type: String,
}

impl ReferenceImage {
    /// Accepts plain base64 or a `data:<mime>;base64,` URL.
    pub fn from_base64(raw: &str) -> Result<Self, MediaError> {
        let trimmed = raw.trim();
        let payload = match trimmed.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => trimmed,
        };
        if payload.is_empty() {
            return Err(MediaError::InvalidReference("image data is empty".into()));
        }
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| MediaError::InvalidReference(e.to_string()))?;
        if data.is_empty() {
            return Err(MediaError::InvalidReference("image data is empty".into()));
        }
        let mime_type = image::guess_format(&data)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "image/png".to_string());
        Ok(Self { data: Bytes::from(data), mime_type })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub aspect_ratio: String,
    pub style: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { aspect_ratio: "9:16".into(), style: "photorealistic".into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoOptions {
    pub aspect_ratio: String,
    pub duration_seconds: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self { aspect_ratio: "9:16".into(), duration_seconds: 6 }
    }
}

/// Handle of a submitted long-running video job.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub model: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Done(GeneratedMedia),
}

/// One provider's image and video operations, each against a named model.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn generate_image(&self, model: &str, prompt: &str, options: &ImageOptions) -> Result<GeneratedMedia, MediaError>;

    /// Re-renders `reference` following `prompt`.
    async fn restyle_image(
        &self,
        model: &str,
        reference: &ReferenceImage,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<GeneratedMedia, MediaError>;

    async fn submit_video(
        &self,
        model: &str,
        reference: &ReferenceImage,
        prompt: &str,
        options: &VideoOptions,
    ) -> Result<VideoJob, MediaError>;

    async fn poll_video(&self, job: &VideoJob) -> Result<JobStatus, MediaError>;
}
