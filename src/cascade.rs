//! Ordered model fallback for image, multi-angle, variation and video requests.
//!
//! Every operation tries the configured models one at a time and keeps the
//! first success. When the list is exhausted the text model is asked for an
//! enhanced prompt, and when that fails too a fixed template is returned.
//! None of the public operations fail.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::llm::{LlmError, TextGenerator};
use crate::media::{GeneratedMedia, ImageOptions, JobStatus, MediaBackend, MediaError, ReferenceImage, VideoJob, VideoOptions};
use crate::prompts;

pub const DEFAULT_VARIATIONS: usize = 3;
pub const MAX_VARIATIONS: usize = 6;
const ENHANCE_MAX_TOKENS: u32 = 1024;

/// Ordered model identifiers per capability.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRoster {
    pub image: Vec<String>,
    pub image_edit: Vec<String>,
    pub video: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_polls: u32,
}

// --- Outcomes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageParameters {
    pub aspect_ratio: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoParameters {
    pub duration: u32,
    pub aspect_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub prompt_used: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Success {
        image_data: String,
        mime_type: String,
        image_url: Option<String>,
        parameters: ImageParameters,
        metadata: GenerationMetadata,
    },
    Fallback {
        message: String,
        enhanced_prompt: String,
        parameters: ImageParameters,
    },
}

impl ImageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImageOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoOutcome {
    Success {
        video_data: String,
        mime_type: String,
        video_url: Option<String>,
        parameters: VideoParameters,
        metadata: GenerationMetadata,
    },
    Fallback {
        message: String,
        enhanced_prompt: String,
        parameters: VideoParameters,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAngleParameters {
    pub aspect_ratio: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angles_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MultiAngleOutcome {
    Success {
        images: Vec<String>,
        angles: Vec<String>,
        parameters: MultiAngleParameters,
    },
    Fallback {
        message: String,
        enhanced_prompt: String,
        parameters: MultiAngleParameters,
    },
    Error {
        message: String,
        parameters: MultiAngleParameters,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus { Success, Partial, Error }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationParameters {
    pub aspect_ratio: String,
    pub style: String,
    pub requested_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationsOutcome {
    pub status: BatchStatus,
    pub variations: Vec<ImageOutcome>,
    /// Number of variations that produced an image.
    pub count: usize,
    pub parameters: VariationParameters,
}

/// Text handed back instead of media.
struct Degraded {
    message: &'static str,
    enhanced_prompt: String,
}

// --- Cascade ---

pub struct MediaCascade {
    backend: Arc<dyn MediaBackend>,
    writer: Arc<dyn TextGenerator>,
    models: ModelRoster,
    polling: PollPolicy,
}

impl MediaCascade {
    pub fn new(backend: Arc<dyn MediaBackend>, writer: Arc<dyn TextGenerator>, models: ModelRoster, polling: PollPolicy) -> Self {
        Self { backend, writer, models, polling }
    }

    pub async fn generate_image(&self, description: &str, options: &ImageOptions) -> ImageOutcome {
        let prompt = prompts::image_direction(description, options);
        info!("🎨 Generating image across {} model(s)", self.models.image.len());

        for model in &self.models.image {
            match self.backend.generate_image(model, &prompt, options).await {
                Ok(media) => {
                    info!("✅ Image generated successfully with {}", model);
                    return ImageOutcome::Success {
                        image_data: media.to_base64(),
                        mime_type: media.mime_type,
                        image_url: None,
                        parameters: image_parameters(options, Some(model)),
                        metadata: GenerationMetadata { prompt_used: prompt.clone(), note: format!("Generated with {model}") },
                    };
                }
                Err(e) => warn!("❌ {} failed: {}", model, e),
            }
        }

        info!("🔄 All image models failed, falling back to an enhanced prompt");
        let degraded = self.degrade_image(description, options).await;
        ImageOutcome::Fallback {
            message: degraded.message.to_string(),
            enhanced_prompt: degraded.enhanced_prompt,
            parameters: image_parameters(options, None),
        }
    }

    /// Four views rendered from the description alone. One degraded view
    /// turns the whole batch into a single fallback.
    pub async fn generate_multi_angle(&self, description: &str, options: &ImageOptions) -> MultiAngleOutcome {
        let parameters = MultiAngleParameters {
            aspect_ratio: options.aspect_ratio.clone(),
            style: options.style.clone(),
            angles_count: Some(prompts::TEXT_ANGLES.len()),
        };
        let mut images = Vec::with_capacity(prompts::TEXT_ANGLES.len());
        let mut angles = Vec::with_capacity(prompts::TEXT_ANGLES.len());

        for (angle, phrase) in prompts::TEXT_ANGLES {
            info!("📸 Generating {} view", angle);
            let angle_prompt = prompts::angle_prompt(description, phrase);
            match self.generate_image(&angle_prompt, options).await {
                ImageOutcome::Success { image_data, .. } => {
                    images.push(image_data);
                    angles.push(angle.to_string());
                }
                ImageOutcome::Fallback { enhanced_prompt, .. } => {
                    warn!("❌ {} view degraded, reporting the batch as fallback", angle);
                    return MultiAngleOutcome::Fallback {
                        message: format!("Image generation failed at {angle} view"),
                        enhanced_prompt,
                        parameters,
                    };
                }
            }
        }

        info!("✅ All {} angles generated", images.len());
        MultiAngleOutcome::Success { images, angles, parameters }
    }

    /// Four views re-rendered from a reference image. The first view that no
    /// edit model can produce aborts the batch.
    pub async fn generate_multi_angle_from_reference(
        &self,
        reference: &ReferenceImage,
        description: &str,
        options: &ImageOptions,
    ) -> MultiAngleOutcome {
        let parameters = MultiAngleParameters {
            aspect_ratio: options.aspect_ratio.clone(),
            style: options.style.clone(),
            angles_count: None,
        };
        let mut images = Vec::with_capacity(prompts::REFERENCE_ANGLES.len());
        let mut angles = Vec::with_capacity(prompts::REFERENCE_ANGLES.len());

        for (angle, instruction) in prompts::REFERENCE_ANGLES {
            info!("📸 Re-rendering {} view from reference", angle);
            let prompt = prompts::reference_angle_prompt(instruction, description, options);
            match self.restyle(reference, &prompt, options).await {
                Ok(media) => {
                    images.push(media.to_base64());
                    angles.push(angle.to_string());
                }
                Err(e) => {
                    warn!("❌ {} view failed: {}", angle, e);
                    return MultiAngleOutcome::Error {
                        message: format!("Failed to generate {angle} view: {e}"),
                        parameters,
                    };
                }
            }
        }

        info!("✅ All {} angle views generated from reference", images.len());
        MultiAngleOutcome::Success { images, angles, parameters }
    }

    /// `count` is clamped to `1..=MAX_VARIATIONS`.
    pub async fn generate_variations(&self, description: &str, count: usize, options: &ImageOptions) -> VariationsOutcome {
        let requested = count.clamp(1, MAX_VARIATIONS);
        let mut variations = Vec::with_capacity(requested);
        let mut succeeded = 0;

        for index in 0..requested {
            info!("📸 Generating variation {}/{}", index + 1, requested);
            let outcome = self.generate_image(&prompts::variation_prompt(description, index), options).await;
            if outcome.is_success() {
                succeeded += 1;
            } else {
                warn!("⚠️ Variation {} degraded to a prompt", index + 1);
            }
            variations.push(outcome);
        }

        let status = match succeeded {
            0 => BatchStatus::Error,
            n if n == requested => BatchStatus::Success,
            _ => BatchStatus::Partial,
        };
        info!("🧮 {}/{} variations produced images", succeeded, requested);
        VariationsOutcome {
            status,
            variations,
            count: succeeded,
            parameters: VariationParameters {
                aspect_ratio: options.aspect_ratio.clone(),
                style: options.style.clone(),
                requested_count: requested,
            },
        }
    }

    pub async fn generate_video(&self, reference: &ReferenceImage, description: &str, options: &VideoOptions) -> VideoOutcome {
        let prompt = prompts::video_direction(description);
        info!("🎬 Generating video across {} model(s)", self.models.video.len());

        for model in &self.models.video {
            match self.render_video(model, reference, &prompt, options).await {
                Ok(media) => {
                    info!("✅ Video generated successfully with {}", model);
                    return VideoOutcome::Success {
                        video_data: media.to_base64(),
                        mime_type: media.mime_type,
                        video_url: None,
                        parameters: video_parameters(options, Some(model)),
                        metadata: GenerationMetadata { prompt_used: prompt.clone(), note: format!("Animated with {model}") },
                    };
                }
                Err(e) => warn!("❌ {} failed: {}", model, e),
            }
        }

        info!("🔄 All video models failed, falling back to an enhanced prompt");
        let degraded = self.degrade_video(description, options).await;
        VideoOutcome::Fallback {
            message: degraded.message.to_string(),
            enhanced_prompt: degraded.enhanced_prompt,
            parameters: video_parameters(options, None),
        }
    }

    async fn restyle(&self, reference: &ReferenceImage, prompt: &str, options: &ImageOptions) -> Result<GeneratedMedia, MediaError> {
        let mut last_error = MediaError::NoMedia("no image edit models configured".into());
        for model in &self.models.image_edit {
            match self.backend.restyle_image(model, reference, prompt, options).await {
                Ok(media) => return Ok(media),
                Err(e) => {
                    debug!("{} could not restyle: {}", model, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn render_video(
        &self,
        model: &str,
        reference: &ReferenceImage,
        prompt: &str,
        options: &VideoOptions,
    ) -> Result<GeneratedMedia, MediaError> {
        info!("📹 Trying video model: {}", model);
        let job = self.backend.submit_video(model, reference, prompt, options).await?;
        self.await_video(&job).await
    }

    /// Polls at most `max_polls` times. Dropping the future stops polling;
    /// the upstream job is left to expire.
    async fn await_video(&self, job: &VideoJob) -> Result<GeneratedMedia, MediaError> {
        for attempt in 1..=self.polling.max_polls {
            tokio::time::sleep(self.polling.interval).await;
            match self.backend.poll_video(job).await? {
                JobStatus::Done(media) => return Ok(media),
                JobStatus::Pending => debug!("⏳ {} still processing ({}/{})", job.name, attempt, self.polling.max_polls),
            }
        }
        Err(MediaError::PollTimeout)
    }

    async fn enhance(&self, request: &str) -> Result<String, LlmError> {
        let text = self.writer.call("", request, ENHANCE_MAX_TOKENS, 1.0).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    async fn degrade_image(&self, description: &str, options: &ImageOptions) -> Degraded {
        match self.enhance(&prompts::image_enhancement_request(description)).await {
            Ok(enhanced_prompt) => Degraded {
                message: "Image generation is currently unavailable. Use this enhanced prompt with external image generators like Midjourney, DALL-E, or Stable Diffusion.",
                enhanced_prompt,
            },
            Err(LlmError::MissingCredential(_)) => Degraded {
                message: "Image generation requires CLAUDE_API_KEY for prompt enhancement. Image generation models are unavailable.",
                enhanced_prompt: prompts::basic_image_prompt(description, options),
            },
            Err(e) => {
                warn!("⚠️ Prompt enhancement also failed: {}", e);
                Degraded {
                    message: "Image generation services are currently unavailable. Please use the prompt below with external image generators.",
                    enhanced_prompt: prompts::basic_image_prompt(description, options),
                }
            }
        }
    }

    async fn degrade_video(&self, description: &str, options: &VideoOptions) -> Degraded {
        match self.enhance(&prompts::video_enhancement_request(description, options)).await {
            Ok(enhanced_prompt) => Degraded {
                message: "Video generation is currently unavailable. Use this enhanced prompt with external video generators like Runway ML or Pika Labs.",
                enhanced_prompt,
            },
            Err(LlmError::MissingCredential(_)) => Degraded {
                message: "Video generation requires CLAUDE_API_KEY for prompt enhancement. Video generation models are unavailable.",
                enhanced_prompt: prompts::basic_video_prompt(description, options),
            },
            Err(e) => {
                warn!("⚠️ Prompt enhancement also failed: {}", e);
                Degraded {
                    message: "Video generation services are currently unavailable. Please use the prompt below with external video generators.",
                    enhanced_prompt: prompts::basic_video_prompt(description, options),
                }
            }
        }
    }
}

fn image_parameters(options: &ImageOptions, model: Option<&str>) -> ImageParameters {
    ImageParameters {
        aspect_ratio: options.aspect_ratio.clone(),
        style: options.style.clone(),
        model: model.map(str::to_string),
    }
}

fn video_parameters(options: &VideoOptions, model: Option<&str>) -> VideoParameters {
    VideoParameters {
        duration: options.duration_seconds,
        aspect_ratio: options.aspect_ratio.clone(),
        model: model.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    /// Backend whose behaviour is keyed by model name.
    #[derive(Default)]
    struct ScriptedBackend {
        working: HashSet<String>,
        /// Prompts containing this text fail on every model.
        poisoned_phrase: Option<String>,
        /// Polls a video job needs before it reports done.
        polls_needed: u32,
        calls: Mutex<Vec<String>>,
        polls: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn working(models: &[&str]) -> Self {
            Self { working: models.iter().map(|m| m.to_string()).collect(), ..Default::default() }
        }

        fn attempt(&self, model: &str, prompt: &str) -> Result<GeneratedMedia, MediaError> {
            self.calls.lock().push(model.to_string());
            let poisoned = self.poisoned_phrase.as_deref().is_some_and(|p| prompt.contains(p));
            if self.working.contains(model) && !poisoned {
                Ok(GeneratedMedia::new(Bytes::from(model.as_bytes().to_vec()), "image/png"))
            } else {
                Err(MediaError::Http(format!("status=404 model {model} not found")))
            }
        }

        fn calls(&self) -> Vec<String> { self.calls.lock().clone() }
    }

    #[async_trait]
    impl MediaBackend for ScriptedBackend {
        async fn generate_image(&self, model: &str, prompt: &str, _: &ImageOptions) -> Result<GeneratedMedia, MediaError> {
            self.attempt(model, prompt)
        }

        async fn restyle_image(&self, model: &str, _: &ReferenceImage, prompt: &str, _: &ImageOptions) -> Result<GeneratedMedia, MediaError> {
            self.attempt(model, prompt)
        }

        async fn submit_video(&self, model: &str, _: &ReferenceImage, prompt: &str, _: &VideoOptions) -> Result<VideoJob, MediaError> {
            self.attempt(model, prompt)?;
            Ok(VideoJob { model: model.to_string(), name: format!("operations/{model}") })
        }

        async fn poll_video(&self, job: &VideoJob) -> Result<JobStatus, MediaError> {
            let mut polls = self.polls.lock();
            *polls += 1;
            if *polls >= self.polls_needed {
                Ok(JobStatus::Done(GeneratedMedia::new(Bytes::from(job.model.clone().into_bytes()), "video/mp4")))
            } else {
                Ok(JobStatus::Pending)
            }
        }
    }

    enum Writer { Answers(&'static str), NoKey, Broken }

    #[async_trait]
    impl TextGenerator for Writer {
        async fn call(&self, _: &str, _: &str, _: u32, _: f32) -> Result<String, LlmError> {
            match self {
                Writer::Answers(text) => Ok(text.to_string()),
                Writer::NoKey => Err(LlmError::MissingCredential("CLAUDE_API_KEY".into())),
                Writer::Broken => Err(LlmError::Api { status: 529, message: "overloaded".into() }),
            }
        }
    }

    fn roster() -> ModelRoster {
        ModelRoster {
            image: vec!["img-a".into(), "img-b".into(), "img-c".into()],
            image_edit: vec!["edit-a".into()],
            video: vec!["veo-a".into(), "veo-b".into()],
        }
    }

    fn cascade(backend: Arc<ScriptedBackend>, writer: Writer, max_polls: u32) -> MediaCascade {
        MediaCascade::new(backend, Arc::new(writer), roster(), PollPolicy { interval: Duration::ZERO, max_polls })
    }

    fn reference() -> ReferenceImage {
        ReferenceImage { data: Bytes::from_static(b"ref"), mime_type: "image/png".into() }
    }

    #[tokio::test]
    async fn first_working_model_wins_and_later_ones_are_skipped() {
        let backend = Arc::new(ScriptedBackend::working(&["img-b", "img-c"]));
        let outcome = cascade(backend.clone(), Writer::Broken, 1).generate_image("navy suit", &ImageOptions::default()).await;

        match outcome {
            ImageOutcome::Success { parameters, metadata, .. } => {
                assert_eq!(parameters.model.as_deref(), Some("img-b"));
                assert!(metadata.prompt_used.contains("navy suit"));
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(backend.calls(), vec!["img-a", "img-b"]);
    }

    #[tokio::test]
    async fn exhausted_models_fall_back_to_enhanced_prompt() {
        let backend = Arc::new(ScriptedBackend::default());
        let outcome = cascade(backend.clone(), Writer::Answers("  A dramatic studio shot  "), 1)
            .generate_image("navy suit", &ImageOptions::default())
            .await;

        match outcome {
            ImageOutcome::Fallback { enhanced_prompt, message, parameters } => {
                assert_eq!(enhanced_prompt, "A dramatic studio shot");
                assert!(message.contains("enhanced prompt"));
                assert_eq!(parameters.model, None);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        assert_eq!(backend.calls().len(), 3);
    }

    #[tokio::test]
    async fn failing_writer_degrades_to_template() {
        for writer in [Writer::NoKey, Writer::Broken] {
            let outcome = cascade(Arc::new(ScriptedBackend::default()), writer, 1)
                .generate_image("navy suit", &ImageOptions::default())
                .await;
            match outcome {
                ImageOutcome::Fallback { enhanced_prompt, .. } => {
                    assert!(enhanced_prompt.starts_with("Fashion photography: navy suit"));
                }
                other => panic!("expected fallback, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn fallback_serializes_with_status_tag() {
        let outcome = cascade(Arc::new(ScriptedBackend::default()), Writer::NoKey, 1)
            .generate_image("navy suit", &ImageOptions::default())
            .await;
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "fallback");
        assert_eq!(value["parameters"]["aspect_ratio"], "9:16");
        assert!(value["parameters"].get("model").is_none());
    }

    #[tokio::test]
    async fn one_degraded_angle_makes_the_whole_batch_fallback() {
        let backend = Arc::new(ScriptedBackend {
            poisoned_phrase: Some("Rear view".into()),
            ..ScriptedBackend::working(&["img-a"])
        });
        let outcome = cascade(backend, Writer::NoKey, 1).generate_multi_angle("navy suit", &ImageOptions::default()).await;

        match outcome {
            MultiAngleOutcome::Fallback { message, enhanced_prompt, parameters } => {
                assert_eq!(message, "Image generation failed at rear view");
                assert!(enhanced_prompt.contains("Rear view"));
                assert_eq!(parameters.angles_count, Some(4));
            }
            other => panic!("expected a single fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_angles_succeed_in_order() {
        let outcome = cascade(Arc::new(ScriptedBackend::working(&["img-a"])), Writer::NoKey, 1)
            .generate_multi_angle("navy suit", &ImageOptions::default())
            .await;
        match outcome {
            MultiAngleOutcome::Success { images, angles, .. } => {
                assert_eq!(images.len(), 4);
                assert_eq!(angles, vec!["front", "left", "rear", "right"]);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reference_batch_aborts_on_first_failed_view() {
        let backend = Arc::new(ScriptedBackend {
            poisoned_phrase: Some("back view".into()),
            ..ScriptedBackend::working(&["edit-a"])
        });
        let outcome = cascade(backend.clone(), Writer::NoKey, 1)
            .generate_multi_angle_from_reference(&reference(), "navy suit", &ImageOptions::default())
            .await;

        match outcome {
            MultiAngleOutcome::Error { message, .. } => assert!(message.starts_with("Failed to generate back view")),
            other => panic!("expected error, got {other:?}"),
        }
        // front, left, then the failing back view; right is never attempted
        assert_eq!(backend.calls().len(), 3);
    }

    #[tokio::test]
    async fn reference_views_keep_angle_names() {
        let outcome = cascade(Arc::new(ScriptedBackend::working(&["edit-a"])), Writer::NoKey, 1)
            .generate_multi_angle_from_reference(&reference(), "navy suit", &ImageOptions::default())
            .await;
        match outcome {
            MultiAngleOutcome::Success { angles, parameters, .. } => {
                assert_eq!(angles, vec!["front", "left", "back", "right"]);
                assert_eq!(parameters.angles_count, None);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn variations_report_partial_and_error() {
        let backend = Arc::new(ScriptedBackend {
            poisoned_phrase: Some("Modern twist".into()),
            ..ScriptedBackend::working(&["img-a"])
        });
        let outcome = cascade(backend, Writer::NoKey, 1).generate_variations("navy suit", 3, &ImageOptions::default()).await;
        assert_eq!(outcome.status, BatchStatus::Partial);
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.variations.len(), 3);
        assert!(!outcome.variations[1].is_success());

        let none = cascade(Arc::new(ScriptedBackend::default()), Writer::NoKey, 1)
            .generate_variations("navy suit", 2, &ImageOptions::default())
            .await;
        assert_eq!(none.status, BatchStatus::Error);
        assert_eq!(none.count, 0);
    }

    #[tokio::test]
    async fn variation_count_is_clamped() {
        let backend = Arc::new(ScriptedBackend::working(&["img-a"]));
        let many = cascade(backend.clone(), Writer::NoKey, 1).generate_variations("x", 50, &ImageOptions::default()).await;
        assert_eq!(many.parameters.requested_count, MAX_VARIATIONS);
        assert_eq!(many.status, BatchStatus::Success);

        let zero = cascade(backend, Writer::NoKey, 1).generate_variations("x", 0, &ImageOptions::default()).await;
        assert_eq!(zero.variations.len(), 1);
    }

    #[tokio::test]
    async fn video_polls_until_done() {
        let backend = Arc::new(ScriptedBackend { polls_needed: 3, ..ScriptedBackend::working(&["veo-a"]) });
        let outcome = cascade(backend.clone(), Writer::NoKey, 5)
            .generate_video(&reference(), "navy suit", &VideoOptions::default())
            .await;
        match outcome {
            VideoOutcome::Success { parameters, mime_type, .. } => {
                assert_eq!(parameters.model.as_deref(), Some("veo-a"));
                assert_eq!(mime_type, "video/mp4");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(*backend.polls.lock(), 3);
    }

    #[tokio::test]
    async fn poll_timeout_moves_to_next_model() {
        // The shared poll counter means veo-b finishes after veo-a gave up.
        let backend = Arc::new(ScriptedBackend { polls_needed: 3, ..ScriptedBackend::working(&["veo-a", "veo-b"]) });
        let outcome = cascade(backend.clone(), Writer::NoKey, 2)
            .generate_video(&reference(), "navy suit", &VideoOptions::default())
            .await;
        match outcome {
            VideoOutcome::Success { parameters, .. } => assert_eq!(parameters.model.as_deref(), Some("veo-b")),
            other => panic!("expected success on the second model, got {other:?}"),
        }
        assert_eq!(backend.calls(), vec!["veo-a", "veo-b"]);
    }

    #[tokio::test]
    async fn video_fallback_uses_template_without_credential() {
        let outcome = cascade(Arc::new(ScriptedBackend::default()), Writer::NoKey, 1)
            .generate_video(&reference(), "navy suit", &VideoOptions { aspect_ratio: "16:9".into(), duration_seconds: 8 })
            .await;
        match outcome {
            VideoOutcome::Fallback { enhanced_prompt, message, parameters } => {
                assert!(enhanced_prompt.starts_with("360-degree fashion video: navy suit"));
                assert!(message.contains("CLAUDE_API_KEY"));
                assert_eq!(parameters.duration, 8);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }
}
