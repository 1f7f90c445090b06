use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::media::{GeneratedMedia, ImageOptions, JobStatus, MediaBackend, MediaError, ReferenceImage, VideoJob, VideoOptions};

pub const GEMINI_API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

// Bounds a single request, video downloads included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" || key == "bytesBase64Encoded" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn loggable(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut value) => {
            truncate_base64_in_json(&mut value);
            value.to_string()
        }
        Err(_) => body.chars().take(1000).collect(),
    }
}

/// Gemini, Imagen and Veo over the Generative Language REST API.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    key_vars: Vec<String>,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(DEFAULT_REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_vars: GEMINI_API_KEY_VARS.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Ok(client) = Client::builder().timeout(timeout).build() {
            self.client = client;
        }
        self
    }

    fn api_key(&self) -> Result<String, MediaError> {
        self.key_vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
            .ok_or(MediaError::MissingCredential)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<String, MediaError> {
        let api_key = self.api_key()?;
        info!("🔗 Making request to: {}", url);
        let mut logged = body.clone();
        truncate_base64_in_json(&mut logged);
        debug!("📤 Request body: {}", logged);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        let text = response.text().await.map_err(|e| MediaError::Http(e.to_string()))?;
        if !status.is_success() {
            error!("❌ API Error response: {}", loggable(&text));
            return Err(MediaError::Http(format!("status={} body={}", status, text)));
        }
        debug!("📥 Raw response: {}", loggable(&text));
        Ok(text)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, MediaError> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", loggable(&body));
            return Err(MediaError::Http(format!("status={} body={}", status, body)));
        }
        Ok(response)
    }

    async fn generate_content(&self, model: &str, parts: Vec<Value>, options: &ImageOptions) -> Result<GeneratedMedia, MediaError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let text = self.post_json(&url, &content_request(parts, options)).await?;
        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|e| MediaError::NoMedia(format!("parse error: {e}")))?;
        let media = extract_first_image(&parsed)?;
        info!("🖼️ {} returned {} ({} bytes)", model, media.mime_type, media.data.len());
        Ok(media)
    }

    async fn predict_image(&self, model: &str, prompt: &str, options: &ImageOptions) -> Result<GeneratedMedia, MediaError> {
        let url = format!("{}/models/{}:predict", self.base_url, model);
        let text = self.post_json(&url, &predict_request(prompt, options)).await?;
        let parsed: PredictResponse =
            serde_json::from_str(&text).map_err(|e| MediaError::NoMedia(format!("parse error: {e}")))?;
        let media = extract_first_prediction(&parsed)?;
        info!("🖼️ {} returned {} ({} bytes)", model, media.mime_type, media.data.len());
        Ok(media)
    }

    async fn download(&self, uri: &str) -> Result<GeneratedMedia, MediaError> {
        info!("⬇️ Downloading generated video");
        let response = self.get(uri).await?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or("video/mp4")
            .to_string();
        let data = response.bytes().await.map_err(|e| MediaError::Http(e.to_string()))?;
        if data.is_empty() {
            return Err(MediaError::NoMedia("downloaded video is empty".into()));
        }
        Ok(GeneratedMedia::new(data, mime_type))
    }
}

#[async_trait]
impl MediaBackend for GeminiClient {
    async fn generate_image(&self, model: &str, prompt: &str, options: &ImageOptions) -> Result<GeneratedMedia, MediaError> {
        if model.starts_with("imagen") {
            self.predict_image(model, prompt, options).await
        } else {
            self.generate_content(model, vec![json!({ "text": prompt })], options).await
        }
    }

    async fn restyle_image(
        &self,
        model: &str,
        reference: &ReferenceImage,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<GeneratedMedia, MediaError> {
        let parts = vec![
            json!({ "inlineData": { "mimeType": reference.mime_type, "data": reference.to_base64() } }),
            json!({ "text": prompt }),
        ];
        self.generate_content(model, parts, options).await
    }

    async fn submit_video(
        &self,
        model: &str,
        reference: &ReferenceImage,
        prompt: &str,
        options: &VideoOptions,
    ) -> Result<VideoJob, MediaError> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        let text = self.post_json(&url, &video_request(reference, prompt, options)).await?;
        let operation: Operation =
            serde_json::from_str(&text).map_err(|e| MediaError::JobFailed(format!("parse error: {e}")))?;
        if operation.name.is_empty() {
            return Err(MediaError::JobFailed("operation has no name".into()));
        }
        info!("⏳ Video job {} started on {}", operation.name, model);
        Ok(VideoJob { model: model.to_string(), name: operation.name })
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<JobStatus, MediaError> {
        let url = format!("{}/{}", self.base_url, job.name);
        let text = self.get(&url).await?.text().await.map_err(|e| MediaError::Http(e.to_string()))?;
        let operation: Operation =
            serde_json::from_str(&text).map_err(|e| MediaError::JobFailed(format!("parse error: {e}")))?;
        match operation_outcome(&operation)? {
            None => Ok(JobStatus::Pending),
            Some(VideoSource::Inline(media)) => Ok(JobStatus::Done(media)),
            Some(VideoSource::Uri(uri)) => Ok(JobStatus::Done(self.download(&uri).await?)),
        }
    }
}

// --- Request bodies ---

fn safety_settings() -> Vec<Value> {
    SAFETY_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
        .collect()
}

fn content_request(parts: Vec<Value>, options: &ImageOptions) -> Value {
    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": { "aspectRatio": options.aspect_ratio },
        },
        "safetySettings": safety_settings(),
    })
}

fn predict_request(prompt: &str, options: &ImageOptions) -> Value {
    json!({
        "instances": [{ "prompt": prompt }],
        "parameters": { "sampleCount": 1, "aspectRatio": options.aspect_ratio },
    })
}

fn video_request(reference: &ReferenceImage, prompt: &str, options: &VideoOptions) -> Value {
    json!({
        "instances": [{
            "prompt": prompt,
            "image": { "bytesBase64Encoded": reference.to_base64(), "mimeType": reference.mime_type },
        }],
        "parameters": {
            "aspectRatio": options.aspect_ratio,
            "durationSeconds": options.duration_seconds,
            "personGeneration": "allow_adult",
        },
    })
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    Other(Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Operation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoRef {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, PartialEq)]
enum VideoSource {
    Inline(GeneratedMedia),
    Uri(String),
}

fn decode(data: &str) -> Result<Bytes, MediaError> {
    base64::engine::general_purpose::STANDARD
        .decode(data.as_bytes())
        .map(Bytes::from)
        .map_err(|e| MediaError::NoMedia(format!("undecodable media: {e}")))
}

fn extract_first_image(resp: &GeminiResponse) -> Result<GeneratedMedia, MediaError> {
    for c in &resp.candidates {
        for p in &c.content.parts {
            match p {
                Part::Inline { inline_data } => {
                    info!("🎯 Found image data with mime type: {}", inline_data.mime_type);
                    return Ok(GeneratedMedia::new(decode(&inline_data.data)?, inline_data.mime_type.clone()));
                }
                Part::Text { text } => debug!("Model text part: {}", text),
                Part::Other(_) => {}
            }
        }
    }
    warn!("⚠️ No inline image data found in response structure");
    Err(MediaError::NoMedia("no image data in response".into()))
}

fn extract_first_prediction(resp: &PredictResponse) -> Result<GeneratedMedia, MediaError> {
    resp.predictions
        .iter()
        .find_map(|p| p.bytes_base64_encoded.as_deref().map(|data| (data, p.mime_type.as_deref())))
        .ok_or_else(|| MediaError::NoMedia("no predictions in response".into()))
        .and_then(|(data, mime)| Ok(GeneratedMedia::new(decode(data)?, mime.unwrap_or("image/png"))))
}

/// `None` while the job is still running.
fn operation_outcome(operation: &Operation) -> Result<Option<VideoSource>, MediaError> {
    if !operation.done {
        return Ok(None);
    }
    if let Some(err) = &operation.error {
        return Err(MediaError::JobFailed(err.message.clone()));
    }
    let video = operation
        .response
        .as_ref()
        .and_then(|r| r.generate_video_response.as_ref())
        .and_then(|r| r.generated_samples.iter().find_map(|s| s.video.as_ref()))
        .ok_or_else(|| MediaError::NoMedia("finished job returned no video".into()))?;

    if let Some(data) = video.bytes_base64_encoded.as_deref() {
        let mime = video.mime_type.clone().unwrap_or_else(|| "video/mp4".to_string());
        return Ok(Some(VideoSource::Inline(GeneratedMedia::new(decode(data)?, mime))));
    }
    video
        .uri
        .clone()
        .map(|uri| Some(VideoSource::Uri(uri)))
        .ok_or_else(|| MediaError::NoMedia("finished job returned no video".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn non_ascii_data_is_left_alone() {
        let text = format!("{}{}", "a".repeat(49), "é".repeat(60));
        let mut value = json!({ "inlineData": { "data": text.clone() } });
        truncate_base64_in_json(&mut value);
        assert_eq!(value["inlineData"]["data"], Value::String(text));

        let mut value = json!({ "data": "QUJD".repeat(40) });
        truncate_base64_in_json(&mut value);
        assert!(value["data"].as_str().unwrap().contains("[truncated 110 chars]"));
    }

    #[test]
    fn inline_image_is_decoded() {
        let parsed: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "Here is your outfit" },
                { "inlineData": { "mimeType": "image/png", "data": "YWJj" } }
            ] } }]
        }))
        .unwrap();
        let media = extract_first_image(&parsed).unwrap();
        assert_eq!(media.data.as_ref(), b"abc");
        assert_eq!(media.mime_type, "image/png");
    }

    #[test]
    fn text_only_response_has_no_media() {
        let parsed: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't draw that" }] } }]
        }))
        .unwrap();
        assert!(matches!(extract_first_image(&parsed), Err(MediaError::NoMedia(_))));
        let empty: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(extract_first_image(&empty).is_err());
    }

    #[test]
    fn imagen_prediction_is_decoded() {
        let parsed: PredictResponse = serde_json::from_value(json!({
            "predictions": [{ "bytesBase64Encoded": "YWJj", "mimeType": "image/jpeg" }]
        }))
        .unwrap();
        let media = extract_first_prediction(&parsed).unwrap();
        assert_eq!(media.mime_type, "image/jpeg");
        assert_eq!(media.data.as_ref(), b"abc");
    }

    #[test]
    fn running_operation_is_pending() {
        let op: Operation = serde_json::from_value(json!({ "name": "models/veo/operations/1" })).unwrap();
        assert_eq!(operation_outcome(&op).unwrap(), None);
    }

    #[test]
    fn finished_operation_yields_uri_or_bytes() {
        let op: Operation = serde_json::from_value(json!({
            "name": "op", "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://files.test/v.mp4" } }
            ] } }
        }))
        .unwrap();
        assert_eq!(operation_outcome(&op).unwrap(), Some(VideoSource::Uri("https://files.test/v.mp4".into())));

        let inline: Operation = serde_json::from_value(json!({
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "bytesBase64Encoded": "YWJj" } }
            ] } }
        }))
        .unwrap();
        match operation_outcome(&inline).unwrap() {
            Some(VideoSource::Inline(media)) => assert_eq!(media.mime_type, "video/mp4"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn failed_operation_reports_its_message() {
        let op: Operation = serde_json::from_value(json!({
            "done": true, "error": { "code": 3, "message": "person generation blocked" }
        }))
        .unwrap();
        match operation_outcome(&op) {
            Err(MediaError::JobFailed(message)) => assert_eq!(message, "person generation blocked"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn request_bodies_carry_options() {
        let options = ImageOptions { aspect_ratio: "1:1".into(), style: "editorial".into() };
        let body = content_request(vec![json!({ "text": "navy suit" })], &options);
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
        assert_eq!(body["safetySettings"].as_array().map(Vec::len), Some(4));
        assert_eq!(predict_request("navy suit", &options)["parameters"]["sampleCount"], 1);

        let reference = ReferenceImage { data: Bytes::from_static(b"abc"), mime_type: "image/jpeg".into() };
        let video = video_request(&reference, "spin", &VideoOptions { aspect_ratio: "9:16".into(), duration_seconds: 8 });
        assert_eq!(video["instances"][0]["image"]["bytesBase64Encoded"], "YWJj");
        assert_eq!(video["instances"][0]["image"]["mimeType"], "image/jpeg");
        assert_eq!(video["parameters"]["durationSeconds"], 8);
        assert_eq!(video["parameters"]["personGeneration"], "allow_adult");
    }

    #[test]
    fn long_base64_is_truncated_for_logs() {
        let blob = "A".repeat(200);
        let mut value = json!({ "parts": [{ "inlineData": { "data": blob.clone() } }], "data": "short" });
        truncate_base64_in_json(&mut value);
        let data = value["parts"][0]["inlineData"]["data"].as_str().unwrap();
        assert!(data.ends_with("...[truncated 150 chars]"));
        assert_eq!(value["data"], "short");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let mut client = GeminiClient::new("http://127.0.0.1:9");
        client.key_vars = vec!["TREND_STYLIST_TEST_UNSET_GEMINI".to_string()];
        let err = client.generate_image("gemini-2.5-flash-image", "x", &ImageOptions::default()).await.unwrap_err();
        assert!(matches!(err, MediaError::MissingCredential));
    }
}
