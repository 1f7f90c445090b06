use axum::{
    extract::{FromRequest, FromRequestParts, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    cascade::{ImageOutcome, MediaCascade, MultiAngleOutcome, VariationsOutcome, VideoOutcome, DEFAULT_VARIATIONS},
    error::AppError,
    llm::{extract_json_payload, TextGenerator},
    media::{ImageOptions, ReferenceImage, VideoOptions},
    models::{Envelope, ImageRequest, MultiAngleRequest, StyleRequest, StyleResponse, TrendSummary, VariationsRequest, VideoRequest},
    prompts::{build_style_prompt, STYLIST_SYSTEM_PROMPT},
    store::{TrendQuery, TrendStore},
};

const STYLE_TREND_LIMIT: usize = 40;
const STYLE_MAX_TOKENS: u32 = 4000;
const MAX_VIDEO_SECONDS: u32 = 8;

/// JSON body whose decoding failures render as `{"detail"}` with a 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Clone)]
pub struct AppState {
    pub store: TrendStore,
    pub stylist: Arc<dyn TextGenerator>,
    pub cascade: Arc<MediaCascade>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/api/trends", get(list_trends))
        .route("/api/style", post(generate_style))
        .route("/api/generate-image", post(generate_image))
        .route("/api/generate-multi-angle", post(generate_multi_angle))
        .route("/api/generate-outfit-variations", post(generate_outfit_variations))
        .route("/api/generate-video", post(generate_video))
        .fallback(not_found)
        .with_state(state)
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "Trend Stylist API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "trends": "GET /api/trends",
            "styling": "POST /api/style",
            "image_generation": "POST /api/generate-image",
            "outfit_variations": "POST /api/generate-outfit-variations",
            "multi_angle_images": "POST /api/generate-multi-angle",
            "video_generation": "POST /api/generate-video",
            "health": "GET /health",
            "stats": "GET /stats"
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Response {
    match state.store.count().await {
        Ok(count) => Json(json!({ "status": "healthy", "database": "connected", "trends_available": count })).into_response(),
        Err(e) => {
            warn!("⚠️ Health check could not reach the trend store: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "unavailable", "trends_available": 0 })),
            )
                .into_response()
        }
    }
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let count = state.store.count().await?;
    Ok(Json(json!({ "total_trends": count, "database_ready": count > 0 })))
}

fn default_region() -> String { "Global".to_string() }
fn default_limit() -> usize { 10 }

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub occasion_type: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn list_trends(State(state): State<AppState>, ApiQuery(params): ApiQuery<TrendsParams>) -> Result<Json<Value>, AppError> {
    let occasion = params.occasion_type.as_deref().map(str::trim).filter(|o| !o.is_empty());

    let mut query = TrendQuery::recent(params.limit);
    if !params.region.eq_ignore_ascii_case("global") {
        query = query.in_region(params.region.as_str());
    }
    if let Some(occasion) = occasion {
        query = query.with_contexts([occasion]);
    }

    let trends: Vec<TrendSummary> = state.store.query(&query).await?.iter().map(TrendSummary::from).collect();
    info!("📋 Listing {} trends for region '{}'", trends.len(), params.region);
    Ok(Json(json!({
        "success": true,
        "count": trends.len(),
        "trends": trends,
        "region": params.region,
        "filters": { "region": params.region, "occasion_type": occasion, "limit": params.limit },
    })))
}

pub async fn generate_style(State(state): State<AppState>, ApiJson(request): ApiJson<StyleRequest>) -> Result<Json<StyleResponse>, AppError> {
    request.validate()?;
    let occasion = &request.context;
    info!("👗 Styling request: {} in {}", occasion.occasion_type.as_str(), occasion.region);

    let query = TrendQuery::recent(STYLE_TREND_LIMIT)
        .in_region(occasion.region.as_str())
        .with_contexts([occasion.occasion_type.as_str()]);
    let mut trends = state.store.query(&query).await?;
    if trends.is_empty() {
        warn!("⚠️ No trends found for region={}, using global trends", occasion.region);
        trends = state.store.query(&TrendQuery::recent(STYLE_TREND_LIMIT).in_region("global")).await?;
    }
    info!("Using {} trends for styling recommendation", trends.len());

    let prompt = build_style_prompt(&request.user_profile, occasion, &trends);
    let reply = state.stylist.call_json(STYLIST_SYSTEM_PROMPT, &prompt, STYLE_MAX_TOKENS).await?;
    let response = parse_style_reply(&reply)?;

    info!("✅ Style guide ready: {}", response.style_guide.title);
    Ok(Json(response))
}

/// Checks a stylist reply in order: JSON, both sections, schema, content.
fn parse_style_reply(reply: &str) -> Result<StyleResponse, AppError> {
    let document: Value = serde_json::from_str(extract_json_payload(reply)).map_err(|e| {
        let preview: String = reply.chars().take(500).collect();
        warn!("❌ Stylist reply is not JSON ({}): {}...", e, preview);
        AppError::Validation("Invalid JSON response from styling engine".into())
    })?;

    if document.get("style_guide").is_none() || document.get("media_prompts").is_none() {
        return Err(AppError::Validation("Incomplete response from styling engine".into()));
    }

    let response: StyleResponse = serde_json::from_value(document)
        .map_err(|e| AppError::Validation(format!("Response validation error: {e}")))?;
    response
        .validate()
        .map_err(|e| AppError::Validation(format!("Response validation error: {e}")))?;
    if let Some(field) = response.blank_media_prompt() {
        return Err(AppError::Validation(format!("Response validation error: {field} is empty")));
    }
    Ok(response)
}

pub async fn generate_image(State(state): State<AppState>, ApiJson(request): ApiJson<ImageRequest>) -> Result<Json<Envelope<ImageOutcome>>, AppError> {
    request.validate()?;
    let options = ImageOptions { aspect_ratio: request.aspect_ratio, style: request.style };
    let outcome = state.cascade.generate_image(&request.prompt, &options).await;
    Ok(Json(Envelope::ok(outcome)))
}

pub async fn generate_multi_angle(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MultiAngleRequest>,
) -> Result<Json<Envelope<MultiAngleOutcome>>, AppError> {
    request.validate()?;
    let options = ImageOptions { aspect_ratio: request.aspect_ratio, style: request.style };
    let reference = request.image_base64.as_deref().filter(|raw| !raw.trim().is_empty());

    let outcome = match reference {
        Some(raw) => {
            let reference = ReferenceImage::from_base64(raw)?;
            state.cascade.generate_multi_angle_from_reference(&reference, &request.prompt, &options).await
        }
        None => state.cascade.generate_multi_angle(&request.prompt, &options).await,
    };
    Ok(Json(Envelope::ok(outcome)))
}

pub async fn generate_outfit_variations(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VariationsRequest>,
) -> Result<Json<Envelope<VariationsOutcome>>, AppError> {
    request.validate()?;
    let count = request.count.map(|c| c as usize).unwrap_or(DEFAULT_VARIATIONS);
    let options = ImageOptions { aspect_ratio: request.aspect_ratio, style: request.style };
    let outcome = state.cascade.generate_variations(&request.prompt, count, &options).await;
    Ok(Json(Envelope::ok(outcome)))
}

pub async fn generate_video(State(state): State<AppState>, ApiJson(request): ApiJson<VideoRequest>) -> Result<Json<Envelope<VideoOutcome>>, AppError> {
    request.validate()?;
    let reference = ReferenceImage::from_base64(&request.image_base64)?;
    let options = VideoOptions {
        aspect_ratio: request.aspect_ratio,
        duration_seconds: request.duration.clamp(1, MAX_VIDEO_SECONDS),
    };
    let outcome = state.cascade.generate_video(&reference, &request.prompt, &options).await;
    Ok(Json(Envelope::ok(outcome)))
}

pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("Endpoint {} not found", uri.path()),
            "available_endpoints": ["/", "/health", "/stats", "/api/trends", "/api/style"]
        })),
    )
        .into_response()
}
