use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use validator::Validate;

// --- Trend records ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenderFocus { #[default] All, Men, Women }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Formality { #[default] Casual, SmartCasual, SemiFormal, Formal }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Confidence { High, #[default] Medium, Low }

impl GenderFocus {
    pub fn as_str(&self) -> &'static str {
        match self { GenderFocus::All => "all", GenderFocus::Men => "men", GenderFocus::Women => "women" }
    }
}

impl Formality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Formality::Casual => "casual",
            Formality::SmartCasual => "smart_casual",
            Formality::SemiFormal => "semi_formal",
            Formality::Formal => "formal",
        }
    }
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self { Confidence::High => "high", Confidence::Medium => "medium", Confidence::Low => "low" }
    }
}

fn default_season() -> String { "All season".to_string() }
fn default_region() -> String { "global".to_string() }

/// A trend as produced by extraction, before it is stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct NewTrend {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default = "default_season")]
    pub season: String,
    #[serde(default)]
    pub garment_types: Vec<String>,
    #[serde(default)]
    pub gender_focus: GenderFocus,
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default)]
    pub colour_palette: Vec<String>,
    #[serde(default)]
    pub fit_notes: Option<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub formality: Formality,
    #[serde(default)]
    pub climate_suitability: Vec<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub key_items: Vec<String>,
    #[serde(default)]
    pub avoid_for_body_types: Vec<String>,
    #[serde(default)]
    pub source_title: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendRecord {
    pub id: i64,
    pub name: String,
    pub season: String,
    pub garment_types: Vec<String>,
    pub gender_focus: GenderFocus,
    pub style_tags: Vec<String>,
    pub colour_palette: Vec<String>,
    pub fit_notes: Option<String>,
    pub contexts: Vec<String>,
    pub formality: Formality,
    pub climate_suitability: Vec<String>,
    pub region: String,
    pub key_items: Vec<String>,
    pub avoid_for_body_types: Vec<String>,
    pub source_title: String,
    pub source_url: String,
    pub published_at: String,
    pub confidence: Confidence,
    pub created_at: DateTime<Utc>,
}

/// What the trends listing exposes of a record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendSummary {
    pub name: String,
    pub season: String,
    pub style_tags: Vec<String>,
    pub colour_palette: Vec<String>,
    pub key_items: Vec<String>,
    pub contexts: Vec<String>,
    pub formality: Formality,
    pub region: String,
    pub fit_notes: String,
}

impl From<&TrendRecord> for TrendSummary {
    fn from(t: &TrendRecord) -> Self {
        Self {
            name: t.name.clone(),
            season: t.season.clone(),
            style_tags: t.style_tags.clone(),
            colour_palette: t.colour_palette.clone(),
            key_items: t.key_items.clone(),
            contexts: t.contexts.clone(),
            formality: t.formality,
            region: t.region.clone(),
            fit_notes: t.fit_notes.clone().unwrap_or_default(),
        }
    }
}

// --- Styling request ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenderExpression { Male, Female, Androgynous, Other }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkinTone { Fair, Light, Wheatish, Medium, Tan, Deep, Dark }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Climate { Warm, Hot, Temperate, Cold, Humid, Dry, Mixed }

/// Budget tier of a user, and price band of a recommended piece.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier { Low, Medium, High }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OccasionType { Office, Date, WeddingGuest, Festival, Vacation, Party, CasualOuting }

impl OccasionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccasionType::Office => "office",
            OccasionType::Date => "date",
            OccasionType::WeddingGuest => "wedding_guest",
            OccasionType::Festival => "festival",
            OccasionType::Vacation => "vacation",
            OccasionType::Party => "party",
            OccasionType::CasualOuting => "casual_outing",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay { #[default] Day, Evening, Night }

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct UserProfile {
    #[validate(range(min = 13, max = 100))]
    pub age: u32,
    pub gender_expression: GenderExpression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub body_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_tone: Option<SkinTone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 100, max = 250))]
    pub height_cm: Option<u32>,
    #[serde(alias = "climate")]
    pub location_climate: Climate,
    #[serde(default)]
    pub style_preferences: Vec<String>,
    #[serde(default)]
    pub colour_blocklist: Vec<String>,
    #[serde(default)]
    pub comfort_constraints: Vec<String>,
    pub budget_level: PriceTier,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct OccasionContext {
    pub occasion_type: OccasionType,
    pub formality: Formality,
    #[serde(default)]
    pub time_of_day: TimeOfDay,
    #[serde(default)]
    pub cultural_notes: String,
    #[serde(default)]
    pub location_city: String,
    #[validate(length(min = 1))]
    pub region: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct StyleRequest {
    #[validate(nested)]
    pub user_profile: UserProfile,
    #[serde(alias = "occasion")]
    #[validate(nested)]
    pub context: OccasionContext,
}

// --- Styling response ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct KeyPiece {
    pub item_type: String,
    pub description: String,
    pub fit: String,
    pub price_band: PriceTier,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColourPalette {
    pub primary: Vec<String>,
    #[serde(default)]
    pub accent: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct StyleGuide {
    pub title: String,
    pub one_line_summary: String,
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub key_pieces: Vec<KeyPiece>,
    pub colour_palette: ColourPalette,
    pub fabrics_textures: Vec<String>,
    pub footwear: String,
    #[serde(default)]
    pub accessories: Vec<String>,
    pub grooming_hair: String,
    pub dos: Vec<String>,
    pub donts: Vec<String>,
    #[serde(default)]
    pub trend_references: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MediaPrompts {
    pub image_prompt: String,
    pub video_prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct StyleResponse {
    #[validate(nested)]
    pub style_guide: StyleGuide,
    pub media_prompts: MediaPrompts,
}

impl StyleResponse {
    /// Names the first media prompt that is blank, if any.
    pub fn blank_media_prompt(&self) -> Option<&'static str> {
        if self.media_prompts.image_prompt.trim().is_empty() {
            Some("image_prompt")
        } else if self.media_prompts.video_prompt.trim().is_empty() {
            Some("video_prompt")
        } else {
            None
        }
    }
}

// --- Media requests ---

fn default_aspect_ratio() -> String { "9:16".to_string() }
fn default_style() -> String { "photorealistic".to_string() }
fn default_duration() -> u32 { 6 }

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct ImageRequest {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_style")]
    pub style: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct VariationsRequest {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_style")]
    pub style: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct MultiAngleRequest {
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_style")]
    pub style: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct VideoRequest {
    #[validate(length(min = 1))]
    pub image_base64: String,
    #[validate(length(min = 1))]
    pub prompt: String,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

/// Wrapper every media endpoint replies with.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self { Self { success: true, data } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn new_trend_fills_defaults() {
        let trend: NewTrend = serde_json::from_value(json!({ "name": "Wide Leg Trousers" })).unwrap();
        assert_eq!(trend.season, "All season");
        assert_eq!(trend.gender_focus, GenderFocus::All);
        assert_eq!(trend.formality, Formality::Casual);
        assert_eq!(trend.region, "global");
        assert_eq!(trend.confidence, Confidence::Medium);
        assert!(trend.contexts.is_empty());
        assert!(trend.published_at.is_none());
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let parsed = serde_json::from_value::<NewTrend>(json!({ "name": "X", "gender_focus": "unisex" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn short_style_request_is_accepted() {
        let request: StyleRequest = serde_json::from_value(json!({
            "user_profile": { "age": 29, "gender_expression": "female", "budget_level": "medium", "climate": "warm" },
            "context": { "occasion_type": "office", "formality": "smart_casual", "region": "India" }
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.context.time_of_day, TimeOfDay::Day);
        assert_eq!(request.user_profile.location_climate, Climate::Warm);
    }

    #[test]
    fn out_of_range_age_fails_validation() {
        let request: StyleRequest = serde_json::from_value(json!({
            "user_profile": { "age": 9, "gender_expression": "male", "budget_level": "low", "location_climate": "cold" },
            "context": { "occasion_type": "party", "formality": "casual", "region": "Europe" }
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn style_guide_without_key_pieces_fails_validation() {
        let response: StyleResponse = serde_json::from_value(json!({
            "style_guide": {
                "title": "t", "one_line_summary": "s", "key_pieces": [],
                "colour_palette": { "primary": ["navy"] }, "fabrics_textures": [],
                "footwear": "loafers", "grooming_hair": "neat", "dos": [], "donts": []
            },
            "media_prompts": { "image_prompt": "a", "video_prompt": "b" }
        }))
        .unwrap();
        assert!(response.validate().is_err());
    }

    #[test]
    fn blank_media_prompt_is_reported() {
        let prompts = MediaPrompts { image_prompt: "look".into(), video_prompt: "  ".into() };
        let response = StyleResponse {
            style_guide: StyleGuide {
                title: "t".into(),
                one_line_summary: "s".into(),
                key_pieces: vec![],
                colour_palette: ColourPalette { primary: vec![], accent: vec![] },
                fabrics_textures: vec![],
                footwear: String::new(),
                accessories: vec![],
                grooming_hair: String::new(),
                dos: vec![],
                donts: vec![],
                trend_references: vec![],
            },
            media_prompts: prompts,
        };
        assert_eq!(response.blank_media_prompt(), Some("video_prompt"));
    }
}
