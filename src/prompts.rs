//! Prompt templates. Everything here is a pure function of its arguments.

use chrono::{DateTime, Utc};

use crate::media::{ImageOptions, VideoOptions};
use crate::models::{OccasionContext, TrendRecord, UserProfile};

/// Most trends summarised into a styling prompt.
pub const MAX_PROMPT_TRENDS: usize = 30;
pub const NO_TRENDS_PHRASE: &str = "No specific trends available";

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a fashion trend analyst specialized in extracting structured, actionable fashion trends from articles and content.

Your role is to:
1. Identify concrete, wearable fashion trends (specific garments, cuts, styling approaches)
2. Ignore vague concepts unless paired with specific clothing items
3. Extract all relevant metadata (season, colours, contexts, etc.)
4. Output clean, valid JSON that matches the provided schema exactly

You always respond with pure JSON arrays, never with explanatory text or markdown formatting.";

pub const STYLIST_SYSTEM_PROMPT: &str = "You are an expert personal fashion stylist with deep knowledge of current trends, body types, cultural contexts, and personal style.

Your role is to:
1. Create personalized, wearable outfit recommendations
2. Respect all user constraints (comfort, budget, colour preferences)
3. Consider cultural context and occasion appropriateness
4. Reference current fashion trends where relevant
5. Provide complete styling guidance from garments to grooming

You always respond with pure JSON matching the exact output schema provided, with no additional text or markdown formatting. Your recommendations are specific, practical, and tailored to each individual user.";

pub fn build_extraction_prompt(article_text: &str, source_title: &str, source_url: &str) -> String {
    build_extraction_prompt_at(article_text, source_title, source_url, Utc::now())
}

pub fn build_extraction_prompt_at(
    article_text: &str,
    source_title: &str,
    source_url: &str,
    analysed_at: DateTime<Utc>,
) -> String {
    let today = analysed_at.to_rfc3339();
    format!(
        r#"You are a fashion trend analyst extracting concrete, wearable fashion trends from articles.

SOURCE INFORMATION:
- Title: {source_title}
- URL: {source_url}
- Analysis Date: {today}

ARTICLE CONTENT:
{article_text}

TASK:
Extract fashion trends from this article and output ONLY a valid JSON array of trend objects. Do NOT include any other text, explanations, or markdown formatting - just the raw JSON array.

Each trend object must follow this exact schema:
{{
  "name": "Short descriptive name (e.g., 'Wide Leg Tailored Trousers')",
  "season": "Season (e.g., 'SS2026', 'AW2025', or 'All season' if not specified)",
  "garment_types": ["List of garment types, e.g., 'trousers', 'blazer', 'dress'"],
  "gender_focus": "One of: 'all', 'men', or 'women' (default 'all' if not specified)",
  "style_tags": ["Style keywords: 'office', 'streetwear', 'classic', 'party', 'ethnic', 'minimal', 'boho', etc."],
  "colour_palette": ["List of colours mentioned, e.g., 'navy', 'cream', 'terracotta'"],
  "fit_notes": "Brief description of fit and silhouette (e.g., 'relaxed fit with tapered ankle')",
  "contexts": ["Where it's worn: 'office', 'wedding_guest', 'vacation', 'party', 'casual_outing', 'festival', 'date'"],
  "formality": "One of: 'casual', 'smart_casual', 'semi_formal', or 'formal'",
  "climate_suitability": ["Climate types: 'warm', 'hot', 'cold', 'humid', 'temperate', 'dry'"],
  "region": "Geographic relevance: 'global', 'india', 'europe', 'us', 'asia', etc. (default 'global')",
  "key_items": ["Specific garments that make up this trend, e.g., 'linen blazer', 'wide leg trousers', 'loafers'"],
  "avoid_for_body_types": ["Body types that should avoid this (can be empty list)"],
  "source_title": "{source_title}",
  "source_url": "{source_url}",
  "published_at": "{today}",
  "confidence": "One of: 'high', 'medium', or 'low' (default 'medium')"
}}

IMPORTANT RULES:
1. Only extract CONCRETE, WEARABLE trends - specific garments, cuts, or styling approaches
2. Ignore vague concepts like "rebellious energy" unless they come with specific clothing items
3. If a field is not mentioned in the article, use these defaults:
   - season: "All season"
   - gender_focus: "all"
   - region: "global"
   - confidence: "medium"
   - Empty lists for array fields if no info available
4. Keep names short and descriptive (3-6 words max)
5. Be specific about garments in key_items
6. Output ONLY the JSON array, no explanatory text before or after
7. Ensure the JSON is valid (proper quotes, no trailing commas)

Extract all concrete fashion trends you can find and output them as a JSON array."#
    )
}

/// One numbered line per trend, newest first, capped at [`MAX_PROMPT_TRENDS`].
pub fn summarize_trends(trends: &[TrendRecord]) -> String {
    if trends.is_empty() {
        return NO_TRENDS_PHRASE.to_string();
    }
    trends
        .iter()
        .take(MAX_PROMPT_TRENDS)
        .enumerate()
        .map(|(i, trend)| {
            let mut line = format!("{}. {} ({})", i + 1, trend.name, trend.season);
            if !trend.style_tags.is_empty() {
                line.push_str(&format!(" - Tags: {}", first_three(&trend.style_tags)));
            }
            if !trend.key_items.is_empty() {
                line.push_str(&format!(" - Items: {}", first_three(&trend.key_items)));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_three(values: &[String]) -> String {
    values.iter().take(3).map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub fn build_style_prompt(profile: &UserProfile, occasion: &OccasionContext, trends: &[TrendRecord]) -> String {
    let profile_text = serde_json::to_string_pretty(profile).unwrap_or_default();
    let occasion_text = serde_json::to_string_pretty(occasion).unwrap_or_default();
    let trends_text = summarize_trends(trends);

    format!(
        r#"You are a personal fashion stylist. Your task is to create a personalized outfit recommendation.

OUTPUT REQUIREMENT:
You must respond with ONLY valid JSON matching the exact schema below. No additional text, explanations, or markdown - just pure JSON.

USER PROFILE:
{profile_text}

OCCASION CONTEXT:
{occasion_text}

CURRENT FASHION TRENDS (for inspiration):
{trends_text}

STYLING REQUIREMENTS:
1. RESPECT ALL CONSTRAINTS:
   - Honour ALL comfort_constraints (e.g., if "no heels", never suggest heels)
   - Never recommend ANY colour in colour_blocklist
   - Match budget_level (low = affordable/high-street, medium = mid-range, high = premium/designer)
   - Consider location_climate and region for appropriate fabrics and styles

2. OCCASION APPROPRIATENESS:
   - Match the formality level exactly
   - Consider cultural_notes (especially important for regions like India, Middle East, etc.)
   - Appropriate for time_of_day and occasion_type

3. PERSONALIZATION:
   - Use style_preferences as guidance
   - Consider body_type and skin_tone for flattering choices
   - Reference at least 1-2 current trends from the list where appropriate

4. PRACTICALITY:
   - Recommend real, wearable outfits
   - Be specific about garments (not vague descriptions)
   - Keep it achievable within the user's context

5. COMPLETENESS:
   - Include 3-5 key pieces
   - Specify colours, fabrics, footwear, and accessories
   - Provide clear dos and don'ts
   - Generate media prompts for image and video generation

REQUIRED JSON OUTPUT SCHEMA:
{{
  "style_guide": {{
    "title": "Short catchy title for this look (e.g., 'Modern Minimalist Office Chic')",
    "one_line_summary": "One sentence describing the overall vibe",
    "key_pieces": [
      {{
        "item_type": "Type of garment (e.g., 'trousers', 'shirt', 'blazer', 'dress', 'saree')",
        "description": "Specific description (e.g., 'Wide-leg navy trousers in cotton blend')",
        "fit": "Fit description (e.g., 'relaxed', 'slim', 'boxy', 'tailored')",
        "price_band": "One of: 'low', 'medium', or 'high'"
      }}
    ],
    "colour_palette": {{
      "primary": ["Main colours", "e.g. navy, cream"],
      "accent": ["Accent colours", "e.g. rust, gold"]
    }},
    "fabrics_textures": ["List of fabrics/textures", "e.g. cotton, linen, silk"],
    "footwear": "Specific footwear recommendation (e.g., 'White leather sneakers or tan loafers')",
    "accessories": ["List of accessories", "e.g. 'Minimal gold hoops', 'Structured tote bag'"],
    "grooming_hair": "Hair and grooming guidance (1-2 sentences)",
    "dos": ["List of styling dos", "e.g. 'Keep jewelry minimal', 'Tuck in the shirt'"],
    "donts": ["List of styling don'ts", "e.g. 'Avoid over-accessorizing', 'Skip heavy prints'"],
    "trend_references": ["Names of trends from the list used", "or empty list if none"]
  }},
  "media_prompts": {{
    "image_prompt": "A detailed prompt for generating a static outfit image showing [describe the complete outfit, colours, fit, styling, setting]. Make it specific and visual.",
    "video_prompt": "A detailed prompt for generating a 360-degree video showing [describe how the outfit looks from all angles, movement, drape, fit, setting]. Include camera movement description."
  }}
}}

CRITICAL:
- Output ONLY the JSON object above, nothing else
- Ensure valid JSON (proper quotes, no trailing commas, correct nesting)
- All text fields must be strings, arrays must be arrays
- Be concise but specific in all descriptions
- Make the media prompts detailed enough for AI image/video generation

Generate the styling recommendation now as pure JSON:"#
    )
}

// --- Media direction ---

/// Camera angles used when rendering a look from its description.
pub const TEXT_ANGLES: [(&str, &str); 4] = [
    ("front", "Front view, facing camera directly, centered pose"),
    ("left", "Left side profile view, 90 degrees to the left, showing full side silhouette"),
    ("rear", "Rear view, back facing camera, showing outfit from behind"),
    ("right", "Right side profile view, 90 degrees to the right, showing full side silhouette"),
];

/// Camera angles used when re-rendering a reference image.
pub const REFERENCE_ANGLES: [(&str, &str); 4] = [
    ("front", "Show the exact same person and outfit from the front view, facing camera directly"),
    ("left", "Show the exact same person and outfit from the left side profile, 90 degrees left"),
    ("back", "Show the exact same person and outfit from the back view, back facing camera"),
    ("right", "Show the exact same person and outfit from the right side profile, 90 degrees right"),
];

const VARIATION_MODIFIERS: [&str; 3] = [
    "Styling variation 1: Classic interpretation with traditional accessories",
    "Styling variation 2: Modern twist with contemporary accessories and bold styling choices",
    "Styling variation 3: Fashion-forward approach with unique accessories and creative details",
];

pub fn image_direction(description: &str, options: &ImageOptions) -> String {
    format!(
        "Generate a high-quality fashion photograph with these specifications:

{description}

Style: {style}, professional fashion editorial
Aspect ratio: {aspect}
Lighting: Professional studio lighting with soft shadows
Focus: Sharp focus on clothing details and fit
Quality: High resolution, suitable for fashion magazine
Composition: Full body shot, model in neutral pose showcasing the complete outfit
Background: Clean, minimal background that doesn't distract from the outfit
Mood: Professional, elegant, fashion-forward
",
        style = options.style,
        aspect = options.aspect_ratio,
    )
}

pub fn video_direction(description: &str) -> String {
    format!(
        "Cinematic fashion video animation. {description}

CAMERA & MOVEMENT:
- Smooth 360-degree rotation around the model
- Starting position: Front view, centered
- Movement: Slow clockwise rotation, completing full circle
- Camera movement: Professional cinematic push-in and orbit
- Maintain sharp focus on outfit details throughout

MODEL BEHAVIOR:
- Subject stands confidently in professional pose
- Gentle, natural movements: slight weight shift, fabric sway
- Model may turn slowly in sync with camera
- Hands at sides or on hips
- Maintain elegant, professional demeanor

LIGHTING & QUALITY:
- Professional studio lighting with soft shadows
- Lighting shifts naturally as camera moves
- Highlight fabric textures, drape, and fit
- Show how outfit looks from all angles
- High-resolution, smooth transitions

MOOD:
- Professional, elegant, fashion-forward
- Suitable for e-commerce or fashion magazine
- Natural fabric movement and flow
"
    )
}

pub fn angle_prompt(description: &str, angle_phrase: &str) -> String {
    format!("{description}. {angle_phrase}. Same person, same outfit, professional studio photography.")
}

pub fn reference_angle_prompt(angle_instruction: &str, description: &str, options: &ImageOptions) -> String {
    format!(
        "{angle_instruction}.

Maintain the exact same:
- Person (same face, body type, skin tone)
- Outfit (same dress/clothing items, colors, patterns)
- Accessories (same clutch, jewelry, shoes)
- Styling (same hair, makeup)

Additional context: {description}

Style: {style}, professional fashion photography
Lighting: Professional studio lighting
Quality: High resolution fashion editorial
",
        style = options.style,
    )
}

/// Modifier for the zero-based `index`-th variation.
pub fn variation_modifier(index: usize) -> String {
    VARIATION_MODIFIERS
        .get(index)
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("Styling variation {}", index + 1))
}

pub fn variation_prompt(description: &str, index: usize) -> String {
    format!("{description}. {}", variation_modifier(index))
}

// --- Degraded output ---

pub fn image_enhancement_request(description: &str) -> String {
    format!(
        "Generate a detailed, visual description for an AI image generator based on this fashion outfit description:

{description}

Make it specific, visual, and suitable for image generation.
Include details about:
- Exact clothing items and colors
- Fabric textures and materials
- Lighting setup (studio, natural, dramatic)
- Camera angle and composition
- Model pose and expression
- Background and setting
- Fashion photography style

Output only the enhanced prompt, nothing else."
    )
}

pub fn video_enhancement_request(description: &str, options: &VideoOptions) -> String {
    format!(
        "Generate a detailed, visual description for an AI VIDEO generator to create a 360-degree fashion showcase video based on this outfit:

{description}

The video should be {duration} seconds long in {aspect} aspect ratio.

Make it specific, visual, and suitable for video generation.
Include details about:
- Camera movement (360-degree rotation)
- Model pose and movement
- Lighting setup and how it changes during rotation
- Specific angles to emphasize (front, sides, back)
- Fabric movement and drape
- Background and setting
- Fashion video style
- Transitions and pacing

Output only the enhanced video prompt, nothing else.",
        duration = options.duration_seconds,
        aspect = options.aspect_ratio,
    )
}

pub fn basic_image_prompt(description: &str, options: &ImageOptions) -> String {
    format!(
        "Fashion photography: {description}

Style: {style}, high-quality professional fashion editorial
Aspect ratio: {aspect}
Professional studio lighting, sharp focus, high resolution
Editorial quality, suitable for fashion magazine
Model in neutral pose showcasing the complete outfit
Clean background, emphasis on clothing details and fit",
        style = options.style,
        aspect = options.aspect_ratio,
    )
}

pub fn basic_video_prompt(description: &str, options: &VideoOptions) -> String {
    format!(
        "360-degree fashion video: {description}

Duration: {duration} seconds
Aspect ratio: {aspect}
Camera: Smooth 360-degree rotation around model
Lighting: Professional studio lighting
Model: Standing pose, slow rotation to show all angles
Focus: Sharp on outfit details, fabric drape and movement
Background: Clean, minimal, professional
Quality: High resolution, smooth transitions
Style: Fashion editorial, e-commerce presentation",
        duration = options.duration_seconds,
        aspect = options.aspect_ratio,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Climate, Confidence, Formality, GenderExpression, GenderFocus, OccasionType, PriceTier, TimeOfDay,
    };
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn profile() -> UserProfile {
        UserProfile {
            age: 29,
            gender_expression: GenderExpression::Female,
            body_type: Some("average".into()),
            skin_tone: None,
            height_cm: Some(165),
            location_climate: Climate::Warm,
            style_preferences: vec!["minimal".into()],
            colour_blocklist: vec!["neon green".into()],
            comfort_constraints: vec!["no heels".into()],
            budget_level: PriceTier::Medium,
        }
    }

    fn occasion() -> OccasionContext {
        OccasionContext {
            occasion_type: OccasionType::Office,
            formality: Formality::SmartCasual,
            time_of_day: TimeOfDay::Day,
            cultural_notes: "Indian tech office".into(),
            location_city: "Bengaluru".into(),
            region: "India".into(),
        }
    }

    fn record(id: i64, name: &str, tags: &[&str], items: &[&str]) -> TrendRecord {
        TrendRecord {
            id,
            name: name.into(),
            season: "SS2026".into(),
            garment_types: vec![],
            gender_focus: GenderFocus::All,
            style_tags: tags.iter().map(|s| s.to_string()).collect(),
            colour_palette: vec![],
            fit_notes: None,
            contexts: vec!["office".into()],
            formality: Formality::SmartCasual,
            climate_suitability: vec![],
            region: "global".into(),
            key_items: items.iter().map(|s| s.to_string()).collect(),
            avoid_for_body_types: vec![],
            source_title: String::new(),
            source_url: String::new(),
            published_at: "2026-01-01".into(),
            confidence: Confidence::Medium,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_trend_list_uses_fallback_phrase() {
        let prompt = build_style_prompt(&profile(), &occasion(), &[]);
        assert!(prompt.contains(&format!("CURRENT FASHION TRENDS (for inspiration):\n{NO_TRENDS_PHRASE}\n")));
        assert!(prompt.contains("\"neon green\""));
        assert!(prompt.contains("\"Bengaluru\""));
    }

    #[test]
    fn trend_lines_keep_three_tags_and_items() {
        let trends = vec![record(1, "Wide Leg Trousers", &["office", "minimal", "classic", "boho"], &["a", "b", "c", "d"])];
        assert_eq!(
            summarize_trends(&trends),
            "1. Wide Leg Trousers (SS2026) - Tags: office, minimal, classic - Items: a, b, c"
        );
    }

    #[test]
    fn trend_summary_caps_at_thirty() {
        let trends: Vec<_> = (0..45).map(|i| record(i, &format!("T{i}"), &[], &[])).collect();
        let summary = summarize_trends(&trends);
        assert_eq!(summary.lines().count(), MAX_PROMPT_TRENDS);
        assert!(summary.ends_with("30. T29 (SS2026)"));
    }

    #[test]
    fn extraction_prompt_embeds_provenance_and_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let prompt = build_extraction_prompt_at("Linen is back.", "Spring Edit", "https://x.test/a", at);
        assert!(prompt.contains("- Title: Spring Edit"));
        assert!(prompt.contains("\"source_url\": \"https://x.test/a\""));
        assert!(prompt.contains("2026-03-01T12:00:00+00:00"));
        assert!(prompt.contains("Linen is back."));
        assert!(prompt.contains("season: \"All season\""));
    }

    #[test]
    fn variation_modifiers_extend_past_the_fixed_three() {
        assert!(variation_modifier(0).starts_with("Styling variation 1: Classic"));
        assert_eq!(variation_modifier(4), "Styling variation 5");
        assert_eq!(variation_prompt("Navy suit", 4), "Navy suit. Styling variation 5");
    }

    #[test]
    fn template_fallbacks_carry_the_description() {
        let image = basic_image_prompt("Navy suit", &ImageOptions::default());
        assert!(image.starts_with("Fashion photography: Navy suit"));
        assert!(image.contains("Aspect ratio: 9:16"));
        let video = basic_video_prompt("Navy suit", &VideoOptions::default());
        assert!(video.contains("Duration: 6 seconds"));
    }
}
