//! Turning article text into stored trends.

use serde_json::Value;
use tracing::{info, warn};

use crate::llm::{extract_json_payload, TextGenerator};
use crate::prompts::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use crate::store::{StoreError, TrendStore};

const EXTRACTION_MAX_TOKENS: u32 = 4000;

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into(), content: content.into() }
    }
}

/// (title, url, content) of the built-in sample articles.
pub const DEMO_ARTICLES: [(&str, &str, &str); 3] = [
    (
        "Spring 2026: The Return of Sophisticated Minimalism",
        "https://demo.fashion/spring-2026-minimalism",
        "Spring 2026 marks the triumphant return of sophisticated minimalism, with designers embracing \
clean lines and luxurious fabrics. Wide-leg trousers in premium cotton and linen are \
dominating runways, shown in earthy neutrals like sand, terracotta, and sage green.

The key look pairs these relaxed trousers with fitted knit tops or silk blouses, creating \
a balanced silhouette perfect for both office and evening occasions. Footwear leans toward \
comfortable elegance: leather loafers, minimal sneakers, and low-heeled mules.

Accessories are intentionally sparse - a structured leather tote, delicate gold jewelry, \
and perhaps a silk scarf. The colour palette revolves around warm neutrals with occasional \
pops of rust orange or deep burgundy.

This trend works well for warm and temperate climates and suits most body types, though \
those with shorter frames should ensure trousers are properly hemmed to avoid overwhelming \
the silhouette. The formality ranges from smart casual to semi-formal, making it incredibly \
versatile for modern professionals.",
    ),
    (
        "Bold Prints and Structured Silhouettes for SS2026",
        "https://demo.fashion/bold-prints-ss2026",
        "Spring/Summer 2026 brings a celebration of bold geometric prints and architectural silhouettes. \
Oversized blazers with strong shoulders are paired with slim-fit trousers or midi skirts \
in contrasting patterns.

The colour story is vibrant: cobalt blue, fuchsia pink, electric yellow, and emerald green \
dominate the palette. Fabrics lean toward structured materials - cotton poplin, linen blends, \
and lightweight wool.

For footwear, chunky loafers and block-heel sandals provide both comfort and statement-making \
style. The look is completed with geometric earrings, structured crossbody bags, and sleek \
sunglasses.

This trend is ideal for fashion-forward individuals comfortable with attention. It works for \
creative offices, parties, and social events. The formality is smart casual to semi-formal. \
Best suited for warm climates and those who enjoy bold self-expression.

Key pieces include: oversized blazer in bold print, slim ankle-length trousers, graphic \
print midi skirt, and block-heel sandals.",
    ),
    (
        "Traditional Fusion: Modern Indian Ethnic Wear",
        "https://demo.fashion/indian-ethnic-modern",
        "The new wave of Indian ethnic fashion blends traditional craftsmanship with contemporary \
cuts. Kurtas are now seen in unconventional silhouettes - asymmetric hems, cape sleeves, \
and crop lengths paired with palazzo pants or dhoti-style bottoms.

Sarees are being draped in modern ways, with pre-stitched options and innovative blouse \
designs featuring cold shoulders, halter necks, and jacket-style cuts. Fabrics range from \
handloom cotton and khadi for daily wear to silk and organza for festive occasions.

The colour palette includes both traditional jewel tones (emerald, ruby red, sapphire blue) \
and contemporary pastels (powder pink, mint, lavender). Block printing, Chikankari, and \
minimal embroidery are preferred over heavy embellishments.

This trend is perfect for office wear, festivals, weddings as a guest, and cultural events. \
It suits all body types and works in both warm and humid climates. Footwear includes juttis, \
kolhapuris, and block-heel sandals.

Accessories are thoughtfully chosen: statement jhumkas or chandbalis, potli bags or \
structured clutches, and minimal bangles. Hair is typically styled in loose waves or \
sleek buns with fresh flowers.",
    ),
];

pub fn demo_articles() -> Vec<Article> {
    DEMO_ARTICLES
        .iter()
        .map(|(title, url, content)| Article::new(*title, *url, *content))
        .collect()
}

/// Asks the text model for the trends in one article.
///
/// Never fails: an unusable reply is logged and yields no trends.
pub async fn extract_trends(writer: &dyn TextGenerator, article: &Article) -> Vec<Value> {
    let prompt = build_extraction_prompt(&article.content, &article.title, &article.url);
    info!("📰 Extracting trends from '{}'", article.title);

    let reply = match writer.call_json(EXTRACTION_SYSTEM_PROMPT, &prompt, EXTRACTION_MAX_TOKENS).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("❌ Extraction call failed for '{}': {}", article.title, e);
            return Vec::new();
        }
    };

    let trends = match serde_json::from_str::<Value>(extract_json_payload(&reply)) {
        Ok(Value::Array(items)) => items,
        Ok(object @ Value::Object(_)) => {
            warn!("⚠️ Expected a JSON array, wrapping single object");
            vec![object]
        }
        Ok(_) => Vec::new(),
        Err(e) => {
            let preview: String = reply.chars().take(200).collect();
            warn!("❌ Extraction reply is not JSON ({}): {}...", e, preview);
            Vec::new()
        }
    };
    info!("✨ Extracted {} trends from '{}'", trends.len(), article.title);
    trends
}

/// Extracts trends from every article, then stores them in one batch.
pub async fn ingest_articles(store: &TrendStore, writer: &dyn TextGenerator, articles: &[Article]) -> Result<usize, StoreError> {
    let mut collected = Vec::new();
    for (index, article) in articles.iter().enumerate() {
        info!("📚 Processing article {}/{}: {}", index + 1, articles.len(), article.title);
        collected.extend(extract_trends(writer, article).await);
    }

    if collected.is_empty() {
        info!("No trends extracted.");
        return Ok(0);
    }
    info!("💾 Inserting {} trends", collected.len());
    store.insert_many(&collected).await
}
