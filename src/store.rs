//! SQLite-backed trend table.
//!
//! Every operation opens its own connection and closes it before returning.
//! List-valued columns hold JSON arrays; a row whose columns no longer decode is
//! skipped by readers instead of failing the whole read.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, FromRow};
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::models::{NewTrend, TrendRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")] Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
#[error("trend {id} is unreadable: {reason}")]
struct CorruptRow { id: i64, reason: String }

/// Filters for [`TrendStore::query`]; both filters must hold when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendQuery {
    pub limit: usize,
    pub region: Option<String>,
    pub contexts: Vec<String>,
}

impl TrendQuery {
    pub fn recent(limit: usize) -> Self { Self { limit, ..Self::default() } }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts = contexts.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct TrendStore {
    path: PathBuf,
    options: SqliteConnectOptions,
}

const COLUMNS: &str = "id, name, season, garment_types, gender_focus, style_tags, colour_palette, fit_notes, \
    contexts, formality, climate_suitability, region, key_items, avoid_for_body_types, \
    source_title, source_url, published_at, confidence, created_at";

impl TrendStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        Self { path, options }
    }

    async fn connect(&self) -> Result<SqliteConnection, StoreError> {
        Ok(SqliteConnection::connect_with(&self.options).await?)
    }

    /// Creates the table and its index when missing. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trends (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                season TEXT NOT NULL,
                garment_types TEXT NOT NULL,
                gender_focus TEXT NOT NULL,
                style_tags TEXT NOT NULL,
                colour_palette TEXT NOT NULL,
                fit_notes TEXT,
                contexts TEXT NOT NULL,
                formality TEXT NOT NULL,
                climate_suitability TEXT NOT NULL,
                region TEXT NOT NULL,
                key_items TEXT NOT NULL,
                avoid_for_body_types TEXT NOT NULL,
                source_title TEXT NOT NULL,
                source_url TEXT NOT NULL,
                published_at TEXT NOT NULL,
                confidence TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&mut conn)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trends_created_at ON trends(created_at)")
            .execute(&mut conn)
            .await?;

        conn.close().await?;
        info!("🗄️ Trend store ready at {}", self.path.display());
        Ok(())
    }

    /// Inserts whatever records are usable and returns how many made it in.
    ///
    /// Records that do not match the trend schema, or whose insert fails, are
    /// logged and skipped. Only a failure to reach the database is an error.
    pub async fn insert_many(&self, records: &[Value]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;
        let mut inserted = 0usize;

        for (index, raw) in records.iter().enumerate() {
            let label = raw.get("name").and_then(Value::as_str).unwrap_or("unknown").to_string();
            let trend = match serde_json::from_value::<NewTrend>(raw.clone()) {
                Ok(trend) => trend,
                Err(e) => {
                    warn!("⚠️ Skipping trend #{} '{}': {}", index, label, e);
                    continue;
                }
            };
            if let Err(e) = trend.validate() {
                warn!("⚠️ Skipping trend #{} '{}': {}", index, label, e);
                continue;
            }

            let published_at = trend
                .published_at
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
            let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

            let result = sqlx::query(
                "INSERT INTO trends (\
                    name, season, garment_types, gender_focus, style_tags, colour_palette, fit_notes, \
                    contexts, formality, climate_suitability, region, key_items, avoid_for_body_types, \
                    source_title, source_url, published_at, confidence, created_at\
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&trend.name)
            .bind(&trend.season)
            .bind(encode_list(&trend.garment_types))
            .bind(trend.gender_focus.as_str())
            .bind(encode_list(&trend.style_tags))
            .bind(encode_list(&trend.colour_palette))
            .bind(trend.fit_notes.as_deref().unwrap_or(""))
            .bind(encode_list(&trend.contexts))
            .bind(trend.formality.as_str())
            .bind(encode_list(&trend.climate_suitability))
            .bind(&trend.region)
            .bind(encode_list(&trend.key_items))
            .bind(encode_list(&trend.avoid_for_body_types))
            .bind(&trend.source_title)
            .bind(&trend.source_url)
            .bind(published_at)
            .bind(trend.confidence.as_str())
            .bind(created_at)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => inserted += 1,
                Err(e) => warn!("⚠️ Insert failed for trend '{}': {}", trend.name, e),
            }
        }

        tx.commit().await?;
        conn.close().await?;
        info!("✅ Inserted {} of {} trends", inserted, records.len());
        Ok(inserted)
    }

    /// Newest-first trends matching `query`, at most `query.limit` of them.
    ///
    /// Region matching is case-insensitive and always admits `global` records.
    /// Context matching is exact membership in the stored contexts list.
    pub async fn query(&self, query: &TrendQuery) -> Result<Vec<TrendRecord>, StoreError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = format!("SELECT {COLUMNS} FROM trends");
        if query.region.is_some() {
            sql.push_str(" WHERE (lower(region) = lower(?) OR lower(region) = 'global')");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut statement = sqlx::query_as::<_, TrendRow>(&sql);
        if let Some(region) = query.region.as_deref() {
            statement = statement.bind(region);
        }

        let mut conn = self.connect().await?;
        let mut trends = Vec::new();
        {
            // Rows stream in order; reading stops once the page is full.
            let mut rows = statement.fetch(&mut conn);
            while let Some(row) = rows.try_next().await? {
                let record = match decode_row(row) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("⚠️ {}", e);
                        continue;
                    }
                };
                if !query.contexts.is_empty()
                    && !record.contexts.iter().any(|c| query.contexts.contains(c))
                {
                    continue;
                }
                trends.push(record);
                if trends.len() == query.limit {
                    break;
                }
            }
        }
        conn.close().await?;
        Ok(trends)
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let mut conn = self.connect().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trends")
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(count)
    }
}

fn encode_list(values: &[String]) -> String {
    // A Vec<String> always serializes.
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, FromRow)]
struct TrendRow {
    id: i64,
    name: String,
    season: String,
    garment_types: String,
    gender_focus: String,
    style_tags: String,
    colour_palette: String,
    fit_notes: Option<String>,
    contexts: String,
    formality: String,
    climate_suitability: String,
    region: String,
    key_items: String,
    avoid_for_body_types: String,
    source_title: String,
    source_url: String,
    published_at: String,
    confidence: String,
    created_at: String,
}

fn decode_row(row: TrendRow) -> Result<TrendRecord, CorruptRow> {
    let id = row.id;
    let corrupt = |column: &str, reason: String| CorruptRow { id, reason: format!("{column}: {reason}") };

    let list = |column: &str, raw: &str| -> Result<Vec<String>, CorruptRow> {
        serde_json::from_str(raw).map_err(|e| corrupt(column, e.to_string()))
    };
    fn label<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
        serde_json::from_value(Value::String(raw.to_string())).map_err(|e| e.to_string())
    }

    Ok(TrendRecord {
        id,
        garment_types: list("garment_types", &row.garment_types)?,
        style_tags: list("style_tags", &row.style_tags)?,
        colour_palette: list("colour_palette", &row.colour_palette)?,
        contexts: list("contexts", &row.contexts)?,
        climate_suitability: list("climate_suitability", &row.climate_suitability)?,
        key_items: list("key_items", &row.key_items)?,
        avoid_for_body_types: list("avoid_for_body_types", &row.avoid_for_body_types)?,
        gender_focus: label(&row.gender_focus).map_err(|e| corrupt("gender_focus", e))?,
        formality: label(&row.formality).map_err(|e| corrupt("formality", e))?,
        confidence: label(&row.confidence).map_err(|e| corrupt("confidence", e))?,
        created_at: parse_timestamp(&row.created_at)
            .ok_or_else(|| corrupt("created_at", format!("unrecognised timestamp '{}'", row.created_at)))?,
        name: row.name,
        season: row.season,
        fit_notes: row.fit_notes.filter(|notes| !notes.is_empty()),
        region: row.region,
        source_title: row.source_title,
        source_url: row.source_url,
        published_at: row.published_at,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok().map(|n| n.and_utc()))
}
