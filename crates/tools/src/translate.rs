//! Reading content translation
//!
//! `reading.json` is written in Chinese. Every distinct Chinese string in the
//! translatable fields is sent once to a chat-completion model, which answers
//! with English, Spanish and French renderings. Results are cached on disk as
//! they arrive so an interrupted run resumes where it stopped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Result, ToolError};

/// Languages produced from the Chinese source
pub const TARGET_LANGUAGES: [&str; 3] = ["en", "es", "fr"];

/// Excerpt fields that carry prose
pub const FIELDS_TO_TRANSLATE: [&str; 6] = [
    "title",
    "author",
    "publisher",
    "chapterTitle",
    "markText",
    "reviewText",
];

pub const CACHE_FILE_NAME: &str = "reading-translations-cache.json";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const MAX_ATTEMPTS: usize = 5;
const BASE_DELAY: Duration = Duration::from_millis(250);
const MAX_JITTER_MS: u64 = 250;

const SYSTEM_PROMPT: &str = "Translate the user's text to English (en), Spanish (es), \
and French (fr). Respond ONLY with a compact JSON object using keys en, es, fr. \
Example: {\"en\": \"...\", \"es\": \"...\", \"fr\": \"...\"}";

/// Target language -> text
pub type Translations = BTreeMap<String, String>;

/// Whether `text` contains CJK unified ideographs
pub fn needs_translation(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// The same text for every target language
pub fn identity(text: &str) -> Translations {
    TARGET_LANGUAGES
        .iter()
        .map(|lang| (lang.to_string(), text.to_string()))
        .collect()
}

/// Distinct strings needing translation, in first-seen order
pub fn collect_translatables(items: &[Value]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut texts = Vec::new();
    for item in items {
        for field in FIELDS_TO_TRANSLATE {
            if let Some(text) = item.get(field).and_then(Value::as_str) {
                if needs_translation(text) && seen.insert(text.to_string()) {
                    texts.push(text.to_string());
                }
            }
        }
    }
    texts
}

/// Delay before retry number `attempt` (1-based), without jitter
pub fn backoff_delay(attempt: usize) -> Duration {
    let exp = attempt.saturating_sub(1).min(16) as u32;
    BASE_DELAY * 2u32.pow(exp)
}

fn jittered(attempt: usize) -> Duration {
    backoff_delay(attempt) + Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS))
}

/// Read the model's JSON answer, falling back to the source text for any
/// missing language
pub fn parse_translations(content: &str, source: &str) -> Option<Translations> {
    let value: Value = serde_json::from_str(content.trim()).ok()?;
    let object = value.as_object()?;
    Some(
        TARGET_LANGUAGES
            .iter()
            .map(|lang| {
                let text = match object.get(*lang) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => source.to_string(),
                    Some(other) => other.to_string(),
                };
                (lang.to_string(), text)
            })
            .collect(),
    )
}

/// Translations persisted next to the source file
#[derive(Debug, Default)]
pub struct TranslationCache {
    path: PathBuf,
    entries: BTreeMap<String, Translations>,
}

impl TranslationCache {
    /// Load the cache; an unreadable or malformed file starts empty
    pub fn load(path: &Path) -> Self {
        let entries = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .map(|raw| Self::sanitize(&raw))
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Keep only string translations for the target languages
    fn sanitize(raw: &Value) -> BTreeMap<String, Translations> {
        let Some(object) = raw.as_object() else {
            return BTreeMap::new();
        };
        object
            .iter()
            .filter_map(|(text, translations)| {
                let translations = translations.as_object()?;
                let kept: Translations = TARGET_LANGUAGES
                    .iter()
                    .filter_map(|lang| match translations.get(*lang) {
                        None | Some(Value::Null) => None,
                        Some(Value::String(s)) => Some((lang.to_string(), s.clone())),
                        Some(other) => Some((lang.to_string(), other.to_string())),
                    })
                    .collect();
                Some((text.clone(), kept))
            })
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    pub fn get(&self, text: &str) -> Option<&Translations> {
        self.entries.get(text)
    }

    pub fn insert(&mut self, text: String, translations: Translations) {
        self.entries.insert(text, translations);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Delete the cache file once the outputs are written
    pub fn remove(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Could not remove cache {}: {}", self.path.display(), e);
        }
    }
}

/// A translation backend
#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(&self, text: &str) -> Result<Translations>;
}

/// Chat-completions client
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiTranslator {
    pub fn new(api_key: String, model: String, api_base: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    /// `OPENAI_API_KEY` is required; `OPENAI_MODEL` and `OPENAI_BASE_URL`
    /// are optional
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ToolError::MissingEnv("OPENAI_API_KEY"))?;
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(api_key, model, api_base)
    }

    async fn request(&self, text: &str) -> Result<Attempt> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": text },
            ],
            "temperature": 0,
            "response_format": { "type": "json_object" },
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = match resp.json().await {
            Ok(payload) => payload,
            Err(_) => return Ok(Attempt::Unparsable),
        };
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str);

        Ok(match content.and_then(|c| parse_translations(c, text)) {
            Some(translations) => Attempt::Done(translations),
            None => Attempt::Unparsable,
        })
    }
}

enum Attempt {
    Done(Translations),
    RateLimited,
    Unparsable,
}

#[async_trait]
impl Translate for OpenAiTranslator {
    async fn translate(&self, text: &str) -> Result<Translations> {
        if text.trim().is_empty() || !needs_translation(text) {
            return Ok(identity(text));
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let outcome = self.request(text).await?;
            let failure = match outcome {
                Attempt::Done(translations) => return Ok(translations),
                Attempt::RateLimited if attempt == MAX_ATTEMPTS => {
                    return Err(ToolError::RateLimited(attempt))
                }
                Attempt::Unparsable if attempt == MAX_ATTEMPTS => {
                    return Err(ToolError::UnparsableResponse(attempt))
                }
                Attempt::RateLimited => "rate limited",
                Attempt::Unparsable => "unparsable response",
            };
            let delay = jittered(attempt);
            warn!("Translation attempt {} {}; retrying in {:?}", attempt, failure, delay);
            tokio::time::sleep(delay).await;
        }

        Err(ToolError::UnparsableResponse(MAX_ATTEMPTS))
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("Translating [{bar:30}] {pos}/{len}") {
        bar.set_style(style.progress_chars("#-"));
    }
    bar
}

/// Translate every text not already cached, at most `concurrency` at a
/// time. The cache is saved after each new translation.
pub async fn translate_all(
    translator: Arc<dyn Translate>,
    texts: Vec<String>,
    cache: Arc<Mutex<TranslationCache>>,
    concurrency: usize,
) -> Result<()> {
    if texts.is_empty() {
        return Ok(());
    }

    let bar = progress_bar(texts.len());
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for text in texts {
        if cache.lock().await.contains(&text) {
            bar.inc(1);
            continue;
        }

        let translator = translator.clone();
        let cache = cache.clone();
        let semaphore = semaphore.clone();
        let bar = bar.clone();

        tasks.spawn(async move {
            let translations = {
                let _permit = semaphore.acquire_owned().await.ok();
                translator.translate(&text).await?
            };
            {
                let mut cache = cache.lock().await;
                cache.insert(text, translations);
                cache.save()?;
            }
            bar.inc(1);
            Ok::<(), ToolError>(())
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => result?,
            Err(e) => {
                return Err(ToolError::InvalidContent(format!("translation task failed: {}", e)))
            }
        }
    }

    bar.finish();
    Ok(())
}

/// Per-language copies of `items` with translated fields substituted
pub fn apply_translations(items: &[Value], cache: &TranslationCache) -> BTreeMap<String, Vec<Value>> {
    TARGET_LANGUAGES
        .iter()
        .map(|lang| {
            let translated = items
                .iter()
                .map(|item| {
                    let mut item = item.clone();
                    if let Some(object) = item.as_object_mut() {
                        for field in FIELDS_TO_TRANSLATE {
                            let replacement = object
                                .get(field)
                                .and_then(Value::as_str)
                                .filter(|text| needs_translation(text))
                                .and_then(|text| cache.get(text))
                                .and_then(|t| t.get(*lang))
                                .cloned();
                            if let Some(text) = replacement {
                                object.insert(field.to_string(), Value::String(text));
                            }
                        }
                    }
                    item
                })
                .collect();
            (lang.to_string(), translated)
        })
        .collect()
}

/// `reading.json` -> `reading-<lang>.json`
pub fn output_path(source: &Path, lang: &str) -> PathBuf {
    source.with_file_name(format!("reading-{}.json", lang))
}

/// Read the source excerpt list
pub fn load_source(source: &Path) -> Result<Vec<Value>> {
    if !source.exists() {
        return Err(ToolError::SourceNotFound(source.display().to_string()));
    }
    let content = std::fs::read_to_string(source)?;
    match serde_json::from_str(&content)? {
        Value::Array(items) => Ok(items),
        _ => Err(ToolError::InvalidContent(format!(
            "{} is not a JSON array",
            source.display()
        ))),
    }
}

/// Write one file per language, returning the written paths
pub fn write_outputs(source: &Path, outputs: &BTreeMap<String, Vec<Value>>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(outputs.len());
    for (lang, items) in outputs {
        let path = output_path(source, lang);
        std::fs::write(&path, serde_json::to_string_pretty(items)?)?;
        written.push(path);
    }
    Ok(written)
}
