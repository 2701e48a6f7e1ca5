//! Translation store: loads dictionaries over HTTP and resolves key paths.
//!
//! The store is the explicit "current language" context for everything that
//! renders text. Dictionaries are cached per language for the lifetime of the
//! store. Each `load` takes a generation token so a slow response for an
//! earlier selection can never overwrite a later one.

use crate::i18n::dictionary::{interpolate, TranslationDictionary};
use crate::i18n::strings::fallback_text;
use crate::i18n::Language;
use crate::storage::{ClientStorage, STORAGE_LANGUAGE_KEY};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

/// Shown instead of an empty key path so `translate` never returns "".
const MISSING_TEXT: &str = "…";

struct ActiveDictionary {
    language: Language,
    dictionary: Arc<TranslationDictionary>,
}

pub struct TranslationStore {
    client: reqwest::Client,
    site_url: String,
    storage: Arc<dyn ClientStorage>,
    cache: RwLock<HashMap<Language, Arc<TranslationDictionary>>>,
    active: RwLock<ActiveDictionary>,
    generation: AtomicU64,
}

impl TranslationStore {
    /// Create a store that fetches from `{site_url}/assets/i18n/`.
    ///
    /// Until the first `load` completes, the default language is current with
    /// an empty dictionary, so lookups use the static fallback text.
    pub fn new(client: reqwest::Client, site_url: &str, storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            client,
            site_url: site_url.trim_end_matches('/').to_string(),
            storage,
            cache: RwLock::new(HashMap::new()),
            active: RwLock::new(ActiveDictionary {
                language: Language::canonical(),
                dictionary: Arc::new(TranslationDictionary::empty()),
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// Switch to `language` as an explicit visitor choice and persist it.
    ///
    /// Falls back to the default language when the dictionary cannot be
    /// loaded. Returns the language that is current afterwards.
    pub async fn load(&self, language: Language) -> Language {
        self.activate(language, true).await
    }

    /// Switch to a detected language without recording it as a preference.
    pub async fn load_detected(&self, language: Language) -> Language {
        self.activate(language, false).await
    }

    async fn activate(&self, language: Language, persist: bool) -> Language {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let default = Language::canonical();

        let (loaded, dictionary) = match self.dictionary_for(language).await {
            Ok(dictionary) => (language, Some(dictionary)),
            Err(e) if language != default => {
                warn!(
                    "Failed to load {} translations ({:#}), falling back to {}",
                    language, e, default
                );
                match self.dictionary_for(default).await {
                    Ok(dictionary) => (default, Some(dictionary)),
                    Err(e) => {
                        warn!("Failed to load default translations: {:#}", e);
                        (default, None)
                    }
                }
            }
            Err(e) => {
                warn!("Failed to load default translations: {:#}", e);
                (default, None)
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(
                "Discarding stale {} translations (generation {})",
                loaded, generation
            );
            return self.current_language();
        }

        let fetched = dictionary.is_some();
        {
            let mut active = match self.active.write() {
                Ok(active) => active,
                Err(poisoned) => poisoned.into_inner(),
            };
            active.language = loaded;
            active.dictionary =
                dictionary.unwrap_or_else(|| Arc::new(TranslationDictionary::empty()));
        }

        if fetched && persist {
            if let Err(e) = self.storage.set(STORAGE_LANGUAGE_KEY, loaded.code()) {
                warn!("Failed to persist language {}: {:#}", loaded, e);
            }
        }

        info!("Active language: {} ({})", loaded.name(), loaded.code());
        loaded
    }

    async fn dictionary_for(&self, language: Language) -> Result<Arc<TranslationDictionary>> {
        if let Some(cached) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&language).cloned())
        {
            debug!("Using cached {} dictionary", language);
            return Ok(cached);
        }

        let dictionary = Arc::new(self.fetch_dictionary(language).await?);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(language, Arc::clone(&dictionary));
        }
        Ok(dictionary)
    }

    async fn fetch_dictionary(&self, language: Language) -> Result<TranslationDictionary> {
        let url = format!("{}/assets/i18n/{}.json", self.site_url, language.code());
        debug!("Fetching translations from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Translation fetch for {} failed: HTTP {}", language, status);
        }

        let body = response
            .text()
            .await
            .context("Failed to read translation response")?;
        let dictionary = TranslationDictionary::parse(&body)?;
        debug!("Loaded {} strings for {}", dictionary.len(), language);
        Ok(dictionary)
    }

    fn active(&self) -> RwLockReadGuard<'_, ActiveDictionary> {
        match self.active.read() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn current_language(&self) -> Language {
        self.active().language
    }

    /// Whether a fetched dictionary is active (as opposed to static text only).
    pub fn has_dictionary(&self) -> bool {
        !self.active().dictionary.is_empty()
    }

    /// Resolve `key_path` in the current language and substitute `{{name}}`
    /// placeholders from `params`.
    ///
    /// Lookup order: loaded dictionary, static text for the current language,
    /// static English text, the key path itself. Never returns an empty string.
    pub fn translate(&self, key_path: &str, params: &[(&str, &str)]) -> String {
        let text = {
            let active = self.active();
            active
                .dictionary
                .lookup(key_path)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .or_else(|| fallback_text(active.language, key_path).map(str::to_string))
        };

        match text {
            Some(text) => interpolate(&text, params),
            None if key_path.is_empty() => MISSING_TEXT.to_string(),
            None => key_path.to_string(),
        }
    }

    /// `translate` without parameters.
    pub fn t(&self, key_path: &str) -> String {
        self.translate(key_path, &[])
    }
}
