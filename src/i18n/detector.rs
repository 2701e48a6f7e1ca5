//! Language detection for first-time visitors.
//!
//! Detection is an ordered list of strategies; the first one that produces a
//! supported language wins. Failures are logged and never surfaced.

use crate::i18n::Language;
use crate::storage::{ClientStorage, STORAGE_DETECTED_KEY, STORAGE_LANGUAGE_KEY};
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request timeout for geolocation services.
pub const GEO_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// One way of guessing the visitor's language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
    /// Language the visitor chose explicitly on an earlier visit
    StoredPreference,
    /// Result of an earlier detection in this session
    SessionCache,
    /// Country from an external IP geolocation service
    GeoIp,
    /// Country guessed from the IANA timezone
    Timezone,
    /// Primary subtag of the browser locale
    BrowserLocale,
    /// The canonical language
    Default,
}

impl DetectionStrategy {
    pub const ORDER: [DetectionStrategy; 6] = [
        DetectionStrategy::StoredPreference,
        DetectionStrategy::SessionCache,
        DetectionStrategy::GeoIp,
        DetectionStrategy::Timezone,
        DetectionStrategy::BrowserLocale,
        DetectionStrategy::Default,
    ];

    fn is_cached_result(&self) -> bool {
        matches!(
            self,
            DetectionStrategy::StoredPreference | DetectionStrategy::SessionCache
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub language: Language,
    pub source: DetectionStrategy,
}

/// An IP geolocation endpoint returning JSON with a country code field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoProvider {
    pub name: String,
    pub url: String,
    pub country_field: String,
}

impl GeoProvider {
    pub fn new(name: &str, url: &str, country_field: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            country_field: country_field.to_string(),
        }
    }

    /// Public services tried in order.
    pub fn defaults() -> Vec<GeoProvider> {
        vec![
            GeoProvider::new("ipapi.co", "https://ipapi.co/json/", "country_code"),
            GeoProvider::new("ip-api.com", "http://ip-api.com/json/", "countryCode"),
            GeoProvider::new("ipinfo.io", "https://ipinfo.io/json", "country"),
        ]
    }
}

/// What the detector can see of the visitor's environment.
pub struct BrowserEnvironment<'a> {
    /// Persistent storage holding an explicit language choice
    pub storage: &'a dyn ClientStorage,
    /// Session storage where detection results are cached
    pub session: &'a dyn ClientStorage,
    /// IANA timezone, e.g. "Europe/Bucharest"
    pub timezone: Option<&'a str>,
    /// Locale or Accept-Language value, e.g. "ro-RO" or "fr-CH,fr;q=0.9"
    pub locale: Option<&'a str>,
}

pub struct LanguageDetector {
    client: reqwest::Client,
    providers: Vec<GeoProvider>,
    strategies: Vec<DetectionStrategy>,
    timeout: Duration,
}

impl LanguageDetector {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            providers: GeoProvider::defaults(),
            strategies: DetectionStrategy::ORDER.to_vec(),
            timeout: GEO_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_providers(mut self, providers: Vec<GeoProvider>) -> Self {
        self.providers = providers;
        self
    }

    /// Replace the strategy order, e.g. to skip geolocation entirely.
    pub fn with_strategies(mut self, strategies: Vec<DetectionStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the visitor's language.
    ///
    /// Fresh detections are written to session storage so later calls in the
    /// same session return immediately. They are never written as the stored
    /// preference.
    pub async fn detect(&self, env: &BrowserEnvironment<'_>) -> Detection {
        for strategy in &self.strategies {
            let Some(language) = self.attempt(*strategy, env).await else {
                debug!("Detection strategy {:?} produced nothing", strategy);
                continue;
            };

            if !strategy.is_cached_result() {
                if let Err(e) = env.session.set(STORAGE_DETECTED_KEY, language.code()) {
                    warn!("Failed to cache detected language: {:#}", e);
                }
            }

            info!("Detected language {} via {:?}", language, strategy);
            return Detection {
                language,
                source: *strategy,
            };
        }

        Detection {
            language: Language::canonical(),
            source: DetectionStrategy::Default,
        }
    }

    async fn attempt(
        &self,
        strategy: DetectionStrategy,
        env: &BrowserEnvironment<'_>,
    ) -> Option<Language> {
        match strategy {
            DetectionStrategy::StoredPreference => stored_language(env.storage, STORAGE_LANGUAGE_KEY),
            DetectionStrategy::SessionCache => stored_language(env.session, STORAGE_DETECTED_KEY),
            DetectionStrategy::GeoIp => self
                .lookup_country()
                .await
                .map(|country| language_for_country(&country)),
            DetectionStrategy::Timezone => env
                .timezone
                .and_then(country_for_timezone)
                .map(language_for_country),
            DetectionStrategy::BrowserLocale => env.locale.and_then(language_from_locale),
            DetectionStrategy::Default => Some(Language::canonical()),
        }
    }

    /// Ask each geolocation provider in turn; the first country code wins.
    pub async fn lookup_country(&self) -> Option<String> {
        for provider in &self.providers {
            match self.fetch_country(provider).await {
                Ok(country) => {
                    debug!("{} located visitor in {}", provider.name, country);
                    return Some(country);
                }
                Err(e) => debug!("Geo lookup via {} failed: {:#}", provider.name, e),
            }
        }
        None
    }

    async fn fetch_country(&self, provider: &GeoProvider) -> Result<String> {
        let response = self
            .client
            .get(&provider.url)
            .timeout(self.timeout)
            .send()
            .await
            .context(format!("Request to {} failed", provider.name))?;

        if !response.status().is_success() {
            anyhow::bail!("{} returned HTTP {}", provider.name, response.status());
        }

        let body: Value = response
            .json()
            .await
            .context(format!("{} returned invalid JSON", provider.name))?;

        let country = body
            .get(&provider.country_field)
            .and_then(Value::as_str)
            .map(str::trim)
            .context(format!("{} response has no {}", provider.name, provider.country_field))?;

        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("{} returned malformed country '{}'", provider.name, country);
        }

        Ok(country.to_ascii_uppercase())
    }
}

fn stored_language(storage: &dyn ClientStorage, key: &str) -> Option<Language> {
    let code = storage.get(key)?;
    match Language::from_code(&code) {
        Ok(language) => Some(language),
        Err(e) => {
            debug!("Ignoring stored language under {}: {}", key, e);
            None
        }
    }
}

/// Map an ISO 3166-1 alpha-2 country code to a site language.
///
/// Unmapped countries resolve to the default language.
pub fn language_for_country(country: &str) -> Language {
    match country.trim().to_ascii_uppercase().as_str() {
        "US" | "GB" | "CA" | "AU" | "NZ" | "IE" => Language::ENGLISH,
        "RO" | "MD" => Language::ROMANIAN,
        "FR" | "BE" | "LU" | "MC" => Language::FRENCH,
        "DE" | "AT" | "CH" | "LI" => Language::GERMAN,
        "UA" => Language::UKRAINIAN,
        _ => Language::canonical(),
    }
}

/// Guess a country from an IANA timezone name.
pub fn country_for_timezone(timezone: &str) -> Option<&'static str> {
    let country = match timezone.trim() {
        "Europe/Bucharest" => "RO",
        "Europe/Chisinau" => "MD",
        "Europe/Paris" => "FR",
        "Europe/Brussels" => "BE",
        "Europe/Luxembourg" => "LU",
        "Europe/Monaco" => "MC",
        "Europe/Berlin" | "Europe/Busingen" => "DE",
        "Europe/Vienna" => "AT",
        "Europe/Zurich" => "CH",
        "Europe/Vaduz" => "LI",
        "Europe/Kyiv" | "Europe/Kiev" | "Europe/Uzhgorod" | "Europe/Zaporozhye" => "UA",
        "Europe/London" => "GB",
        "Europe/Dublin" => "IE",
        "America/New_York" | "America/Chicago" | "America/Denver" | "America/Los_Angeles"
        | "America/Phoenix" | "America/Anchorage" | "Pacific/Honolulu" => "US",
        "America/Toronto" | "America/Vancouver" | "America/Edmonton" | "America/Halifax" => "CA",
        "Australia/Sydney" | "Australia/Melbourne" | "Australia/Brisbane" | "Australia/Perth" => {
            "AU"
        }
        "Pacific/Auckland" => "NZ",
        _ => return None,
    };
    Some(country)
}

/// Parse the primary language subtag of a locale or Accept-Language value.
///
/// Only the first (highest priority) entry is considered.
pub fn language_from_locale(locale: &str) -> Option<Language> {
    let first = locale.split(',').next()?;
    let tag = first.split(';').next()?.trim();
    let primary = tag.split(['-', '_']).next()?.trim();
    if primary.is_empty() || primary == "*" {
        return None;
    }
    Language::from_code(primary).ok()
}
