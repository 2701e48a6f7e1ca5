//! Internationalization (i18n) for the site.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for all supported languages and their metadata
//! - `language`: Validated `Language` type backed by the registry
//! - `strings`: Static fallback text per language
//! - `dictionary`: JSON dictionaries with dotted key-path lookup
//! - `store`: Loads dictionaries over HTTP and tracks the current language
//! - `detector`: Resolves a first-time visitor's language
//!
//! # Example
//!
//! ```rust,ignore
//! use agency_site::i18n::{Language, TranslationStore};
//!
//! let store = TranslationStore::new(client, "https://example.com", storage);
//! store.load(Language::ROMANIAN).await;
//! let label = store.t("nav.contact");
//! ```

mod detector;
mod dictionary;
mod language;
mod registry;
mod store;
mod strings;

pub use detector::{
    country_for_timezone, language_for_country, language_from_locale, BrowserEnvironment,
    Detection, DetectionStrategy, GeoProvider, LanguageDetector, GEO_LOOKUP_TIMEOUT,
};
pub use dictionary::{interpolate, TranslationDictionary};
pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
pub use store::TranslationStore;
pub use strings::{fallback_text, FallbackTable};
