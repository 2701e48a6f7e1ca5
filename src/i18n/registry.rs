//! Language registry: Single source of truth for all supported languages.
//!
//! The registry is a lazily initialised `OnceLock` singleton. It is read-only
//! after initialisation; the *current* language lives on the
//! `TranslationStore` that owns it, never here.

use crate::i18n::strings::{
    FallbackTable, ENGLISH_FALLBACK, FRENCH_FALLBACK, GERMAN_FALLBACK, ROMANIAN_FALLBACK,
    UKRAINIAN_FALLBACK,
};
use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "ro")
    pub code: &'static str,

    /// English name of the language (e.g., "Romanian")
    pub name: &'static str,

    /// Native name of the language (e.g., "Română")
    pub native_name: &'static str,

    /// Open Graph locale (e.g., "ro_RO")
    pub og_locale: &'static str,

    /// Whether this is the default language (exactly one should be true)
    pub is_canonical: bool,

    /// Whether this language is enabled for use
    pub enabled: bool,

    /// Static text used when a dictionary is missing a key
    pub fallback: FallbackTable,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    ///
    /// Matching is case-insensitive so that `"RO"` and `"ro"` resolve alike.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

    /// Get all enabled languages, in registry order.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get all languages (including disabled ones).
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// Get the canonical (default) language configuration.
    ///
    /// # Panics
    /// Panics if the registry does not define exactly one canonical language.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }

    /// Check if a language code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }
}

fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            og_locale: "en_US",
            is_canonical: true,
            enabled: true,
            fallback: ENGLISH_FALLBACK,
        },
        LanguageConfig {
            code: "ro",
            name: "Romanian",
            native_name: "Română",
            og_locale: "ro_RO",
            is_canonical: false,
            enabled: true,
            fallback: ROMANIAN_FALLBACK,
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            og_locale: "fr_FR",
            is_canonical: false,
            enabled: true,
            fallback: FRENCH_FALLBACK,
        },
        LanguageConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            og_locale: "de_DE",
            is_canonical: false,
            enabled: true,
            fallback: GERMAN_FALLBACK,
        },
        LanguageConfig {
            code: "uk",
            name: "Ukrainian",
            native_name: "Українська",
            og_locale: "uk_UA",
            is_canonical: false,
            enabled: true,
            fallback: UKRAINIAN_FALLBACK,
        },
    ]
}
