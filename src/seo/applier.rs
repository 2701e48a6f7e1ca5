//! Loads SEO descriptors and applies them on route and language changes.

use crate::i18n::Language;
use crate::seo::descriptor::SeoDescriptor;
use crate::seo::head::{DocumentHead, HeadMetadata};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

pub struct SeoApplier {
    client: reqwest::Client,
    site_url: String,
    cache: RwLock<HashMap<Language, Arc<SeoDescriptor>>>,
}

impl SeoApplier {
    /// Create an applier that fetches from `{site_url}/assets/i18n/seo/`.
    pub fn new(client: reqwest::Client, site_url: &str) -> Self {
        Self {
            client,
            site_url: site_url.trim_end_matches('/').to_string(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Descriptor for `language`, falling back to the default language.
    ///
    /// Returns the language actually used, or `None` if neither could be
    /// loaded.
    pub async fn descriptor_for(&self, language: Language) -> Option<(Language, Arc<SeoDescriptor>)> {
        match self.load(language).await {
            Ok(descriptor) => return Some((language, descriptor)),
            Err(e) => warn!("Failed to load SEO descriptor for {}: {:#}", language, e),
        }

        let default = Language::canonical();
        if language == default {
            return None;
        }

        match self.load(default).await {
            Ok(descriptor) => Some((default, descriptor)),
            Err(e) => {
                warn!("Failed to load default SEO descriptor: {:#}", e);
                None
            }
        }
    }

    /// Build the head description for `route` in `language`.
    ///
    /// The description is always in the requested language (lang attribute,
    /// `og:locale`, localised URLs) even when the copy comes from the default
    /// language's descriptor.
    pub async fn describe(&self, language: Language, route: &str) -> Option<(Language, HeadMetadata)> {
        let (source, descriptor) = self.descriptor_for(language).await?;
        Some((source, HeadMetadata::describe(&descriptor, language, route)))
    }

    /// Fetch, describe and apply. Call on every route change and every
    /// language change. When nothing can be loaded the head is left as is.
    pub async fn apply(&self, language: Language, route: &str, head: &mut DocumentHead) -> Option<Language> {
        let (source, metadata) = self.describe(language, route).await?;
        head.apply(&metadata);
        debug!("Applied SEO metadata for {} ({}) from {} descriptor", route, language, source);
        Some(source)
    }

    async fn load(&self, language: Language) -> Result<Arc<SeoDescriptor>> {
        if let Some(cached) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&language).cloned())
        {
            return Ok(cached);
        }

        let url = format!("{}/assets/i18n/seo/{}.json", self.site_url, language.code());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("SEO fetch for {} failed: HTTP {}", language, status);
        }

        let descriptor: SeoDescriptor = response
            .json()
            .await
            .context("Failed to parse SEO descriptor")?;
        let descriptor = Arc::new(descriptor);

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(language, Arc::clone(&descriptor));
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seo::head::{MetaSelector, SchemaGroup};
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn descriptor_json(title: &str) -> serde_json::Value {
        json!({
            "site": { "name": "Studio", "url": "https://studio.example" },
            "organization": { "name": "Studio SRL" },
            "defaults": { "title": title, "description": "desc" },
            "pages": {
                "/contact": { "title": format!("{} contact", title), "description": "write us" }
            }
        })
    }

    async fn mount(server: &MockServer, code: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/assets/i18n/seo/{}.json", code)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_apply_uses_requested_language() {
        let server = MockServer::start().await;
        mount(&server, "ro", 200, descriptor_json("Studio RO")).await;
        let applier = SeoApplier::new(reqwest::Client::new(), &server.uri());
        let mut head = DocumentHead::new();

        let source = applier.apply(Language::ROMANIAN, "/contact", &mut head).await;

        assert_eq!(source, Some(Language::ROMANIAN));
        assert_eq!(head.title(), Some("Studio RO contact"));
        assert_eq!(head.lang(), Some("ro"));
        assert!(head.schema(SchemaGroup::Organization).is_some());
    }

    #[tokio::test]
    async fn test_apply_falls_back_to_default_descriptor() {
        let server = MockServer::start().await;
        mount(&server, "uk", 500, json!({})).await;
        mount(&server, "en", 200, descriptor_json("Studio EN")).await;
        let applier = SeoApplier::new(reqwest::Client::new(), &server.uri());
        let mut head = DocumentHead::new();

        let source = applier.apply(Language::UKRAINIAN, "/", &mut head).await;

        assert_eq!(source, Some(Language::ENGLISH));
        assert_eq!(head.title(), Some("Studio EN"));
        assert_eq!(head.lang(), Some("uk"));
        assert_eq!(
            head.meta(&MetaSelector::property("og:locale")),
            Some("uk_UA")
        );
    }

    #[tokio::test]
    async fn test_apply_leaves_head_untouched_when_nothing_loads() {
        let server = MockServer::start().await;
        let applier = SeoApplier::new(reqwest::Client::new(), &server.uri());
        let mut head = DocumentHead::new();
        head.set_title("Shell title");

        let source = applier.apply(Language::FRENCH, "/", &mut head).await;

        assert_eq!(source, None);
        assert_eq!(head.title(), Some("Shell title"));
        assert!(head.links("canonical").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_descriptor_counts_as_failure() {
        let server = MockServer::start().await;
        mount(&server, "en", 200, json!({"site": "nope"})).await;
        let applier = SeoApplier::new(reqwest::Client::new(), &server.uri());

        assert!(applier.descriptor_for(Language::ENGLISH).await.is_none());
    }

    #[tokio::test]
    async fn test_descriptors_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/i18n/seo/de.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(descriptor_json("DE")))
            .expect(1)
            .mount(&server)
            .await;
        let applier = SeoApplier::new(reqwest::Client::new(), &server.uri());
        let mut head = DocumentHead::new();

        applier.apply(Language::GERMAN, "/", &mut head).await;
        applier.apply(Language::GERMAN, "/contact", &mut head).await;

        assert_eq!(head.title(), Some("DE contact"));
    }
}
