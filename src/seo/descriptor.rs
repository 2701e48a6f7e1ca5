//! Per-language SEO descriptor served from `/assets/i18n/seo/{lang}.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoDescriptor {
    pub site: SiteInfo,
    #[serde(default)]
    pub organization: Option<Organization>,
    /// Used for routes without their own entry
    pub defaults: PageSeo,
    /// Keyed by normalised route, e.g. "/" or "/services"
    #[serde(default)]
    pub pages: BTreeMap<String, PageSeo>,
    #[serde(default)]
    pub reviews: Option<Reviews>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    pub name: String,
    /// Absolute origin, e.g. "https://studio.example"
    pub url: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Including the leading "@"
    #[serde(default)]
    pub twitter_handle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSeo {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub robots: Option<String>,
    #[serde(default)]
    pub og_type: Option<String>,
    #[serde(default)]
    pub og_title: Option<String>,
    #[serde(default)]
    pub og_description: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub twitter_card: Option<String>,
    #[serde(default)]
    pub twitter_title: Option<String>,
    #[serde(default)]
    pub twitter_description: Option<String>,
    #[serde(default)]
    pub twitter_image: Option<String>,
    #[serde(default)]
    pub breadcrumbs: Vec<Breadcrumb>,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub name: String,
    /// schema.org type, defaults to "Organization"
    #[serde(default)]
    pub schema_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub address: Option<PostalAddress>,
    #[serde(default)]
    pub same_as: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[serde(default)]
    pub street_address: Option<String>,
    pub address_locality: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub address_country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviews {
    pub rating_value: f32,
    pub review_count: u32,
    #[serde(default)]
    pub items: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub author: String,
    pub rating: f32,
    pub body: String,
    #[serde(default)]
    pub date_published: Option<String>,
}

impl SeoDescriptor {
    /// Page record for `route`, or the defaults when the route has none.
    pub fn page(&self, route: &str) -> &PageSeo {
        self.pages
            .get(&normalize_route(route))
            .unwrap_or(&self.defaults)
    }
}

/// Normalise a route: drop query and fragment, force a leading "/", and
/// strip trailing slashes except on the root.
pub fn normalize_route(route: &str) -> String {
    let path = route
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();

    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}
