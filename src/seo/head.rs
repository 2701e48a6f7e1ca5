//! Declarative head metadata and the document head it is applied to.
//!
//! Views never touch the head directly. `HeadMetadata::describe` turns a
//! descriptor, language and route into the desired set of tags, and
//! `DocumentHead::apply` is the one place that mutates the head.

use crate::i18n::Language;
use crate::seo::descriptor::{normalize_route, PageSeo, SeoDescriptor};
use serde_json::{json, Map, Value};

const DEFAULT_ROBOTS: &str = "index, follow";
const DEFAULT_OG_TYPE: &str = "website";
const DEFAULT_TWITTER_CARD: &str = "summary_large_image";

/// Attribute used to locate a meta tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaSelector {
    /// `<meta name="...">`
    Name(String),
    /// `<meta property="...">`
    Property(String),
}

impl MetaSelector {
    pub fn name(value: &str) -> Self {
        MetaSelector::Name(value.to_string())
    }

    pub fn property(value: &str) -> Self {
        MetaSelector::Property(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTag {
    pub selector: MetaSelector,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    pub rel: String,
    pub href: String,
    pub hreflang: Option<String>,
}

/// Logical JSON-LD group, rendered as `data-schema="..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaGroup {
    Organization,
    Breadcrumb,
    Faq,
    Reviews,
}

impl SchemaGroup {
    pub const ALL: [SchemaGroup; 4] = [
        SchemaGroup::Organization,
        SchemaGroup::Breadcrumb,
        SchemaGroup::Faq,
        SchemaGroup::Reviews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaGroup::Organization => "organization",
            SchemaGroup::Breadcrumb => "breadcrumb",
            SchemaGroup::Faq => "faq",
            SchemaGroup::Reviews => "reviews",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaScript {
    pub group: SchemaGroup,
    pub json: Value,
}

/// Desired head state for one language and route.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadMetadata {
    pub lang: String,
    pub title: String,
    pub meta: Vec<MetaTag>,
    pub canonical: String,
    pub alternates: Vec<LinkTag>,
    pub schemas: Vec<SchemaScript>,
}

impl HeadMetadata {
    pub fn describe(descriptor: &SeoDescriptor, language: Language, route: &str) -> Self {
        let route = normalize_route(route);
        let site = &descriptor.site;
        let site_url = site.url.trim_end_matches('/');
        let page = descriptor.page(&route);
        let defaults = &descriptor.defaults;

        let canonical = localized_url(site_url, &route, language);
        let keywords = if page.keywords.is_empty() {
            &defaults.keywords
        } else {
            &page.keywords
        };
        let image = page
            .og_image
            .as_deref()
            .or(defaults.og_image.as_deref())
            .map(|image| absolute_url(site_url, image));

        let mut meta = vec![meta_name("description", &page.description)];
        if !keywords.is_empty() {
            meta.push(meta_name("keywords", &keywords.join(", ")));
        }
        if let Some(author) = &site.author {
            meta.push(meta_name("author", author));
        }
        meta.push(meta_name(
            "robots",
            page.robots.as_deref().unwrap_or(DEFAULT_ROBOTS),
        ));

        // Open Graph
        meta.push(meta_property(
            "og:type",
            page.og_type.as_deref().unwrap_or(DEFAULT_OG_TYPE),
        ));
        meta.push(meta_property("og:title", og_title(page)));
        meta.push(meta_property("og:description", og_description(page)));
        meta.push(meta_property("og:url", &canonical));
        if let Some(image) = &image {
            meta.push(meta_property("og:image", image));
        }
        meta.push(meta_property("og:site_name", &site.name));
        meta.push(meta_property("og:locale", language.og_locale()));

        // Twitter Card
        meta.push(meta_name(
            "twitter:card",
            page.twitter_card.as_deref().unwrap_or(DEFAULT_TWITTER_CARD),
        ));
        if let Some(handle) = &site.twitter_handle {
            meta.push(meta_name("twitter:site", handle));
        }
        meta.push(meta_name(
            "twitter:title",
            page.twitter_title.as_deref().unwrap_or(og_title(page)),
        ));
        meta.push(meta_name(
            "twitter:description",
            page.twitter_description
                .as_deref()
                .unwrap_or(og_description(page)),
        ));
        let twitter_image = page
            .twitter_image
            .as_deref()
            .map(|image| absolute_url(site_url, image))
            .or_else(|| image.clone());
        if let Some(image) = twitter_image {
            meta.push(meta_name("twitter:image", &image));
        }

        let mut alternates: Vec<LinkTag> = Language::all()
            .into_iter()
            .map(|alternate| LinkTag {
                rel: "alternate".to_string(),
                href: localized_url(site_url, &route, alternate),
                hreflang: Some(alternate.code().to_string()),
            })
            .collect();
        alternates.push(LinkTag {
            rel: "alternate".to_string(),
            href: localized_url(site_url, &route, Language::canonical()),
            hreflang: Some("x-default".to_string()),
        });

        let mut schemas = vec![organization_schema(descriptor, site_url)];
        if !page.breadcrumbs.is_empty() {
            schemas.push(breadcrumb_schema(page, site_url, language));
        }
        if !page.faq.is_empty() {
            schemas.push(faq_schema(page));
        }
        if route == "/" {
            if let Some(reviews) = reviews_schema(descriptor) {
                schemas.push(reviews);
            }
        }

        Self {
            lang: language.code().to_string(),
            title: page.title.clone(),
            meta,
            canonical,
            alternates,
            schemas,
        }
    }

    pub fn schema(&self, group: SchemaGroup) -> Option<&Value> {
        self.schemas
            .iter()
            .find(|schema| schema.group == group)
            .map(|schema| &schema.json)
    }
}

/// URL of `route` in `language`. The default language uses the bare route.
pub fn localized_url(site_url: &str, route: &str, language: Language) -> String {
    let route = normalize_route(route);
    let base = format!("{}{}", site_url.trim_end_matches('/'), route);
    if language.is_canonical() {
        base
    } else {
        format!("{}?lang={}", base, language.code())
    }
}

fn absolute_url(site_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}/{}", site_url, path.trim_start_matches('/'))
    }
}

fn og_title(page: &PageSeo) -> &str {
    page.og_title.as_deref().unwrap_or(&page.title)
}

fn og_description(page: &PageSeo) -> &str {
    page.og_description.as_deref().unwrap_or(&page.description)
}

fn meta_name(name: &str, content: &str) -> MetaTag {
    MetaTag {
        selector: MetaSelector::name(name),
        content: content.to_string(),
    }
}

fn meta_property(property: &str, content: &str) -> MetaTag {
    MetaTag {
        selector: MetaSelector::property(property),
        content: content.to_string(),
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::String(value.clone()));
    }
}

/// Emitted on every page. Without an `organization` block the site name
/// and URL stand in.
fn organization_schema(descriptor: &SeoDescriptor, site_url: &str) -> SchemaScript {
    let organization = descriptor.organization.as_ref();

    let mut map = Map::new();
    map.insert("@context".into(), json!("https://schema.org"));
    map.insert(
        "@type".into(),
        json!(organization
            .and_then(|organization| organization.schema_type.as_deref())
            .unwrap_or("Organization")),
    );
    map.insert(
        "name".into(),
        json!(organization.map_or(&descriptor.site.name, |organization| &organization.name)),
    );
    map.insert("url".into(), json!(site_url));
    if let Some(logo) = &descriptor.site.logo {
        map.insert("logo".into(), json!(absolute_url(site_url, logo)));
    }

    let Some(organization) = organization else {
        return SchemaScript {
            group: SchemaGroup::Organization,
            json: Value::Object(map),
        };
    };

    insert_opt(&mut map, "description", organization.description.as_ref());
    insert_opt(&mut map, "email", organization.email.as_ref());
    insert_opt(&mut map, "telephone", organization.telephone.as_ref());

    if let Some(address) = &organization.address {
        let mut postal = Map::new();
        postal.insert("@type".into(), json!("PostalAddress"));
        insert_opt(&mut postal, "streetAddress", address.street_address.as_ref());
        postal.insert("addressLocality".into(), json!(address.address_locality));
        insert_opt(&mut postal, "postalCode", address.postal_code.as_ref());
        postal.insert("addressCountry".into(), json!(address.address_country));
        map.insert("address".into(), Value::Object(postal));
    }
    if !organization.same_as.is_empty() {
        map.insert("sameAs".into(), json!(organization.same_as));
    }

    SchemaScript {
        group: SchemaGroup::Organization,
        json: Value::Object(map),
    }
}

fn breadcrumb_schema(page: &PageSeo, site_url: &str, language: Language) -> SchemaScript {
    let items: Vec<Value> = page
        .breadcrumbs
        .iter()
        .enumerate()
        .map(|(index, crumb)| {
            json!({
                "@type": "ListItem",
                "position": index + 1,
                "name": crumb.name,
                "item": localized_url(site_url, &crumb.path, language),
            })
        })
        .collect();

    SchemaScript {
        group: SchemaGroup::Breadcrumb,
        json: json!({
            "@context": "https://schema.org",
            "@type": "BreadcrumbList",
            "itemListElement": items,
        }),
    }
}

fn faq_schema(page: &PageSeo) -> SchemaScript {
    let questions: Vec<Value> = page
        .faq
        .iter()
        .map(|entry| {
            json!({
                "@type": "Question",
                "name": entry.question,
                "acceptedAnswer": { "@type": "Answer", "text": entry.answer },
            })
        })
        .collect();

    SchemaScript {
        group: SchemaGroup::Faq,
        json: json!({
            "@context": "https://schema.org",
            "@type": "FAQPage",
            "mainEntity": questions,
        }),
    }
}

fn reviews_schema(descriptor: &SeoDescriptor) -> Option<SchemaScript> {
    let reviews = descriptor.reviews.as_ref()?;

    let items: Vec<Value> = reviews
        .items
        .iter()
        .map(|review| {
            let mut map = Map::new();
            map.insert("@type".into(), json!("Review"));
            map.insert(
                "author".into(),
                json!({ "@type": "Person", "name": review.author }),
            );
            map.insert(
                "reviewRating".into(),
                json!({ "@type": "Rating", "ratingValue": review.rating, "bestRating": 5 }),
            );
            map.insert("reviewBody".into(), json!(review.body));
            insert_opt(&mut map, "datePublished", review.date_published.as_ref());
            Value::Object(map)
        })
        .collect();

    Some(SchemaScript {
        group: SchemaGroup::Reviews,
        json: json!({
            "@context": "https://schema.org",
            "@type": "Organization",
            "name": descriptor.site.name,
            "aggregateRating": {
                "@type": "AggregateRating",
                "ratingValue": reviews.rating_value,
                "reviewCount": reviews.review_count,
                "bestRating": 5,
            },
            "review": items,
        }),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeadElement {
    Title(String),
    Meta(MetaTag),
    Link(LinkTag),
    Schema(SchemaScript),
}

/// The document head: an ordered list of elements plus the `<html lang>`.
///
/// Elements added by the page shell (charset, viewport, stylesheets) are kept
/// across applies; only what `HeadMetadata` manages is touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentHead {
    lang: Option<String>,
    elements: Vec<HeadElement>,
}

impl DocumentHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn elements(&self) -> &[HeadElement] {
        &self.elements
    }

    pub fn title(&self) -> Option<&str> {
        self.elements.iter().find_map(|element| match element {
            HeadElement::Title(title) => Some(title.as_str()),
            _ => None,
        })
    }

    pub fn meta(&self, selector: &MetaSelector) -> Option<&str> {
        self.elements.iter().find_map(|element| match element {
            HeadElement::Meta(tag) if &tag.selector == selector => Some(tag.content.as_str()),
            _ => None,
        })
    }

    pub fn links(&self, rel: &str) -> Vec<&LinkTag> {
        self.elements
            .iter()
            .filter_map(|element| match element {
                HeadElement::Link(link) if link.rel == rel => Some(link),
                _ => None,
            })
            .collect()
    }

    pub fn schema(&self, group: SchemaGroup) -> Option<&Value> {
        self.elements.iter().find_map(|element| match element {
            HeadElement::Schema(schema) if schema.group == group => Some(&schema.json),
            _ => None,
        })
    }

    pub fn set_title(&mut self, title: &str) {
        for element in &mut self.elements {
            if let HeadElement::Title(existing) = element {
                *existing = title.to_string();
                return;
            }
        }
        self.elements.insert(0, HeadElement::Title(title.to_string()));
    }

    /// Update the content of the meta tag matching `selector` in place, or
    /// append a new tag when none exists.
    pub fn upsert_meta(&mut self, selector: MetaSelector, content: &str) {
        for element in &mut self.elements {
            if let HeadElement::Meta(tag) = element {
                if tag.selector == selector {
                    tag.content = content.to_string();
                    return;
                }
            }
        }
        self.elements.push(HeadElement::Meta(MetaTag {
            selector,
            content: content.to_string(),
        }));
    }

    /// Remove every link with `rel` and append `links` instead.
    pub fn replace_links(&mut self, rel: &str, links: Vec<LinkTag>) {
        self.elements
            .retain(|element| !matches!(element, HeadElement::Link(link) if link.rel == rel));
        self.elements
            .extend(links.into_iter().map(HeadElement::Link));
    }

    /// Replace the script for `group` wholesale; `None` removes it.
    pub fn replace_schema(&mut self, group: SchemaGroup, json: Option<Value>) {
        self.elements
            .retain(|element| !matches!(element, HeadElement::Schema(schema) if schema.group == group));
        if let Some(json) = json {
            self.elements
                .push(HeadElement::Schema(SchemaScript { group, json }));
        }
    }

    /// Apply a head description. Last apply wins; nothing is kept for undo.
    pub fn apply(&mut self, metadata: &HeadMetadata) {
        self.lang = Some(metadata.lang.clone());
        self.set_title(&metadata.title);

        for tag in &metadata.meta {
            self.upsert_meta(tag.selector.clone(), &tag.content);
        }

        self.replace_links(
            "canonical",
            vec![LinkTag {
                rel: "canonical".to_string(),
                href: metadata.canonical.clone(),
                hreflang: None,
            }],
        );
        self.replace_links("alternate", metadata.alternates.clone());

        for group in SchemaGroup::ALL {
            self.replace_schema(group, metadata.schema(group).cloned());
        }
    }

    /// Render the head contents as HTML, one element per line.
    pub fn render(&self) -> String {
        self.elements
            .iter()
            .map(render_element)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_element(element: &HeadElement) -> String {
    match element {
        HeadElement::Title(title) => format!("<title>{}</title>", escape_html(title)),
        HeadElement::Meta(tag) => {
            let (attribute, key) = match &tag.selector {
                MetaSelector::Name(name) => ("name", name),
                MetaSelector::Property(property) => ("property", property),
            };
            format!(
                r#"<meta {}="{}" content="{}">"#,
                attribute,
                escape_html(key),
                escape_html(&tag.content)
            )
        }
        HeadElement::Link(link) => match &link.hreflang {
            Some(hreflang) => format!(
                r#"<link rel="{}" hreflang="{}" href="{}">"#,
                escape_html(&link.rel),
                escape_html(hreflang),
                escape_html(&link.href)
            ),
            None => format!(
                r#"<link rel="{}" href="{}">"#,
                escape_html(&link.rel),
                escape_html(&link.href)
            ),
        },
        HeadElement::Schema(schema) => {
            // "</" inside a script body would close the tag early
            let json = schema.json.to_string().replace("</", "<\\/");
            format!(
                r#"<script type="application/ld+json" data-schema="{}">{}</script>"#,
                schema.group.as_str(),
                json
            )
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
