//! Per-language, per-route SEO metadata.
//!
//! - `descriptor`: the JSON served at `/assets/i18n/seo/{lang}.json`
//! - `head`: declarative `HeadMetadata` and the `DocumentHead` it is applied to
//! - `applier`: fetches descriptors (with default-language fallback) and applies them

mod applier;
mod descriptor;
mod head;

pub use applier::SeoApplier;
pub use descriptor::{
    normalize_route, Breadcrumb, FaqEntry, Organization, PageSeo, PostalAddress, Review, Reviews,
    SeoDescriptor, SiteInfo,
};
pub use head::{
    localized_url, DocumentHead, HeadElement, HeadMetadata, LinkTag, MetaSelector, MetaTag,
    SchemaGroup, SchemaScript,
};
