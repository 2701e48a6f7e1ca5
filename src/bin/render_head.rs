//! Render the localized `<head>` of a page as a first-time visitor would get it.
//!
//! Usage:
//!   cargo run --bin render-head -- --route /services
//!   cargo run --bin render-head -- --timezone Europe/Bucharest --route /contact
//!   cargo run --bin render-head -- --lang fr --route /
//!
//! `--lang` stores an explicit choice before detection runs. Without it the
//! detector walks its usual chain (stored choice, session, geo-IP, timezone,
//! locale, default).
//!
//! Environment variables (all optional):
//! - SITE_URL (defaults to http://localhost:3001)
//! - STORAGE_FILE (defaults to data/client-storage.json)
//! - GEO_LOOKUP (defaults to true)

use agency_site::config::ClientConfig;
use agency_site::i18n::{
    BrowserEnvironment, DetectionStrategy, Language, LanguageDetector, TranslationStore,
};
use agency_site::seo::{DocumentHead, SeoApplier};
use agency_site::storage::{
    ClientStorage, FileStorage, MemoryStorage, ThemeMode, STORAGE_LANGUAGE_KEY,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Args {
    lang: Option<String>,
    route: Option<String>,
    timezone: Option<String>,
    locale: Option<String>,
}

impl Args {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.skip(1);

        while let Some(flag) = args.next() {
            let slot = match flag.as_str() {
                "--lang" => &mut parsed.lang,
                "--route" => &mut parsed.route,
                "--timezone" => &mut parsed.timezone,
                "--locale" => &mut parsed.locale,
                other => anyhow::bail!("Unknown argument: {}", other),
            };
            *slot = Some(args.next().with_context(|| format!("{} needs a value", flag))?);
        }

        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agency_site=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse(std::env::args())?;
    let config = ClientConfig::from_env()?;
    let client = reqwest::Client::new();

    let storage: Arc<dyn ClientStorage> = Arc::new(FileStorage::new(&config.storage_file));
    let session = MemoryStorage::new();

    if let Some(code) = args.lang.as_deref() {
        let language = Language::from_code(code)?;
        storage.set(STORAGE_LANGUAGE_KEY, language.code())?;
        info!("Stored explicit language choice: {}", language);
    }

    let mut detector = LanguageDetector::new(client.clone());
    if !config.geo_lookup {
        detector = detector.with_strategies(
            DetectionStrategy::ORDER
                .into_iter()
                .filter(|strategy| *strategy != DetectionStrategy::GeoIp)
                .collect(),
        );
    }

    let detection = detector
        .detect(&BrowserEnvironment {
            storage: storage.as_ref(),
            session: &session,
            timezone: args.timezone.as_deref(),
            locale: args.locale.as_deref(),
        })
        .await;
    info!("Detected {} via {:?}", detection.language, detection.source);

    let translations = TranslationStore::new(client.clone(), &config.site_url, storage.clone());
    let language = if detection.source == DetectionStrategy::StoredPreference {
        translations.load(detection.language).await
    } else {
        translations.load_detected(detection.language).await
    };
    if !translations.has_dictionary() {
        warn!("No dictionary available, using built-in text");
    }

    let route = args.route.as_deref().unwrap_or("/");
    let mut head = DocumentHead::new();
    let applier = SeoApplier::new(client, &config.site_url);
    match applier.apply(language, route, &mut head).await {
        Some(used) if used != language => warn!("No SEO descriptor for {}, used {}", language, used),
        Some(_) => {}
        None => warn!("No SEO descriptor available, head left empty"),
    }

    println!("{}", head.render());
    println!(
        "<!-- {} | theme: {} -->",
        translations.t("nav.home"),
        ThemeMode::load(storage.as_ref()).as_str()
    );

    Ok(())
}
