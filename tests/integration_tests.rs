//! Integration tests for the agency site
//!
//! The first half drives the contact backend router directly with
//! `tower::ServiceExt::oneshot`. The second half starts the backend on a
//! local port, serving the shipped `assets/` directory, and runs the client
//! components (detector, translation store, SEO applier, contact pipeline)
//! against it.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use agency_site::{
    config::Config,
    contact::{ContactForm, ContactPipeline, SubmitOutcome},
    i18n::{BrowserEnvironment, DetectionStrategy, Language, LanguageDetector, TranslationStore},
    seo::{DocumentHead, MetaSelector, SchemaGroup, SeoApplier},
    server::{create_app_state, create_router, AppState, RATE_LIMIT_REMAINING_HEADER},
    storage::{ClientStorage, MemoryStorage, STORAGE_DETECTED_KEY, STORAGE_LANGUAGE_KEY},
};

const ADMIN_KEY: &str = "test-admin-key";

// ==================== Test Helpers ====================

fn assets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}

fn create_test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::with_admin_key(ADMIN_KEY, temp_dir.path().join("messages.json"));
    config.assets_dir = assets_dir();
    config
}

fn create_test_app(temp_dir: &TempDir) -> (Router, AppState) {
    let state = create_app_state(create_test_config(temp_dir));
    (create_router(state.clone()), state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Submission arriving on a socket from `ip`.
fn post_contact(body: &Value, ip: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header("content-type", "application/json")
        .header("user-agent", "integration-test/1.0")
        .body(Body::from(body.to_string()))
        .unwrap();
    let peer = SocketAddr::new(ip.parse().unwrap(), 5000);
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn forwarded_for(mut request: Request<Body>, ip: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-forwarded-for", ip.parse().unwrap());
    request
}

fn valid_submission() -> Value {
    json!({
        "name": "Elena Popescu",
        "email": "elena@example.ro",
        "message": "We would like a new website for our dental clinic."
    })
}

/// Answer a question of the form "a op b".
fn solve(question: &str) -> i32 {
    let parts: Vec<&str> = question.split(' ').collect();
    let a: i32 = parts[0].parse().unwrap();
    let b: i32 = parts[2].parse().unwrap();
    match parts[1] {
        "+" => a + b,
        "-" => a - b,
        "×" => a * b,
        other => panic!("unexpected operator {}", other),
    }
}

async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{}", addr)
}

// ==================== Backend Tests ====================

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let (status, body) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
    assert!(body["service"].is_string());
}

#[tokio::test]
async fn test_submit_list_and_mark_read() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let (status, body) = send(&app, post_contact(&valid_submission(), "198.51.100.4")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let id = body["id"].as_str().unwrap().to_string();

    let mut second = valid_submission();
    second["name"] = json!("Second Sender");
    send(&app, post_contact(&second, "198.51.100.4")).await;

    let (status, body) = send(&app, get(&format!("/api/admin/messages?key={}", ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["name"], "Second Sender", "newest first");
    assert_eq!(messages[1]["id"], id.as_str());
    assert_eq!(messages[1]["status"], "new");
    assert_eq!(messages[1]["ip"], "198.51.100.4");
    assert_eq!(messages[1]["userAgent"], "integration-test/1.0");

    let mark = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/admin/messages/{}/read?key={}", id, ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, mark).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message marked as read");

    let (_, body) = send(&app, get(&format!("/api/admin/messages?key={}", ADMIN_KEY))).await;
    let read = &body["messages"][1];
    assert_eq!(read["status"], "read");
    assert!(read["readAt"].is_string());
}

#[tokio::test]
async fn test_messages_persist_in_file() {
    let temp_dir = TempDir::new().unwrap();
    let (app, state) = create_test_app(&temp_dir);

    send(&app, post_contact(&valid_submission(), "198.51.100.5")).await;

    let raw = std::fs::read_to_string(state.messages.path()).unwrap();
    let stored: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["email"], "elena@example.ro");
}

#[tokio::test]
async fn test_admin_requires_key() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let (status, body) = send(&app, get("/api/admin/messages")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, get("/api/admin/messages?key=wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let clear = Request::builder()
        .method(Method::DELETE)
        .uri("/api/admin/messages?key=wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, clear).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mark_read_unknown_id_is_404() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/admin/messages/missing/read?key={}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Message not found");
}

#[tokio::test]
async fn test_clear_messages() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);
    send(&app, post_contact(&valid_submission(), "198.51.100.6")).await;

    let clear = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/admin/messages?key={}", ADMIN_KEY))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, clear).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);

    let (_, body) = send(&app, get(&format!("/api/admin/messages?key={}", ADMIN_KEY))).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_invalid_submission_is_400() {
    let temp_dir = TempDir::new().unwrap();
    let (app, state) = create_test_app(&temp_dir);

    let invalid = json!({"name": "A", "email": "nope", "message": "hi"});
    let (status, body) = send(&app, post_contact(&invalid, "198.51.100.7")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Email address is invalid"));
    assert!(state.messages.load_all().unwrap().is_empty());

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_captcha_is_single_use() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let (status, challenge) = send(&app, get("/api/captcha")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(challenge.get("answer").is_none());
    let answer = solve(challenge["question"].as_str().unwrap());

    let mut body = valid_submission();
    body["captchaId"] = challenge["id"].clone();
    body["captcha"] = json!(answer);

    let (status, _) = send(&app, post_contact(&body, "198.51.100.8")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, replay) = send(&app, post_contact(&body, "198.51.100.8")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(replay["error"], "Invalid or expired captcha");
}

#[tokio::test]
async fn test_wrong_captcha_is_rejected_and_consumed() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let (_, challenge) = send(&app, get("/api/captcha")).await;
    let answer = solve(challenge["question"].as_str().unwrap());

    let mut body = valid_submission();
    body["captchaId"] = challenge["id"].clone();
    body["captcha"] = json!((answer + 1).to_string());
    let (status, _) = send(&app, post_contact(&body, "198.51.100.9")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    body["captcha"] = json!(answer.to_string());
    let (status, _) = send(&app, post_contact(&body, "198.51.100.9")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_per_ip() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    for i in 0..10 {
        let response = app
            .clone()
            .oneshot(post_contact(&valid_submission(), "203.0.113.50"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
        assert_eq!(
            response.headers()[RATE_LIMIT_REMAINING_HEADER],
            (9 - i).to_string().as_str()
        );
    }

    let (status, body) = send(&app, post_contact(&valid_submission(), "203.0.113.50")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);

    // Another client is unaffected
    let (status, _) = send(&app, post_contact(&valid_submission(), "203.0.113.51")).await;
    assert_eq!(status, StatusCode::OK);

    // Only submissions are limited
    let (status, _) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_evade_limit() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    for i in 0..10 {
        let request = forwarded_for(
            post_contact(&valid_submission(), "203.0.113.9"),
            &format!("10.0.0.{}", i),
        );
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "request {}", i + 1);
    }

    let request = forwarded_for(post_contact(&valid_submission(), "203.0.113.9"), "10.0.0.99");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_for_is_honoured_behind_trusted_proxy() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&temp_dir);
    config.trust_proxy = true;
    config.rate_limit_max = 1;
    let app = create_router(create_app_state(config));

    // Every request comes through the same proxy socket
    let first = forwarded_for(post_contact(&valid_submission(), "10.0.0.1"), "198.51.100.20");
    let (status, _) = send(&app, first).await;
    assert_eq!(status, StatusCode::OK);

    let repeat = forwarded_for(post_contact(&valid_submission(), "10.0.0.1"), "198.51.100.20");
    let (status, _) = send(&app, repeat).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let other = forwarded_for(post_contact(&valid_submission(), "10.0.0.1"), "198.51.100.21");
    let (status, _) = send(&app, other).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get(&format!("/api/admin/messages?key={}", ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["ip"], "198.51.100.21");
}

#[tokio::test]
async fn test_assets_are_served() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let (status, body) = send(&app, get("/assets/i18n/en.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nav"]["home"], "Home");

    let response = app
        .clone()
        .oneshot(get("/assets/i18n/xx.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_site_origin() {
    let temp_dir = TempDir::new().unwrap();
    let (app, _) = create_test_app(&temp_dir);

    let request = Request::builder()
        .uri("/api/health")
        .header("origin", "http://localhost:4200")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:4200"
    );
}

// ==================== Shipped Assets ====================

#[test]
fn test_shipped_dictionaries_parse_and_cover_navigation() {
    for language in Language::all() {
        let path = assets_dir()
            .join("i18n")
            .join(format!("{}.json", language.code()));
        let content = std::fs::read_to_string(&path).unwrap();
        let dictionary = agency_site::i18n::TranslationDictionary::parse(&content).unwrap();
        assert!(
            dictionary.lookup("nav.home").is_some(),
            "{} lacks nav.home",
            language.code()
        );
    }
}

#[test]
fn test_shipped_seo_descriptors_parse() {
    let dir = assets_dir().join("i18n").join("seo");
    let canonical = dir.join(format!("{}.json", Language::canonical().code()));
    assert!(canonical.exists(), "default language descriptor is required");

    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let content = std::fs::read_to_string(&path).unwrap();
        let descriptor: agency_site::seo::SeoDescriptor = serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("{} is invalid: {}", path.display(), e));
        assert!(!descriptor.defaults.title.is_empty());
    }
}

// ==================== End-to-End Client Flow ====================

#[tokio::test]
async fn test_first_visit_from_bucharest() {
    let temp_dir = TempDir::new().unwrap();
    let base = spawn_server(create_app_state(create_test_config(&temp_dir))).await;
    let client = reqwest::Client::new();

    let storage: Arc<dyn ClientStorage> = Arc::new(MemoryStorage::new());
    let session = MemoryStorage::new();

    let detector = LanguageDetector::new(client.clone()).with_strategies(
        DetectionStrategy::ORDER
            .into_iter()
            .filter(|strategy| *strategy != DetectionStrategy::GeoIp)
            .collect(),
    );
    let detection = detector
        .detect(&BrowserEnvironment {
            storage: storage.as_ref(),
            session: &session,
            timezone: Some("Europe/Bucharest"),
            locale: Some("en-US"),
        })
        .await;
    assert_eq!(detection.language, Language::ROMANIAN);
    assert_eq!(detection.source, DetectionStrategy::Timezone);
    assert_eq!(session.get(STORAGE_DETECTED_KEY).as_deref(), Some("ro"));

    let translations = TranslationStore::new(client.clone(), &base, storage.clone());
    let language = translations.load_detected(detection.language).await;
    assert_eq!(language, Language::ROMANIAN);
    assert!(translations.has_dictionary());
    assert_eq!(translations.t("nav.home"), "Acasă");
    assert_eq!(
        translations.translate("hero.greeting", &[("name", "Ana")]),
        "Bine ai venit, Ana!"
    );
    assert!(
        storage.get(STORAGE_LANGUAGE_KEY).is_none(),
        "detection is not a stored choice"
    );

    let applier = SeoApplier::new(client.clone(), &base);
    let mut head = DocumentHead::new();
    let used = applier.apply(language, "/services/", &mut head).await;
    assert_eq!(used, Some(Language::ROMANIAN));
    assert_eq!(head.lang(), Some("ro"));
    assert_eq!(head.title(), Some("Servicii | Northlight Studio"));
    assert_eq!(
        head.meta(&MetaSelector::property("og:locale")),
        Some("ro_RO")
    );
    assert_eq!(
        head.links("alternate").len(),
        Language::all().len() + 1,
        "one hreflang per language plus x-default"
    );
    assert!(head.schema(SchemaGroup::Breadcrumb).is_some());
    assert!(head.schema(SchemaGroup::Reviews).is_none());

    // Navigating home swaps the schema groups
    applier.apply(language, "/", &mut head).await;
    assert!(head.schema(SchemaGroup::Breadcrumb).is_none());
    assert!(head.schema(SchemaGroup::Faq).is_some());
    assert!(head.schema(SchemaGroup::Reviews).is_some());

    // An explicit switch is persisted
    let switched = translations.load(Language::FRENCH).await;
    assert_eq!(switched, Language::FRENCH);
    assert_eq!(storage.get(STORAGE_LANGUAGE_KEY).as_deref(), Some("fr"));
    assert_eq!(translations.t("nav.home"), "Accueil");
    // Missing in the French file, present in the French static table or English
    assert!(!translations.t("common.loading").is_empty());
}

#[tokio::test]
async fn test_language_without_seo_descriptor_uses_default() {
    let temp_dir = TempDir::new().unwrap();
    let base = spawn_server(create_app_state(create_test_config(&temp_dir))).await;

    let applier = SeoApplier::new(reqwest::Client::new(), &base);
    let mut head = DocumentHead::new();
    let used = applier.apply(Language::UKRAINIAN, "/", &mut head).await;

    // English copy, Ukrainian head
    assert_eq!(used, Some(Language::ENGLISH));
    assert_eq!(head.lang(), Some("uk"));
    assert_eq!(head.title(), Some("Northlight Studio | Websites that work"));
}

#[tokio::test]
async fn test_contact_pipeline_against_backend() {
    let temp_dir = TempDir::new().unwrap();
    let state = create_app_state(create_test_config(&temp_dir));
    let messages = state.messages.clone();
    let base = spawn_server(state).await;

    let storage = Arc::new(MemoryStorage::new());
    let mut pipeline = ContactPipeline::new(
        reqwest::Client::new(),
        Some(format!("{}/api/contact", base)),
        storage,
    );

    let answer = pipeline.open().answer.to_string();
    let form = ContactForm::new(
        "Elena Popescu",
        "elena@example.ro",
        "We would like a new website for our dental clinic.",
    );
    let outcome = pipeline.submit(&form, &answer).await;

    let SubmitOutcome::Delivered { id } = outcome else {
        panic!("expected delivery, got {:?}", outcome);
    };
    let stored = messages.load_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, id);
    assert_eq!(stored[0].ip.as_deref(), Some("127.0.0.1"));
    assert!(pipeline.backups().is_empty());
}
