//! # Tests Module
//!
//! Service-level tests for the tasktweet web service: HTTP endpoints driven through
//! the axum `Router`, and full automation runs against in-memory collaborators.
//!
//! ## Test Categories
//!
//! ### Unit Tests
//! - Server configuration (`get_server_port`)
//! - Page id extraction from query, body, Referer and headers
//!
//! ### Integration Tests
//! - HTTP endpoint testing for all routes
//! - Automation runs: posted, skipped, and failures tagged with their stage
//!
//! ## Test Environment
//!
//! No test touches the network: Notion, Gemini, X and mail are replaced by fakes.

use crate::{
    config::{get_server_port, ContentLimits, EmailSettings, GeminiSettings, NotionSettings},
    content::{Task, TextGenerator},
    email::{MailMessage, MailTransport},
    error::BoxError,
    handlers::{
        extract_page_id, handle_automate_get, handle_automate_post, handle_health, handle_root,
        handle_status, AppState,
    },
    notion::{decide_generation, PageAnalysis, PageStatus, TaskSource},
    twitter::TweetPoster,
    workflow::Services,
    Settings, TwitterConfig,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const PAGE_ID: &str = "0123456789abcdef0123456789abcdef";

struct FakeNotion {
    status: PageStatus,
    completed: Vec<&'static str>,
    incomplete: Vec<&'static str>,
    /// Ask for a tweet whatever the gating rules say.
    force_generate: bool,
    requested: Mutex<Vec<String>>,
}

fn task(title: &str, completed: bool) -> Task {
    Task {
        id: format!("block-{}", title.len()),
        title: title.to_string(),
        content: format!("Work: {}", title),
        completed,
        date: "2026-10-18".to_string(),
    }
}

#[async_trait]
impl TaskSource for FakeNotion {
    async fn analyze_page(&self, page_id: &str) -> Result<PageAnalysis, BoxError> {
        self.requested.lock().unwrap().push(page_id.to_string());
        let completed_tasks: Vec<Task> = self.completed.iter().map(|t| task(t, true)).collect();
        let incomplete_tasks: Vec<Task> = self.incomplete.iter().map(|t| task(t, false)).collect();
        let (should_generate, reason) =
            decide_generation(self.status, completed_tasks.len(), incomplete_tasks.len());
        let should_generate_tweet = should_generate || self.force_generate;
        Ok(PageAnalysis {
            status: self.status,
            completed_tasks,
            incomplete_tasks,
            should_generate_tweet,
            reason: reason.to_string(),
        })
    }
}

/// Answers every prompt with the same text.
struct FixedModel(String);

#[async_trait]
impl TextGenerator for FixedModel {
    async fn generate(&self, _prompt: &str) -> Result<String, BoxError> {
        Ok(self.0.clone())
    }
}

/// Hands out sequential ids. With `fail_at: Some(n)` the n-th post and every
/// later one fail, and so does the connection check.
struct FakeX {
    fail_at: Option<usize>,
    posts: Mutex<Vec<(String, Option<String>)>>,
}

#[async_trait]
impl TweetPoster for FakeX {
    async fn post(&self, text: &str, reply_to: Option<&str>) -> Result<String, BoxError> {
        let mut posts = self.posts.lock().unwrap();
        if self.fail_at.is_some_and(|n| posts.len() + 1 >= n) {
            return Err("503 Service Unavailable".into());
        }
        posts.push((text.to_string(), reply_to.map(str::to_string)));
        Ok(format!("17{:02}", posts.len()))
    }

    async fn verify_connection(&self) -> Result<String, BoxError> {
        if self.fail_at.is_some() {
            return Err("401 Unauthorized".into());
        }
        Ok("tasktweet".into())
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl MailTransport for Outbox {
    async fn send(&self, message: &MailMessage) -> Result<(), BoxError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Harness {
    notion: Arc<FakeNotion>,
    x: Arc<FakeX>,
    outbox: Arc<Outbox>,
    app: Router,
}

fn test_settings() -> Settings {
    Settings {
        notion: NotionSettings {
            api_key: Some("secret_notion".into()),
            default_page_id: None,
            api_url: "http://notion.invalid".into(),
            version: "2022-06-28".into(),
        },
        twitter: TwitterConfig {
            access_token: "access".into(),
            ..TwitterConfig::default()
        },
        twitter_api_url: "http://x.invalid/2".into(),
        gemini: GeminiSettings {
            api_key: Some("gemini".into()),
            model: "gemini-1.5-flash".into(),
            api_url: "http://gemini.invalid".into(),
        },
        email: EmailSettings {
            api_url: "http://mail.invalid".into(),
            api_key: Some("mail".into()),
            from: Some("bot@example.com".into()),
            to: Some("ops@example.com".into()),
            fallback_to: None,
            retries: 1,
            backoff: Duration::ZERO,
        },
        limits: ContentLimits {
            thread_pacing: Duration::ZERO,
            ..ContentLimits::default()
        },
        timezone: chrono_tz::UTC,
        automation_schedule: None,
        send_startup_notification: false,
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/automate", get(handle_automate_get).post(handle_automate_post))
        .route("/status", get(handle_status))
        .with_state(state)
}

fn harness(
    settings: Settings,
    notion: FakeNotion,
    model_output: &str,
    x_fail_at: Option<usize>,
) -> Harness {
    let notion = Arc::new(notion);
    let x = Arc::new(FakeX {
        fail_at: x_fail_at,
        posts: Mutex::new(Vec::new()),
    });
    let outbox = Arc::new(Outbox::default());
    let services = Services {
        tasks: notion.clone(),
        model: Arc::new(FixedModel(model_output.to_string())),
        poster: x.clone(),
        mail: outbox.clone(),
    };
    let app = router(AppState::with_services(settings, services));
    Harness {
        notion,
        x,
        outbox,
        app,
    }
}

fn done_page(completed: Vec<&'static str>) -> FakeNotion {
    FakeNotion {
        status: PageStatus::Done,
        completed,
        incomplete: Vec::new(),
        force_generate: false,
        requested: Mutex::new(Vec::new()),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_automate(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_handle_root() {
    let response = handle_root().await;
    assert!(response.contains("POST /automate"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness(test_settings(), done_page(vec![]), "", None);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "healthy", "service": "tasktweet"}));
}

#[tokio::test]
async fn test_automate_get_reports_missing_configuration() {
    let mut settings = test_settings();
    settings.gemini.api_key = None;
    let h = harness(settings, done_page(vec![]), "", None);

    let request = Request::builder().uri("/automate").body(Body::empty()).unwrap();
    let (status, json) = send(h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
    assert_eq!(json["configuration"]["environment"], "invalid");
    assert_eq!(json["configuration"]["missing"], json!(["GEMINI_API_KEY"]));
}

#[tokio::test]
async fn test_automate_posts_single_tweet() {
    let h = harness(
        test_settings(),
        done_page(vec!["Fix login bug", "Ship docs"]),
        "  Fixed the login bug and shipped the docs today.  ",
        None,
    );

    let uri = format!("/automate?pageId={}", PAGE_ID);
    let (status, json) = send(h.app, post_automate(&uri, json!({}))).await;

    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["action"], "posted");
    assert_eq!(json["data"]["contentType"], "single");
    assert_eq!(json["data"]["tweetIds"], json!(["1701"]));
    assert_eq!(json["data"]["taskTitles"], json!(["Fix login bug", "Ship docs"]));
    assert_eq!(
        json["message"],
        "Successfully posted 1 tweet(s) from 2 completed task(s)"
    );

    assert_eq!(*h.notion.requested.lock().unwrap(), vec![PAGE_ID.to_string()]);
    let posts = h.x.posts.lock().unwrap().clone();
    assert_eq!(
        posts,
        vec![(
            "Fixed the login bug and shipped the docs today.".to_string(),
            None
        )]
    );

    let sent = h.outbox.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Twitter Automation Success - 2 tasks posted");
}

#[tokio::test]
async fn test_automate_posts_thread_as_reply_chain() {
    // Long enough to need a thread.
    let titles: Vec<&'static str> = vec![
        "Refactored the authentication middleware to use the new session store and removed the legacy cookie path",
        "Migrated the billing service to the new queue, added idempotency keys and backfilled three months of invoices",
        "Wrote the incident review for last week's outage and scheduled the follow-up work with the platform team",
        "Reviewed four pull requests for the mobile release and paired on the flaky integration test suite",
    ];
    let model_output = "Tweet 1: Big day of backend work.\n\
                        Tweet 2: Auth middleware now uses the new session store.\n\
                        Tweet 3: Billing moved to the new queue with idempotency keys.";
    let h = harness(test_settings(), done_page(titles), model_output, None);

    let (status, json) = send(h.app, post_automate("/automate", json!({ "pageId": PAGE_ID }))).await;

    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["data"]["contentType"], "thread");
    assert_eq!(json["data"]["tweetIds"], json!(["1701", "1702", "1703"]));

    let posts = h.x.posts.lock().unwrap().clone();
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0].0, "1/3 Big day of backend work.");
    assert_eq!(posts[0].1, None);
    assert_eq!(posts[1].1.as_deref(), Some("1701"));
    assert_eq!(posts[2].1.as_deref(), Some("1702"));
}

#[tokio::test]
async fn test_automate_skips_when_page_has_open_tasks() {
    let notion = FakeNotion {
        status: PageStatus::NotDone,
        completed: vec!["Done thing"],
        incomplete: vec!["Open thing"],
        force_generate: false,
        requested: Mutex::new(Vec::new()),
    };
    let h = harness(test_settings(), notion, "unused", None);

    let (status, json) = send(h.app, post_automate("/automate", json!({ "page_id": PAGE_ID }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["action"], "skipped");
    assert_eq!(
        json["message"],
        "Tweet generation skipped: Status is not done and has incomplete tasks"
    );
    assert_eq!(json["data"]["analysis"]["completedTasks"], 1);
    assert!(h.x.posts.lock().unwrap().is_empty());
    assert!(h.outbox.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_automate_failure_is_tagged_and_mailed() {
    let h = harness(
        test_settings(),
        done_page(vec!["Fix login bug"]),
        "Fixed the login bug.",
        Some(1),
    );

    let (status, json) = send(h.app, post_automate("/automate", json!({ "pageId": PAGE_ID }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["stage"], "twitter-posting");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Twitter posting failed: Failed to post tweet 1/1"));
    assert_eq!(json["error"]["postedTweetIds"], json!([]));

    let sent = h.outbox.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].subject,
        "Twitter Automation Error - automation-workflow/twitter-posting"
    );
}

#[tokio::test]
async fn test_automate_partial_thread_reports_posted_ids() {
    let titles: Vec<&'static str> = vec![
        "Refactored the authentication middleware to use the new session store and removed the legacy cookie path",
        "Migrated the billing service to the new queue, added idempotency keys and backfilled three months of invoices",
        "Wrote the incident review for last week's outage and scheduled the follow-up work with the platform team",
        "Reviewed four pull requests for the mobile release and paired on the flaky integration test suite",
    ];
    let model_output = "Tweet 1: Big day of backend work.\n\
                        Tweet 2: Auth middleware now uses the new session store.\n\
                        Tweet 3: Billing moved to the new queue with idempotency keys.";
    let h = harness(test_settings(), done_page(titles), model_output, Some(3));

    let (status, json) = send(h.app, post_automate("/automate", json!({ "pageId": PAGE_ID }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["stage"], "twitter-posting");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Failed to post tweet 3/3"));
    assert_eq!(json["error"]["postedTweetIds"], json!(["1701", "1702"]));
    assert_eq!(h.x.posts.lock().unwrap().len(), 2);

    let sent = h.outbox.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let html = sent[0].html.as_deref().unwrap();
    assert!(html.contains("Already posted (not rolled back): 1701, 1702"));
}

#[tokio::test]
async fn test_automate_without_tasks_fails_in_analysis_stage() {
    let mut notion = done_page(vec![]);
    notion.force_generate = true;
    let h = harness(test_settings(), notion, "unused", None);

    let (status, json) = send(h.app, post_automate("/automate", json!({ "pageId": PAGE_ID }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["stage"], "content-analysis");
    assert!(h.x.posts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_automate_without_page_id_fails_in_fetch_stage() {
    let h = harness(test_settings(), done_page(vec!["x"]), "x", None);

    let (status, json) = send(h.app, post_automate("/automate", json!({}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["stage"], "notion-data-fetch");
    assert!(h.notion.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_automate_uses_default_page_id() {
    let mut settings = test_settings();
    settings.notion.default_page_id = Some("fallback-page".into());
    let h = harness(settings, done_page(vec![]), "x", None);

    let (status, json) = send(h.app, post_automate("/automate", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["action"], "skipped");
    assert_eq!(*h.notion.requested.lock().unwrap(), vec!["fallback-page".to_string()]);
}

#[tokio::test]
async fn test_automate_reports_missing_environment() {
    let mut settings = test_settings();
    settings.email.to = None;
    let h = harness(settings, done_page(vec!["x"]), "x", None);

    let (status, json) = send(h.app, post_automate("/automate", json!({ "pageId": PAGE_ID }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["stage"], "environment-validation");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("ERROR_NOTIFICATION_EMAIL"));
}

#[tokio::test]
async fn test_lazy_services_fail_on_missing_keys() {
    let mut settings = test_settings();
    settings.notion.api_key = None;
    let app = router(AppState::new(settings));

    let (status, json) = send(app, post_automate("/automate", json!({ "pageId": PAGE_ID }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["stage"], "environment-validation");
}

#[tokio::test]
async fn test_status_basic_and_detailed() {
    let h = harness(test_settings(), done_page(vec![]), "", None);

    let basic = Request::builder().uri("/status").body(Body::empty()).unwrap();
    let (status, json) = send(h.app.clone(), basic).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["system"]["timezone"], "UTC");
    assert!(json.get("integrations").is_none());

    let detailed = Request::builder()
        .uri("/status?detailed=true")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(h.app, detailed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overall"]["allServicesHealthy"], true);
    assert_eq!(json["integrations"]["twitter"]["connected"], true);
    // The mail check sends a test message.
    assert_eq!(h.outbox.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_detailed_degrades_when_x_is_down() {
    let h = harness(test_settings(), done_page(vec![]), "", Some(1));
    let request = Request::builder()
        .uri("/status?detailed=true")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(h.app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["integrations"]["twitter"]["status"], "error");
    assert_eq!(json["overall"]["status"], "degraded");
}

#[test]
fn test_extract_page_id_precedence() {
    let mut query = HashMap::new();
    let mut headers = HeaderMap::new();
    headers.insert("x-page-id", HeaderValue::from_static("from-header"));

    assert_eq!(
        extract_page_id(&query, &headers, b"").as_deref(),
        Some("from-header")
    );

    headers.insert(
        "referer",
        HeaderValue::from_static(
            "https://www.notion.so/team/Daily-Log?p=fedcba9876543210fedcba9876543210&pm=s",
        ),
    );
    assert_eq!(
        extract_page_id(&query, &headers, b"").as_deref(),
        Some("fedcba9876543210fedcba9876543210")
    );

    let body = br#"{"page_id": "from-body"}"#;
    assert_eq!(
        extract_page_id(&query, &headers, body).as_deref(),
        Some("from-body")
    );

    query.insert("pageId".to_string(), "from-query".to_string());
    assert_eq!(
        extract_page_id(&query, &headers, body).as_deref(),
        Some("from-query")
    );
}

#[test]
fn test_extract_page_id_from_referer_path_and_garbage() {
    let query = HashMap::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        "referer",
        HeaderValue::from_static("https://www.notion.so/0123456789ABCDEF0123456789abcdef"),
    );
    assert_eq!(
        extract_page_id(&query, &headers, b"not json").as_deref(),
        Some("0123456789ABCDEF0123456789abcdef")
    );

    let headers = HeaderMap::new();
    assert_eq!(extract_page_id(&query, &headers, b"{\"pageId\": \"  \"}"), None);
}

/// Tests the server port configuration function.
///
/// This test verifies that `get_server_port` correctly reads the PORT environment
/// variable and returns the appropriate port number, or defaults to 3000.
#[test]
fn test_get_server_port() {
    std::env::remove_var("PORT");
    assert_eq!(get_server_port(), 3000);

    std::env::set_var("PORT", "8080");
    assert_eq!(get_server_port(), 8080);

    std::env::remove_var("PORT");
}
