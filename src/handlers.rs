//! HTTP route handlers for the tasktweet service.
//!
//! This module contains the shared application state and the route handler
//! functions that trigger automation runs and report service status.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use log::{error, info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

use crate::config::Settings;
use crate::cronjob::current_time;
use crate::error::{BoxError, Stage};
use crate::workflow::{Automation, AutomationFailure, Services};

const PAGE_ID_HEADERS: [&str; 3] = ["x-notion-page-id", "notion-page-id", "x-page-id"];

/// Shared state: configuration plus the lazily built automation services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    settings: Settings,
    automation: OnceCell<Arc<Automation>>,
}

impl AppState {
    /// Services are built from `settings` on first use.
    pub fn new(settings: Settings) -> Self {
        AppState {
            inner: Arc::new(AppInner {
                settings,
                automation: OnceCell::new(),
            }),
        }
    }

    /// Uses the given collaborators instead of the HTTP-backed ones.
    pub fn with_services(settings: Settings, services: Services) -> Self {
        let automation = Arc::new(Automation::new(services, &settings));
        AppState {
            inner: Arc::new(AppInner {
                settings,
                automation: OnceCell::new_with(Some(automation)),
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Returns the shared automation, building its services on first call.
    pub async fn automation(&self) -> Result<Arc<Automation>, BoxError> {
        let settings = &self.inner.settings;
        self.inner
            .automation
            .get_or_try_init(|| async {
                info!("Initializing automation services");
                let services = Services::from_settings(settings)?;
                Ok::<_, BoxError>(Arc::new(Automation::new(services, settings)))
            })
            .await
            .cloned()
    }
}

/// Handles GET requests to the `/` endpoint.
pub async fn handle_root() -> &'static str {
    "Notion to Twitter automation service. POST /automate to run the workflow."
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "tasktweet"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "tasktweet"}))
}

/// Handles GET requests to the `/automate` endpoint: reports readiness.
pub async fn handle_automate_get(State(state): State<AppState>) -> Json<Value> {
    let missing = state.settings().missing_required();
    Json(json!({
        "status": "ready",
        "message": "Automation endpoint is ready",
        "configuration": {
            "environment": if missing.is_empty() { "valid" } else { "invalid" },
            "missing": missing,
        },
        "endpoints": {
            "trigger": "POST /automate",
            "health": "GET /automate",
        },
        "timestamp": current_time(state.settings().timezone),
    }))
}

/// Handles POST requests to the `/automate` endpoint: runs the workflow once.
///
/// The page id is taken from, in order: the `pageId` query parameter, the JSON
/// body (`pageId` or `page_id`), the `Referer` header, the Notion page headers,
/// and finally `NOTION_PAGE_ID`.
///
/// # Returns
///
/// - `200`: the run report, also when tweet generation was skipped
/// - `500`: `{ success: false, error: { message, stage, timestamp, postedTweetIds } }`
pub async fn handle_automate_post(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let page_id = extract_page_id(&query, &headers, &body)
        .or_else(|| state.settings().notion.default_page_id.clone());
    info!(
        "Automation triggered (page: {})",
        page_id.as_deref().unwrap_or("none")
    );

    let automation = match state.automation().await {
        Ok(automation) => automation,
        Err(e) => {
            let missing = state.settings().missing_required();
            let (stage, message) = if missing.is_empty() {
                (
                    Stage::Initialization,
                    format!("Service initialization failed: {}", e),
                )
            } else {
                (
                    Stage::EnvironmentValidation,
                    format!(
                        "Configuration error: Missing required environment variables: {}",
                        missing.join(", ")
                    ),
                )
            };
            error!("Automation workflow failed at stage {}: {}", stage, message);
            let now = current_time(state.settings().timezone);
            return failure_response(AutomationFailure {
                message,
                stage,
                started_at: now.clone(),
                failed_at: now,
                posted_tweet_ids: Vec::new(),
            });
        }
    };

    match automation.run(page_id.as_deref()).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": report.message(),
                "data": report,
                "timestamp": current_time(state.settings().timezone),
            })),
        ),
        Err(failure) => failure_response(failure),
    }
}

fn failure_response(failure: AutomationFailure) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "Automation workflow failed",
            "error": {
                "message": failure.message,
                "stage": failure.stage,
                "timestamp": failure.failed_at,
                "postedTweetIds": failure.posted_tweet_ids,
            },
            "debug": {
                "startTime": failure.started_at,
                "failedAt": failure.failed_at,
                "stage": failure.stage,
            },
        })),
    )
}

/// Finds the Notion page id named by a request, if any.
pub fn extract_page_id(
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &[u8],
) -> Option<String> {
    let non_blank = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    if let Some(id) = query.get("pageId").and_then(|id| non_blank(id)) {
        return Some(id);
    }

    if !body.is_empty() {
        match serde_json::from_slice::<Value>(body) {
            Ok(json) => {
                let from_body = ["pageId", "page_id"]
                    .iter()
                    .find_map(|key| json.get(*key).and_then(Value::as_str).and_then(non_blank));
                if from_body.is_some() {
                    return from_body;
                }
            }
            Err(e) => warn!("Ignoring unparseable request body: {}", e),
        }
    }

    let referer = headers
        .get("referer")
        .or_else(|| headers.get("referrer"))
        .and_then(|v| v.to_str().ok());
    if let Some(id) = referer.and_then(page_id_from_referer) {
        return Some(id);
    }

    PAGE_ID_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()).and_then(non_blank))
}

fn is_page_id(candidate: &str) -> bool {
    candidate.len() == 32 && candidate.chars().all(|c| c.is_ascii_hexdigit())
}

/// Reads a page id from a Notion URL: the `p` query parameter (peek view) or a
/// path segment that starts with the 32 hex digit id.
fn page_id_from_referer(referer: &str) -> Option<String> {
    let url = Url::parse(referer).ok()?;
    if let Some((_, id)) = url.query_pairs().find(|(k, v)| k == "p" && is_page_id(v)) {
        return Some(id.into_owned());
    }
    url.path_segments()?
        .find_map(|segment| segment.get(..32).filter(|head| is_page_id(head)))
        .map(str::to_string)
}

/// Handles GET requests to the `/status` endpoint.
///
/// With `?detailed=true` the X, mail and Notion connections are checked
/// concurrently, and any failing check turns the response into a `503`.
pub async fn handle_status(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    info!("Status check requested");
    let settings = state.settings();
    let missing = settings.missing_required();
    let detailed = query.get("detailed").map(String::as_str) == Some("true");

    let mut status = json!({
        "status": if missing.is_empty() { "healthy" } else { "degraded" },
        "service": "tasktweet",
        "timestamp": current_time(settings.timezone),
        "system": {
            "timezone": settings.timezone.name(),
            "mode": if settings.automation_schedule.is_some() { "scheduled" } else { "on-demand" },
        },
        "environment": {
            "envConfigValid": missing.is_empty(),
            "missing": missing,
        },
    });

    if !detailed {
        return (StatusCode::OK, Json(status));
    }

    info!("Performing detailed status check");
    let automation = match state.automation().await {
        Ok(automation) => automation,
        Err(e) => {
            error!("Status check could not initialize services: {}", e);
            status["overall"] = json!({
                "status": "degraded",
                "allServicesHealthy": false,
                "message": format!("Service initialization failed: {}", e),
            });
            return (StatusCode::SERVICE_UNAVAILABLE, Json(status));
        }
    };

    let services = automation.services();
    let default_page = settings.notion.default_page_id.clone();
    let (twitter, email, notion) = tokio::join!(
        async {
            match services.poster.verify_connection().await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Twitter connection check failed: {}", e);
                    false
                }
            }
        },
        automation.notifier().test_connection(),
        async {
            // Without a default page there is nothing to read; the client was built, so the key is set.
            let Some(page_id) = default_page else {
                return true;
            };
            match services.tasks.completed_tasks(&page_id).await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Notion connection check failed: {}", e);
                    false
                }
            }
        }
    );

    let healthy = twitter && email && notion;
    let integration = |ok: bool, description: &str| {
        json!({
            "status": if ok { "healthy" } else { "error" },
            "connected": ok,
            "description": description,
        })
    };
    status["integrations"] = json!({
        "notion": integration(notion, "Notion API for task retrieval"),
        "twitter": integration(twitter, "X API for posting tweets"),
        "email": integration(email, "Mail API for error and success notifications"),
        "gemini": {
            "status": if settings.gemini.api_key.is_some() { "configured" } else { "not-configured" },
            "connected": settings.gemini.api_key.is_some(),
            "description": "Gemini for content generation",
        },
    });
    status["overall"] = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "allServicesHealthy": healthy,
        "message": if healthy {
            "All systems operational"
        } else {
            "Some services degraded - error notifications will be sent"
        },
    });
    info!(
        "Detailed status check completed (twitter: {}, email: {}, notion: {})",
        twitter, email, notion
    );

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
