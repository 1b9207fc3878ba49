//! The end-to-end automation run: Notion page → generated copy → tweets → mail.
//!
//! Each run walks the stages in order and tags any failure with the stage it
//! happened in. Failures are mailed to the operator before being returned.

use chrono::Utc;
use chrono_tz::Tz;
use log::{debug, error, info};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ContentLimits, Settings};
use crate::content::{
    analyze_content, processing::format_content_for_display, validate_twitter_content,
    ContentGenerator, TextGenerator,
};
use crate::email::{HttpMailTransport, MailTransport, Notifier};
use crate::error::{AutomationError, BoxError, Stage};
use crate::gemini::GeminiClient;
use crate::notion::{NotionClient, PageAnalysis, PageStatus, TaskSource};
use crate::twitter::{ThreadPublisher, TweetPoster, TwitterClient};

/// The collaborator handles a run talks to.
#[derive(Clone)]
pub struct Services {
    pub tasks: Arc<dyn TaskSource>,
    pub model: Arc<dyn TextGenerator>,
    pub poster: Arc<dyn TweetPoster>,
    pub mail: Arc<dyn MailTransport>,
}

impl Services {
    /// Builds the HTTP-backed collaborators over one shared `reqwest::Client`.
    pub fn from_settings(settings: &Settings) -> Result<Self, BoxError> {
        let http = Client::builder().user_agent("tasktweet").build()?;

        Ok(Services {
            tasks: Arc::new(NotionClient::new(
                http.clone(),
                &settings.notion,
                settings.timezone,
            )?),
            model: Arc::new(GeminiClient::new(http.clone(), &settings.gemini)?),
            poster: Arc::new(TwitterClient::new(
                http.clone(),
                settings.twitter_api_url.clone(),
                settings.twitter.clone(),
            )),
            mail: Arc::new(HttpMailTransport::new(http, &settings.email)?),
        })
    }
}

/// Page analysis as reported to callers: counts instead of task bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub status: PageStatus,
    pub reason: String,
    pub completed_tasks: usize,
    pub incomplete_tasks: usize,
}

impl From<&PageAnalysis> for AnalysisSummary {
    fn from(analysis: &PageAnalysis) -> Self {
        AnalysisSummary {
            status: analysis.status,
            reason: analysis.reason.clone(),
            completed_tasks: analysis.completed_tasks.len(),
            incomplete_tasks: analysis.incomplete_tasks.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub start_time: String,
    pub end_time: String,
    pub duration_ms: u128,
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AutomationReport {
    Skipped {
        analysis: AnalysisSummary,
        timestamp: String,
    },
    #[serde(rename_all = "camelCase")]
    Posted {
        analysis: AnalysisSummary,
        task_titles: Vec<String>,
        content_type: String,
        tweet_ids: Vec<String>,
        timing: Timing,
    },
}

impl AutomationReport {
    pub fn message(&self) -> String {
        match self {
            AutomationReport::Skipped { analysis, .. } => {
                format!("Tweet generation skipped: {}", analysis.reason)
            }
            AutomationReport::Posted {
                task_titles,
                tweet_ids,
                ..
            } => format!(
                "Successfully posted {} tweet(s) from {} completed task(s)",
                tweet_ids.len(),
                task_titles.len()
            ),
        }
    }
}

/// A failed run, tagged with the stage it stopped in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationFailure {
    pub message: String,
    pub stage: Stage,
    pub started_at: String,
    pub failed_at: String,
    /// Ids of a partially published thread, oldest first.
    pub posted_tweet_ids: Vec<String>,
}

pub struct Automation {
    services: Services,
    generator: ContentGenerator,
    publisher: ThreadPublisher,
    notifier: Notifier,
    limits: ContentLimits,
    missing_config: Vec<&'static str>,
    timezone: Tz,
}

impl Automation {
    pub fn new(services: Services, settings: &Settings) -> Self {
        Automation {
            generator: ContentGenerator::new(services.model.clone(), settings.limits.clone()),
            publisher: ThreadPublisher::new(services.poster.clone(), &settings.limits),
            notifier: Notifier::new(services.mail.clone(), &settings.email, settings.timezone),
            limits: settings.limits.clone(),
            missing_config: settings.missing_required(),
            timezone: settings.timezone,
            services,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn now(&self) -> String {
        Utc::now().with_timezone(&self.timezone).to_rfc3339()
    }

    /// Runs the whole pipeline for `page_id`.
    ///
    /// A missing page id fails in the `notion-data-fetch` stage. Every failure is
    /// mailed with context `automation-workflow/<stage>` before it is returned.
    pub async fn run(&self, page_id: Option<&str>) -> Result<AutomationReport, AutomationFailure> {
        let started_at = self.now();
        info!(
            "Starting automated Twitter posting workflow (page: {})",
            page_id.unwrap_or("none")
        );

        match self.execute(page_id, &started_at).await {
            Ok(report) => Ok(report),
            Err(err) => {
                let failed_at = self.now();
                error!(
                    "Automation workflow failed at stage {}: {}",
                    err.stage, err.message
                );

                let mut details = err
                    .source
                    .as_ref()
                    .map(|source| format!("{:?}", source))
                    .unwrap_or_default();
                if !err.posted_ids.is_empty() {
                    details.push_str(&format!(
                        "\nAlready posted (not rolled back): {}",
                        err.posted_ids.join(", ")
                    ));
                }
                self.notifier
                    .notify_error(
                        &err.message,
                        &details,
                        &format!("automation-workflow/{}", err.stage),
                    )
                    .await;

                Err(AutomationFailure {
                    message: err.message,
                    stage: err.stage,
                    started_at,
                    failed_at,
                    posted_tweet_ids: err.posted_ids,
                })
            }
        }
    }

    async fn execute(
        &self,
        page_id: Option<&str>,
        started_at: &str,
    ) -> Result<AutomationReport, AutomationError> {
        let clock = Instant::now();

        info!("Validating environment configuration");
        if !self.missing_config.is_empty() {
            return Err(AutomationError::new(
                Stage::EnvironmentValidation,
                format!(
                    "Configuration error: Missing required environment variables: {}",
                    self.missing_config.join(", ")
                ),
            ));
        }

        let page_id = page_id.map(str::trim).filter(|id| !id.is_empty()).ok_or_else(|| {
            AutomationError::new(
                Stage::NotionDataFetch,
                "No Notion page ID provided. Pass pageId as a query parameter or in the request \
                 body, send it in a Notion page header, or set NOTION_PAGE_ID.",
            )
        })?;

        info!("Analyzing Notion page {} for tasks and status", page_id);
        let analysis = self
            .services
            .tasks
            .analyze_page(page_id)
            .await
            .map_err(|e| AutomationError::from_source(Stage::NotionDataFetch, e))?;

        if !analysis.should_generate_tweet {
            info!("Workflow completed - tweet generation skipped: {}", analysis.reason);
            return Ok(AutomationReport::Skipped {
                analysis: AnalysisSummary::from(&analysis),
                timestamp: self.now(),
            });
        }

        let tasks = &analysis.completed_tasks;
        info!(
            "Proceeding with {} completed task(s) - {}",
            tasks.len(),
            analysis.reason
        );

        if tasks.is_empty() {
            return Err(AutomationError::new(
                Stage::ContentAnalysis,
                format!("No completed tasks to tweet about ({})", analysis.reason),
            ));
        }
        let content_analysis = analyze_content(tasks, &self.limits);
        info!(
            "Content analysis: {} tasks, {} chars, {:?} / {:?}",
            content_analysis.task_count,
            content_analysis.total_length,
            content_analysis.content_type,
            content_analysis.complexity
        );

        info!("Generating Twitter content");
        let content = self
            .generator
            .create_twitter_post(tasks)
            .await
            .map_err(|e| AutomationError::from_source(Stage::AiContentGeneration, e))?;

        debug!("Generated content:\n{}", format_content_for_display(&content));

        info!("Validating generated Twitter content");
        if !validate_twitter_content(&content, self.limits.tweet_char_limit) {
            return Err(AutomationError::new(
                Stage::ContentValidation,
                "Generated content validation failed: Content does not meet Twitter requirements",
            ));
        }

        info!(
            "Posting content to Twitter ({}, {} tweets)",
            content.kind(),
            content.tweet_count()
        );
        let result = self.publisher.post_twitter_content(&content).await;
        if let Some(reason) = &result.error {
            return Err(AutomationError::new(
                Stage::TwitterPosting,
                format!("Twitter posting failed: {}", reason),
            )
            .with_posted_ids(result.tweet_ids.clone()));
        }

        info!("Sending success notification");
        self.notifier
            .send_success_notification(&content, &result, tasks.len())
            .await;

        let end_time = self.now();
        let duration_ms = clock.elapsed().as_millis();
        info!(
            "Automation workflow completed in {}ms: {} tasks, {} tweets",
            duration_ms,
            tasks.len(),
            result.tweet_ids.len()
        );

        Ok(AutomationReport::Posted {
            analysis: AnalysisSummary::from(&analysis),
            task_titles: tasks.iter().map(|t| t.title.clone()).collect(),
            content_type: content.kind().to_string(),
            tweet_ids: result.tweet_ids,
            timing: Timing {
                start_time: started_at.to_string(),
                end_time,
                duration_ms,
            },
        })
    }
}
