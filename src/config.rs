//! Configuration module for the tasktweet service.
//!
//! This module contains configuration structures and environment variable handling
//! for the Notion, Gemini, Twitter/X and mail integrations, plus the content limits
//! that drive tweet sizing and thread segmentation.

use chrono_tz::Tz;
use log::{debug, error, info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BoxError;

/// Default platform character limit for a single post.
pub const DEFAULT_TWEET_CHAR_LIMIT: usize = 280;
/// Default upper bound (T1) of combined task text answered with a single tweet.
pub const DEFAULT_SINGLE_THRESHOLD: usize = 280;
/// Default upper bound (T2) of combined task text answered with a summarized tweet.
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 430;
/// Default pause between consecutive posts of a thread.
pub const DEFAULT_THREAD_PACING: Duration = Duration::from_secs(2);

const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1";
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_XAPI_BASE_URL: &str = "https://api.x.com/2";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

/// Sizing and pacing constants for generated content.
///
/// These differ between deployments (some run with a 265 character limit to
/// leave room for counters and emoji, some cap threads at five pieces), so none
/// of them is hardcoded at the call sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLimits {
    /// Maximum characters in one post.
    pub tweet_char_limit: usize,
    /// Combined task text up to this length becomes a single tweet (T1).
    pub single_threshold: usize,
    /// Combined task text up to this length becomes a summarized tweet (T2).
    pub summary_threshold: usize,
    /// Maximum pieces in a thread; `None` means unbounded.
    pub max_thread_tweets: Option<usize>,
    /// Delay between successive thread posts.
    pub thread_pacing: Duration,
    /// Hashtags appended to single tweets when they still fit.
    pub default_hashtags: Vec<String>,
}

impl Default for ContentLimits {
    fn default() -> Self {
        ContentLimits {
            tweet_char_limit: DEFAULT_TWEET_CHAR_LIMIT,
            single_threshold: DEFAULT_SINGLE_THRESHOLD,
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            max_thread_tweets: None,
            thread_pacing: DEFAULT_THREAD_PACING,
            default_hashtags: Vec::new(),
        }
    }
}

impl ContentLimits {
    /// Loads content limits from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `TWEET_CHAR_LIMIT`: platform limit (default 280)
    /// - `SINGLE_TWEET_THRESHOLD`: T1 (default 280)
    /// - `SUMMARY_THRESHOLD`: T2 (default 430)
    /// - `THREAD_MAX_TWEETS`: piece cap, unset or `0` for unbounded
    /// - `THREAD_PACING_MS`: pacing interval in milliseconds (default 2000)
    /// - `DEFAULT_HASHTAGS`: comma-separated tags for single tweets (default none)
    pub fn from_env() -> Self {
        let tweet_char_limit = env_parse("TWEET_CHAR_LIMIT", DEFAULT_TWEET_CHAR_LIMIT);
        let single_threshold = env_parse("SINGLE_TWEET_THRESHOLD", DEFAULT_SINGLE_THRESHOLD);
        let mut summary_threshold = env_parse("SUMMARY_THRESHOLD", DEFAULT_SUMMARY_THRESHOLD);

        if summary_threshold < single_threshold {
            warn!(
                "SUMMARY_THRESHOLD ({}) is below SINGLE_TWEET_THRESHOLD ({}); summarized tweets are disabled",
                summary_threshold, single_threshold
            );
            summary_threshold = single_threshold;
        }

        let max_thread_tweets = match env_parse::<usize>("THREAD_MAX_TWEETS", 0) {
            0 => None,
            cap => Some(cap),
        };
        let thread_pacing = Duration::from_millis(env_parse(
            "THREAD_PACING_MS",
            DEFAULT_THREAD_PACING.as_millis() as u64,
        ));

        let default_hashtags = env_string("DEFAULT_HASHTAGS")
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(|tag| {
                        if tag.starts_with('#') {
                            tag.to_string()
                        } else {
                            format!("#{}", tag)
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let limits = ContentLimits {
            tweet_char_limit,
            single_threshold,
            summary_threshold,
            max_thread_tweets,
            thread_pacing,
            default_hashtags,
        };
        info!(
            "Content limits: {} chars per tweet, single <= {}, summarized <= {}, thread cap {:?}, pacing {:?}",
            limits.tweet_char_limit,
            limits.single_threshold,
            limits.summary_threshold,
            limits.max_thread_tweets,
            limits.thread_pacing
        );
        limits
    }
}

/// Configuration struct for Twitter/X API credentials.
///
/// Holds the OAuth 2.0 User Context access token used for posting, and the
/// optional refresh credentials used to renew it when the API answers 401.
#[derive(Debug, Clone, Default)]
pub struct TwitterConfig {
    /// The Access Token for OAuth 2.0 User Context authentication
    pub access_token: String,
    /// The Refresh Token for automatically refreshing expired access tokens
    pub refresh_token: Option<String>,
    /// The Client ID for OAuth 2.0 operations
    pub client_id: Option<String>,
    /// The Client Secret for OAuth 2.0 operations
    pub client_secret: Option<String>,
}

impl TwitterConfig {
    /// Loads Twitter credentials from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `xapi_access_token`: Access Token (required for posting; an empty value is kept
    ///   so that configuration validation can report it)
    /// - `xapi_refresh_token`, `xapi_client_id`, `xapi_client_secret`: optional, enable
    ///   automatic token refresh when all three are present
    pub fn from_env() -> Self {
        info!("Loading Twitter configuration from environment variables");

        let access_token = match env_string("xapi_access_token") {
            Some(token) => {
                info!(
                    "Found xapi_access_token environment variable with length: {}",
                    token.len()
                );
                debug!("Access token (masked): {}", mask_token(&token));
                if token.len() < 10 {
                    warn!(
                        "Access token seems unusually short ({} characters)",
                        token.len()
                    );
                }
                token
            }
            None => {
                error!("xapi_access_token is not set - posting to Twitter will fail");
                String::new()
            }
        };

        let refresh_token = env_string("xapi_refresh_token");
        match &refresh_token {
            Some(token) => debug!("Refresh token (masked): {}", mask_token(token)),
            None => info!("No xapi_refresh_token found in environment variables - automatic token refresh will be disabled"),
        }

        let client_id = env_string("xapi_client_id");
        let client_secret = env_string("xapi_client_secret");

        if refresh_token.is_some() && (client_id.is_none() || client_secret.is_none()) {
            warn!("Refresh token is provided but client credentials are missing - automatic token refresh will be disabled");
        }

        let config = TwitterConfig {
            access_token,
            refresh_token,
            client_id,
            client_secret,
        };

        if config.can_refresh_token() {
            info!("Automatic token refresh is enabled");
        } else {
            info!("Automatic token refresh is disabled - manual token refresh required");
        }
        config
    }

    /// Attempts to refresh the access token using the stored refresh token and client credentials.
    ///
    /// On success the access token (and the refresh token, if Twitter rotated it) is
    /// replaced in memory. The environment is not rewritten, so the operator is warned
    /// to update the deployed secret.
    pub async fn refresh_access_token(
        &mut self,
        http: &reqwest::Client,
        token_url: &str,
    ) -> Result<(), BoxError> {
        info!("Attempting to refresh access token");

        let (client_id, client_secret, refresh_token) = match (
            self.client_id.as_ref(),
            self.client_secret.as_ref(),
            self.refresh_token.as_ref(),
        ) {
            (Some(id), Some(secret), Some(token)) => (id, secret, token),
            _ => {
                error!("Cannot refresh token: missing required credentials");
                return Err("Missing required credentials for token refresh".into());
            }
        };

        let (new_access_token, new_refresh_token) = crate::oauth::refresh_access_token(
            http,
            token_url,
            client_id,
            client_secret,
            refresh_token,
        )
        .await?;

        let old_token_length = self.access_token.len();
        self.access_token = new_access_token;
        info!(
            "Access token updated: old length {}, new length {}",
            old_token_length,
            self.access_token.len()
        );
        debug!("Updated access token (masked): {}", mask_token(&self.access_token));

        if let Some(new_refresh) = new_refresh_token {
            info!("Updating refresh token with new token from Twitter");
            self.refresh_token = Some(new_refresh);
            warn!("Refresh token rotated in memory only - update xapi_refresh_token before the next restart");
        }
        warn!("Access token has been refreshed - consider updating your xapi_access_token environment variable");

        Ok(())
    }

    /// Returns true if client id, client secret and refresh token are all available.
    pub fn can_refresh_token(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }
}

/// Notion API settings.
#[derive(Debug, Clone, Default)]
pub struct NotionSettings {
    pub api_key: Option<String>,
    /// Page used when a request does not name one.
    pub default_page_id: Option<String>,
    pub api_url: String,
    pub version: String,
}

/// Gemini API settings.
#[derive(Debug, Clone, Default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
}

/// Mail API and notification settings.
#[derive(Debug, Clone, Default)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: Option<String>,
    /// Primary operator address for success and error mail.
    pub to: Option<String>,
    /// Secondary address used once every retry to the primary has failed.
    pub fallback_to: Option<String>,
    pub retries: u32,
    /// Attempt `k` waits `k * backoff` before the next attempt.
    pub backoff: Duration,
}

/// Complete service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub notion: NotionSettings,
    pub twitter: TwitterConfig,
    pub twitter_api_url: String,
    pub gemini: GeminiSettings,
    pub email: EmailSettings,
    pub limits: ContentLimits,
    pub timezone: Tz,
    /// Cron expression for scheduled runs of the default page.
    pub automation_schedule: Option<String>,
    pub send_startup_notification: bool,
}

impl Settings {
    /// Reads every setting from the environment. Never fails: missing values are
    /// reported by [`Settings::missing_required`] and surfaced by the workflow.
    pub fn from_env() -> Self {
        info!("Loading service configuration from environment variables");

        let timezone_name = env_string("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = match Tz::from_str(&timezone_name) {
            Ok(tz) => tz,
            Err(e) => {
                warn!("Invalid TIMEZONE '{}': {} - using UTC", timezone_name, e);
                Tz::UTC
            }
        };

        let send_startup_notification = env_string("SEND_STARTUP_NOTIFICATION")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
            || env_string("APP_ENV").as_deref() == Some("production");

        let settings = Settings {
            notion: NotionSettings {
                api_key: env_string("NOTION_API_KEY"),
                default_page_id: env_string("NOTION_PAGE_ID"),
                api_url: env_string("NOTION_API_URL")
                    .unwrap_or_else(|| DEFAULT_NOTION_API_URL.to_string()),
                version: env_string("NOTION_VERSION")
                    .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            },
            twitter: TwitterConfig::from_env(),
            twitter_api_url: env_string("XAPI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_XAPI_BASE_URL.to_string()),
            gemini: GeminiSettings {
                api_key: env_string("GEMINI_API_KEY"),
                model: env_string("GEMINI_MODEL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_url: env_string("GEMINI_API_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            },
            email: EmailSettings {
                api_url: env_string("EMAIL_API_URL")
                    .unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
                api_key: env_string("EMAIL_API_KEY"),
                from: env_string("EMAIL_FROM"),
                to: env_string("ERROR_NOTIFICATION_EMAIL"),
                fallback_to: env_string("FALLBACK_EMAIL"),
                retries: env_parse("NOTIFICATION_RETRIES", 3),
                backoff: Duration::from_millis(env_parse("NOTIFICATION_BACKOFF_MS", 2000)),
            },
            limits: ContentLimits::from_env(),
            timezone,
            automation_schedule: env_string("AUTOMATION_SCHEDULE"),
            send_startup_notification,
        };

        let missing = settings.missing_required();
        if missing.is_empty() {
            info!("All required environment variables are present");
        } else {
            error!("Missing required environment variables: {}", missing.join(", "));
        }
        settings
    }

    /// Names of required environment variables that are not set.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let checks = [
            ("NOTION_API_KEY", self.notion.api_key.is_some()),
            ("xapi_access_token", !self.twitter.access_token.is_empty()),
            ("GEMINI_API_KEY", self.gemini.api_key.is_some()),
            ("EMAIL_API_KEY", self.email.api_key.is_some()),
            ("EMAIL_FROM", self.email.from.is_some()),
            ("ERROR_NOTIFICATION_EMAIL", self.email.to.is_some()),
        ];
        checks
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Gets the server port from environment variables or returns the default.
///
/// This function reads the `PORT` environment variable and parses it as a u16.
/// If the environment variable is not set, it defaults to 3000.
///
/// # Panics
///
/// This function will panic if the `PORT` environment variable is set to a value
/// that cannot be parsed as a valid port number.
pub fn get_server_port() -> u16 {
    env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("PORT must be a valid number")
}

/// Masks a secret for logging. At most a quarter of the token (capped at eight
/// characters) is shown at each end, and the suffix only for tokens over 32 chars.
pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let len = chars.len();
    let visible = (len / 4).min(8);
    let prefix: String = chars[..visible].iter().collect();
    if len > 32 {
        let suffix: String = chars[len - visible..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

/// Reads a non-empty environment variable.
fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an environment variable, logging and returning `default` on bad input.
fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env_string(name) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value '{}' for {} - using default {:?}", raw, name, default);
                default
            }
        },
        None => default,
    }
}
