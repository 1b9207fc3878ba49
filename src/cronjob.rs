//! Cronjob module for scheduled automation runs.
//!
//! When `AUTOMATION_SCHEDULE` is set, the workflow runs on that schedule for the
//! default Notion page (`NOTION_PAGE_ID`). Results are logged; failures are
//! also mailed by the workflow itself.

use chrono::Utc;
use chrono_tz::Tz;
use log::{error, info, warn};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::BoxError;
use crate::handlers::AppState;

/// Current time in `timezone`, formatted for display (`2026-10-18 09:30:00 IST`).
pub fn current_time(timezone: Tz) -> String {
    Utc::now()
        .with_timezone(&timezone)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

/// Creates a scheduler with one job running the automation workflow.
///
/// The cron expression uses the `tokio-cron-scheduler` format with a leading
/// seconds field (`"0 0 21 * * *"` is every day at 21:00 UTC).
///
/// # Example
///
/// ```rust,no_run
/// use tasktweet::{start_automation_cronjob, AppState, Settings};
///
/// #[tokio::main]
/// async fn main() {
///     let state = AppState::new(Settings::from_env());
///     let scheduler = start_automation_cronjob(state, "0 0 21 * * *").await.unwrap();
///     scheduler.start().await.unwrap();
///     tokio::signal::ctrl_c().await.unwrap();
/// }
/// ```
///
/// # Errors
///
/// Fails if the scheduler cannot be created or the cron expression is invalid.
pub async fn start_automation_cronjob(
    state: AppState,
    schedule: &str,
) -> Result<JobScheduler, BoxError> {
    let sched = JobScheduler::new().await?;

    sched
        .add(Job::new_async(schedule, move |_uuid, _l| {
            let state = state.clone();
            Box::pin(async move {
                info!(
                    "Starting scheduled automation run at {}",
                    current_time(state.settings().timezone)
                );

                let page_id = state.settings().notion.default_page_id.clone();
                if page_id.is_none() {
                    warn!("Scheduled run without NOTION_PAGE_ID - the workflow will report it");
                }

                let automation = match state.automation().await {
                    Ok(automation) => automation,
                    Err(e) => {
                        error!("Scheduled run could not initialize services: {}", e);
                        return;
                    }
                };

                match automation.run(page_id.as_deref()).await {
                    Ok(report) => info!("Scheduled run finished: {}", report.message()),
                    Err(failure) => error!(
                        "Scheduled run failed at stage {}: {}",
                        failure.stage, failure.message
                    ),
                }
            })
        })?)
        .await?;

    info!("Automation cronjob configured with schedule '{}'", schedule);
    Ok(sched)
}
