//! Content sizing: decides between a single tweet, a summarized tweet or a thread.

use log::info;
use serde::Serialize;

use super::{char_len, Complexity, ContentShape, Task};
use crate::config::ContentLimits;

/// Size classification of one run's task text. Computed fresh per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentAnalysis {
    pub total_length: usize,
    pub task_count: usize,
    pub content_type: ContentShape,
    pub complexity: Complexity,
}

/// Joins tasks into the text sent to the model: `title\ncontent` per task,
/// tasks separated by a blank line, in input order.
pub fn combine_task_text(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|task| format!("{}\n{}", task.title, task.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Classifies the combined task text against the T1/T2 thresholds.
pub fn analyze_content(tasks: &[Task], limits: &ContentLimits) -> ContentAnalysis {
    let total_length = char_len(&combine_task_text(tasks));

    let (content_type, complexity) = if total_length <= limits.single_threshold {
        (ContentShape::Single, Complexity::Simple)
    } else if total_length <= limits.summary_threshold {
        (ContentShape::Summarized, Complexity::Moderate)
    } else {
        (ContentShape::Thread, Complexity::Complex)
    };

    info!(
        "Content analysis completed: {} tasks, {} chars, {:?} ({:?})",
        tasks.len(),
        total_length,
        content_type,
        complexity
    );

    ContentAnalysis {
        total_length,
        task_count: tasks.len(),
        content_type,
        complexity,
    }
}
