//! Pure parsing of Notion API payloads.

use serde_json::Value;

use super::PageStatus;
use crate::content::Task;

const DONE_VALUES: [&str; 3] = ["done", "complete", "completed"];

/// Reads the page status from its `properties` object.
///
/// Any property whose name contains `status` (case-insensitive) and is of type
/// `status` or `select` with a done-like value marks the page as done.
pub fn page_status_from_properties(properties: &Value) -> PageStatus {
    let Some(properties) = properties.as_object() else {
        return PageStatus::NotDone;
    };

    let done = properties.iter().any(|(name, property)| {
        if !name.to_lowercase().contains("status") {
            return false;
        }
        let kind = property.get("type").and_then(Value::as_str).unwrap_or_default();
        if kind != "status" && kind != "select" {
            return false;
        }
        property
            .get(kind)
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
            .map(|value| DONE_VALUES.contains(&value.to_lowercase().as_str()))
            .unwrap_or(false)
    });

    if done {
        PageStatus::Done
    } else {
        PageStatus::NotDone
    }
}

/// Concatenates the `plain_text` of a rich text array.
fn rich_text_plain(rich_text: Option<&Value>) -> String {
    rich_text
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Splits the to-do blocks of a page into (completed, incomplete) tasks.
///
/// Headings set the section that prefixes each task's content. Blank to-dos are
/// skipped. `date` is stamped on every task.
pub fn extract_tasks(blocks: &[Value], date: &str) -> (Vec<Task>, Vec<Task>) {
    let mut completed = Vec::new();
    let mut incomplete = Vec::new();
    let mut current_section = String::new();

    for block in blocks {
        let Some(kind) = block.get("type").and_then(Value::as_str) else {
            continue;
        };

        match kind {
            "heading_1" | "heading_2" | "heading_3" => {
                current_section =
                    rich_text_plain(block.get(kind).and_then(|h| h.get("rich_text")));
            }
            "to_do" => {
                let todo = block.get("to_do");
                let title = rich_text_plain(todo.and_then(|t| t.get("rich_text")));
                if title.trim().is_empty() {
                    continue;
                }
                let checked = todo
                    .and_then(|t| t.get("checked"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                let task = Task {
                    id: block
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    content: format!("{}: {}", current_section, title),
                    title,
                    completed: checked,
                    date: date.to_string(),
                };
                if checked {
                    completed.push(task);
                } else {
                    incomplete.push(task);
                }
            }
            _ => {}
        }
    }

    (completed, incomplete)
}

/// Applies the generation policy: returns whether to tweet and why.
pub fn decide_generation(
    status: PageStatus,
    completed: usize,
    incomplete: usize,
) -> (bool, &'static str) {
    let total = completed + incomplete;
    let all_completed = total > 0 && incomplete == 0;

    match status {
        PageStatus::Done if completed == 0 => {
            (false, "Status is done but no completed tasks found")
        }
        PageStatus::Done => (true, "Status is done and has completed tasks"),
        PageStatus::NotDone if incomplete > 0 => {
            (false, "Status is not done and has incomplete tasks")
        }
        PageStatus::NotDone if all_completed => {
            (true, "Status is not done but all tasks are completed")
        }
        PageStatus::NotDone => (false, "No tasks found or unclear status"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rich(text: &str) -> Value {
        json!([{ "type": "text", "plain_text": text }])
    }

    fn todo(id: &str, text: &str, checked: bool) -> Value {
        json!({ "id": id, "type": "to_do", "to_do": { "rich_text": rich(text), "checked": checked } })
    }

    fn heading(level: u8, text: &str) -> Value {
        let kind = format!("heading_{}", level);
        let mut block = json!({ "id": "h", "type": kind.clone() });
        block[kind.as_str()] = json!({ "rich_text": rich(text) });
        block
    }

    #[test]
    fn status_property_marks_page_done() {
        let props = json!({
            "Name": { "type": "title", "title": [] },
            "Daily Status": { "type": "status", "status": { "name": "Completed" } }
        });
        assert_eq!(page_status_from_properties(&props), PageStatus::Done);
    }

    #[test]
    fn select_status_and_non_done_values() {
        let done = json!({ "status": { "type": "select", "select": { "name": "DONE" } } });
        assert_eq!(page_status_from_properties(&done), PageStatus::Done);

        let open = json!({ "Status": { "type": "select", "select": { "name": "In progress" } } });
        assert_eq!(page_status_from_properties(&open), PageStatus::NotDone);

        let wrong_name = json!({ "Stage": { "type": "select", "select": { "name": "Done" } } });
        assert_eq!(page_status_from_properties(&wrong_name), PageStatus::NotDone);

        let empty_select = json!({ "Status": { "type": "select", "select": null } });
        assert_eq!(page_status_from_properties(&empty_select), PageStatus::NotDone);
    }

    #[test]
    fn tasks_carry_section_and_split_by_checked() {
        let blocks = vec![
            heading(2, "Backend"),
            todo("a", "Fix login", true),
            todo("b", "Write docs", false),
            json!({ "id": "p", "type": "paragraph", "paragraph": { "rich_text": rich("note") } }),
            heading(3, "Frontend"),
            todo("c", "Polish navbar", true),
            todo("d", "   ", true),
        ];

        let (completed, incomplete) = extract_tasks(&blocks, "2026-10-18");

        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].id, "a");
        assert_eq!(completed[0].title, "Fix login");
        assert_eq!(completed[0].content, "Backend: Fix login");
        assert_eq!(completed[1].content, "Frontend: Polish navbar");
        assert!(completed.iter().all(|t| t.completed && t.date == "2026-10-18"));

        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].content, "Backend: Write docs");
        assert!(!incomplete[0].completed);
    }

    #[test]
    fn multi_part_rich_text_is_concatenated() {
        let block = json!({
            "id": "x",
            "type": "to_do",
            "to_do": {
                "rich_text": [{ "plain_text": "Ship " }, { "plain_text": "v2" }],
                "checked": true
            }
        });
        let (completed, _) = extract_tasks(&[block], "2026-10-18");
        assert_eq!(completed[0].title, "Ship v2");
        assert_eq!(completed[0].content, ": Ship v2");
    }

    #[test]
    fn generation_policy_branches() {
        assert_eq!(
            decide_generation(PageStatus::Done, 0, 3),
            (false, "Status is done but no completed tasks found")
        );
        assert!(decide_generation(PageStatus::Done, 2, 1).0);
        assert!(!decide_generation(PageStatus::NotDone, 2, 1).0);
        assert_eq!(
            decide_generation(PageStatus::NotDone, 2, 0),
            (true, "Status is not done but all tasks are completed")
        );
        assert_eq!(
            decide_generation(PageStatus::NotDone, 0, 0),
            (false, "No tasks found or unclear status")
        );
    }
}
