use crate::types::GRAMMAR_KINDS;

const ACTION_SEMANTICS: &[(&str, &str)] = &[
    ("navigate", "open the given absolute `url` in the browser"),
    ("click", "click the element matched by the CSS `selector`"),
    (
        "input",
        "focus the element matched by the CSS `selector` and type `text` into it",
    ),
    ("wait", "pause for `seconds` before the next action"),
    (
        "scroll",
        "scroll the page vertically by `pixels` (negative scrolls up)",
    ),
];

fn build_site_hints_section(site_hints: Option<&str>) -> Option<String> {
    let hints = site_hints?.trim();
    if hints.is_empty() {
        return None;
    }

    Some(format!(
        "\n\n# Site Hints\n\nKnown selectors and conventions for the target site. Prefer these over guessing:\n{hints}"
    ))
}

/// System prompt for the planner: declares the closed action grammar and
/// demands a bare JSON array as the only acceptable output.
pub fn build_planner_system_prompt(site_hints: Option<&str>) -> String {
    let mut semantics = String::new();
    for (kind, description) in ACTION_SEMANTICS {
        semantics.push_str(&format!("- `{kind}`: {description}\n"));
    }

    let base = format!(
        "You are a web automation planner. Translate the user's task into an ordered sequence of browser actions.\n\nThe only allowed actions are: {}.\n\n{semantics}\nRespond with a JSON array and nothing else: no prose, no code fences. Each element must be an object with an `action` key naming one of the allowed actions plus that action's fields, for example:\n[{{\"action\": \"navigate\", \"url\": \"https://example.com\"}}, {{\"action\": \"click\", \"selector\": \"#submit\"}}]",
        GRAMMAR_KINDS.join(", ")
    );

    match build_site_hints_section(site_hints) {
        Some(extra) => format!("{base}{extra}"),
        None => base,
    }
}

/// User message carrying the task description.
pub fn build_planner_user_message(task_text: &str) -> String {
    format!("Task: {task_text}")
}
