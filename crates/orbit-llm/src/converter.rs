use serde_json::{json, Value};

use orbit_core::context::PageContext;
use orbit_core::messages::{ChatTurn, Role};
use orbit_core::provider::ModelId;

/// Default budget for page text forwarded to the model.
pub const DEFAULT_MAX_PAGE_CHARS: usize = 12_000;

const ASSISTANT_PREAMBLE: &str = "You are Orbit AI, an assistant built into a web browser. \
Help the user understand the page they are viewing. Be concise, and say so when the page \
does not contain the answer.";

/// Convert chat history plus page context into an Ollama `/api/chat` request body.
pub fn build_request_body(
    history: &[ChatTurn],
    model: &ModelId,
    context: Option<&PageContext>,
    max_page_chars: usize,
) -> Value {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(json!({
        "role": "system",
        "content": system_prompt(context, max_page_chars),
    }));
    messages.extend(history.iter().map(convert_turn));

    json!({
        "model": model.as_str(),
        "messages": messages,
        "stream": true,
    })
}

fn convert_turn(turn: &ChatTurn) -> Value {
    let role = match turn.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };
    json!({ "role": role, "content": turn.content })
}

/// The leading system message: assistant instructions, then whatever the page context offers.
pub fn system_prompt(context: Option<&PageContext>, max_page_chars: usize) -> String {
    let mut prompt = String::from(ASSISTANT_PREAMBLE);
    let Some(ctx) = context else {
        return prompt;
    };

    let mut section = String::new();
    if let Some(title) = ctx.title.as_deref().filter(|t| !t.is_empty()) {
        section.push_str(&format!("Title: {title}\n"));
    }
    if let Some(url) = &ctx.url {
        section.push_str(&format!("URL: {url}\n"));
    }
    if let Some(selection) = ctx.selected_text.as_deref().filter(|t| !t.is_empty()) {
        section.push_str(&format!("Selected text:\n{selection}\n"));
    }
    if let Some(content) = ctx.page_content.as_deref().filter(|t| !t.is_empty()) {
        section.push_str("Page content:\n");
        section.push_str(&truncate_chars(content, max_page_chars));
        section.push('\n');
    }

    if !section.is_empty() {
        prompt.push_str("\n\nThe user is viewing this page:\n");
        prompt.push_str(section.trim_end());
    }
    prompt
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((boundary, _)) => {
            let total = text.chars().count();
            format!("{}\n[truncated: {total} chars -> {max_chars} chars]", &text[..boundary])
        }
    }
}
