use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::ViewId;

/// Prompt used by the "summarize page" quick action.
pub const SUMMARIZE_PAGE_PROMPT: &str = "Please summarize this page.";

/// What the user asked the assistant to do with a piece of selected text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Explain,
    Define,
    Translate,
    Summarize,
    #[default]
    Ask,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        Self::Explain,
        Self::Define,
        Self::Translate,
        Self::Summarize,
        Self::Ask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explain => "explain",
            Self::Define => "define",
            Self::Translate => "translate",
            Self::Summarize => "summarize",
            Self::Ask => "ask",
        }
    }

    /// Chat prompt for this action. The selection is quoted verbatim.
    pub fn prompt(&self, text: &str) -> String {
        match self {
            Self::Explain => format!("Please explain: \"{text}\""),
            Self::Define => format!("Please define: \"{text}\""),
            Self::Translate => format!("Please translate to English: \"{text}\""),
            Self::Summarize => format!("Please summarize: \"{text}\""),
            Self::Ask => format!("Regarding this text: \"{text}\""),
        }
    }

    /// Menu title shown by the host.
    pub fn menu_title(&self) -> &'static str {
        match self {
            Self::Explain => "Explain Selection",
            Self::Define => "Define Selection",
            Self::Translate => "Translate Selection",
            Self::Summarize => "Summarize Selection",
            Self::Ask => "Ask About Selection...",
        }
    }

    /// Platform symbol name for the menu icon.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Explain => "lightbulb",
            Self::Define => "book",
            Self::Translate => "globe",
            Self::Summarize => "text.alignleft",
            Self::Ask => "questionmark.circle",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown names fall back to [`ActionKind::Ask`], the general-purpose action.
impl FromStr for ActionKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "explain" => Self::Explain,
            "define" => Self::Define,
            "translate" => Self::Translate,
            "summarize" => Self::Summarize,
            _ => Self::Ask,
        })
    }
}

/// A menu action invocation, as published on the event bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCommand {
    pub target_view_id: ViewId,
    pub selected_text: String,
    pub action_kind: ActionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_names() {
        assert_eq!(ActionKind::Explain.as_str(), "explain");
        assert_eq!(ActionKind::Summarize.as_str(), "summarize");
        assert_eq!(ActionKind::Translate.as_str(), "translate");
        assert_eq!(ActionKind::Define.as_str(), "define");
        assert_eq!(ActionKind::Ask.as_str(), "ask");
    }

    #[test]
    fn every_prompt_quotes_selection_verbatim() {
        let text = "ownership & borrowing";
        for kind in ActionKind::ALL {
            let prompt = kind.prompt(text);
            assert!(prompt.contains(&format!("\"{text}\"")), "{kind}: {prompt}");
        }
    }

    #[test]
    fn prompt_table() {
        assert_eq!(ActionKind::Explain.prompt("x"), "Please explain: \"x\"");
        assert_eq!(ActionKind::Define.prompt("x"), "Please define: \"x\"");
        assert_eq!(ActionKind::Translate.prompt("x"), "Please translate to English: \"x\"");
        assert_eq!(ActionKind::Summarize.prompt("x"), "Please summarize: \"x\"");
        assert_eq!(ActionKind::Ask.prompt("x"), "Regarding this text: \"x\"");
    }

    #[test]
    fn parse_known_and_unknown() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
        assert_eq!("rewrite".parse::<ActionKind>().unwrap(), ActionKind::Ask);
    }

    #[test]
    fn serde_uses_raw_names() {
        assert_eq!(serde_json::to_string(&ActionKind::Translate).unwrap(), r#""translate""#);
    }
}
